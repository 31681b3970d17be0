use serde::{Deserialize, Serialize};

pub trait StateUpdateSender {
    fn send_update(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// A short-lived notification shown to the user
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// Screens the patrol screen can send the user to
pub enum Route {
    Home,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
        }
    }
}

/// Whatever is displaying the screen, handles notifications, dialogs, and navigation.
pub trait ScreenHost: StateUpdateSender + Send + Sync {
    /// Show a notification, fire-and-forget
    fn toast(&self, toast: Toast);
    /// Move the user to another screen
    fn navigate(&self, route: Route);
    /// Ask the user a yes/no question, resolves to true if they said yes
    fn confirm(&self, message: &str) -> impl Future<Output = bool> + Send;
}
