mod fakes;

use interprocess::local_socket::{GenericNamespaced, Name, ToNsName};
use patrol_logic::{
    Id, Patrol, PatrolSettings, PatrolUiState, Position, Route, ScreenConfig, ScreenExit,
    TestMode, Toast, VerifyOutcome,
};
use serde::{Deserialize, Serialize};

pub use fakes::{ManualLocation, MemoryStore};

pub mod prelude {
    pub use anyhow::{Context, anyhow, bail};
    pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}

pub use prelude::*;

pub fn get_socket_name(base_name: String) -> Result<Name<'static>> {
    base_name
        .to_ns_name::<GenericNamespaced>()
        .context("Failed to parse socket name")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Everything the test daemon needs to put a patrol on screen
pub struct Scenario {
    pub patrol: Patrol,
    #[serde(default)]
    pub settings: PatrolSettings,
    #[serde(default)]
    pub test_mode: TestMode,
    /// Where the device starts out, [None] means no location yet
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub screen: ScreenConfig,
}

impl Scenario {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse scenario")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TestingRequest {
    /// Move the device to the given coordinates
    SetPosition { lat: f64, long: f64 },
    /// Forget the device position, as if it hasn't been acquired yet
    ClearPosition,
    VerifyPoint(Id),
    /// End the patrol, answering the confirmation dialog with `confirm`
    EndPatrol { confirm: bool },
    ToggleTestMode,
    GetState,
    /// Wait for the screen to push its next state update, it does so at least every tick
    NextTick,
    Unmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TestingResponse {
    Complete,
    Verified(VerifyOutcome),
    /// Whether the patrol was ended, and which of its points were left unverified
    PatrolEnded { ended: bool, skipped: Vec<Id> },
    TestModeChanged(TestMode),
    State {
        ui: Option<PatrolUiState>,
        /// Whether the screen is currently watching the device location
        watching_location: bool,
    },
    /// A toast was shown, sent whenever it happens
    Toast(Toast),
    /// The screen navigated somewhere, sent whenever it happens
    Navigated(Route),
    /// The screen's main loop stopped, sent whenever it happens
    ScreenExited(ScreenExit),
    Error(String),
}

impl TestingResponse {
    /// Whether this is the direct answer to a request, as opposed to an event pushed by the screen
    pub fn is_reply(&self) -> bool {
        !matches!(
            self,
            Self::Toast(_) | Self::Navigated(_) | Self::ScreenExited(_)
        )
    }
}

impl From<anyhow::Error> for TestingResponse {
    fn from(value: anyhow::Error) -> Self {
        TestingResponse::Error(value.to_string())
    }
}

impl From<VerifyOutcome> for TestingResponse {
    fn from(val: VerifyOutcome) -> Self {
        TestingResponse::Verified(val)
    }
}

impl From<TestMode> for TestingResponse {
    fn from(val: TestMode) -> Self {
        TestingResponse::TestModeChanged(val)
    }
}

impl From<Toast> for TestingResponse {
    fn from(val: Toast) -> Self {
        TestingResponse::Toast(val)
    }
}

impl From<Route> for TestingResponse {
    fn from(val: Route) -> Self {
        TestingResponse::Navigated(val)
    }
}

impl From<ScreenExit> for TestingResponse {
    fn from(val: ScreenExit) -> Self {
        TestingResponse::ScreenExited(val)
    }
}
