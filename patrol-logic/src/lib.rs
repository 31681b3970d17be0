mod clock;
mod config;
mod host;
mod location;
pub mod messages;
mod patrol;
mod screen;
mod store;
#[cfg(test)]
mod tests;
mod ui_state;

pub use clock::{elapsed_seconds, format_elapsed};
pub use config::ScreenConfig;
pub use host::{Route, ScreenHost, StateUpdateSender, Toast, ToastKind};
pub use location::{
    EARTH_RADIUS_METERS, LocationProvider, Position, WatchGuard, WatchOptions, haversine_meters,
};
pub use patrol::{Id, Patrol, PatrolPoint, PatrolSettings, TestMode, UtcDT};
pub use screen::{PatrolScreen, ScreenExit, VerifyOutcome};
pub use store::PatrolStore;
pub use ui_state::{PatrolUiState, PointRow};

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
