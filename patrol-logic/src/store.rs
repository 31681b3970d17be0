use tokio::sync::watch;

use crate::{
    patrol::{Id, Patrol, PatrolSettings, TestMode},
    prelude::*,
};

/// Owner of the patrol state. The screen only reads patrols through this and asks it to make
/// changes, it never mutates a [Patrol] on its own.
pub trait PatrolStore: Send + Sync {
    /// Get a receiver that yields the active patrol whenever it changes, [None] meaning no patrol
    /// is active
    fn subscribe(&self) -> watch::Receiver<Option<Patrol>>;

    /// Get a snapshot of the currently active patrol
    fn active_patrol(&self) -> Option<Patrol> {
        let rx = self.subscribe();
        let patrol = rx.borrow().clone();
        patrol
    }

    /// Mark a point of the active patrol as verified
    fn complete_point(&self, id: Id) -> impl Future<Output = Result> + Send;

    /// End the active patrol, any points that weren't verified are marked as skipped
    fn end_patrol(&self) -> impl Future<Output = Result> + Send;

    fn settings(&self) -> PatrolSettings;

    /// Whether this store supports test mode, and if it's on
    fn test_mode(&self) -> TestMode {
        TestMode::Unsupported
    }

    /// Flip test mode, returns the new mode. Stores that don't override this leave the mode as
    /// is and return it.
    fn toggle_test_mode(&self) -> impl Future<Output = Result<TestMode>> + Send {
        let mode = self.test_mode();
        async move { Ok(mode) }
    }
}
