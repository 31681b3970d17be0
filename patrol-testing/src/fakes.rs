use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use log::{debug, info};
use patrol_logic::{
    Id, LocationProvider, Patrol, PatrolSettings, PatrolStore, Position, TestMode, WatchOptions,
};
use tokio::sync::watch;

use crate::prelude::*;

/// A [PatrolStore] that keeps everything in memory
pub struct MemoryStore {
    patrols: watch::Sender<Option<Patrol>>,
    settings: PatrolSettings,
    test_mode: Mutex<TestMode>,
    skipped: Mutex<Vec<Id>>,
}

impl MemoryStore {
    pub fn new(patrol: Option<Patrol>, settings: PatrolSettings, test_mode: TestMode) -> Self {
        let (patrols, _) = watch::channel(patrol);
        Self {
            patrols,
            settings,
            test_mode: Mutex::new(test_mode),
            skipped: Mutex::new(Vec::new()),
        }
    }

    /// Points that weren't verified when the last patrol ended
    pub fn skipped(&self) -> Vec<Id> {
        self.skipped.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl PatrolStore for MemoryStore {
    fn subscribe(&self) -> watch::Receiver<Option<Patrol>> {
        self.patrols.subscribe()
    }

    async fn complete_point(&self, id: Id) -> Result {
        let mut found = false;
        self.patrols.send_if_modified(|patrol| {
            let Some(patrol) = patrol else {
                return false;
            };
            found = patrol.point(id).is_some();
            if found && !patrol.is_completed(id) {
                patrol.completed_points.push(id);
                true
            } else {
                false
            }
        });

        if found {
            debug!("Stored completion of {id}");
            Ok(())
        } else {
            bail!("Point {id} is not part of an active patrol")
        }
    }

    async fn end_patrol(&self) -> Result {
        let ended = self
            .patrols
            .send_replace(None)
            .context("No patrol to end")?;
        let skipped = ended.remaining_ids();
        info!(
            "Patrol {} ended, {} of {} points skipped",
            ended.id,
            skipped.len(),
            ended.patrol_points.len()
        );
        *self
            .skipped
            .lock()
            .map_err(|_| anyhow!("Skipped list poisoned"))? = skipped;
        Ok(())
    }

    fn settings(&self) -> PatrolSettings {
        self.settings.clone()
    }

    fn test_mode(&self) -> TestMode {
        self.test_mode
            .lock()
            .map(|m| *m)
            .unwrap_or(TestMode::Unsupported)
    }

    async fn toggle_test_mode(&self) -> Result<TestMode> {
        let mode = {
            let mut mode = self
                .test_mode
                .lock()
                .map_err(|_| anyhow!("Test mode poisoned"))?;
            *mode = mode.toggled();
            *mode
        };
        Ok(mode)
    }
}

#[derive(Clone, Default)]
/// A [LocationProvider] whose position is set by hand
pub struct ManualLocation {
    position: Arc<Mutex<Option<Position>>>,
    watching: Arc<AtomicBool>,
}

impl ManualLocation {
    pub fn new(position: Option<Position>) -> Self {
        Self {
            position: Arc::new(Mutex::new(position)),
            watching: Arc::default(),
        }
    }

    pub fn set(&self, position: Option<Position>) {
        if let Ok(mut current) = self.position.lock() {
            *current = position;
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }
}

impl LocationProvider for ManualLocation {
    fn start_watching(&self, options: &WatchOptions) {
        debug!("Watching location with {options:?}");
        self.watching.store(true, Ordering::SeqCst);
    }

    fn stop_watching(&self) {
        debug!("Stopped watching location");
        self.watching.store(false, Ordering::SeqCst);
    }

    fn position(&self) -> Option<Position> {
        self.position.lock().ok().and_then(|p| *p)
    }
}
