use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Notify, RwLock},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::elapsed_seconds,
    config::ScreenConfig,
    host::{Route, ScreenHost, Toast},
    location::{LocationProvider, WatchGuard},
    messages,
    patrol::{Id, Patrol, TestMode, UtcDT},
    prelude::*,
    store::PatrolStore,
    ui_state::{PatrolUiState, UiInputs},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// Why the screen's main loop stopped
pub enum ScreenExit {
    /// The screen was closed while a patrol was still in progress
    Unmounted,
    /// There was no active patrol (anymore), the user was sent home
    Redirected,
    /// The user ended the patrol themselves
    Ended,
    /// Every point was verified and the patrol ended on its own
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// Result of trying to verify a single point
pub enum VerifyOutcome {
    /// No patrol is active, nothing happened
    NoPatrol,
    /// The point isn't part of the active patrol
    UnknownPoint,
    /// The point was already verified
    AlreadyVerified,
    /// We don't know where the user is yet
    AwaitingLocation,
    /// The user isn't close enough to the point
    OutOfRadius,
    /// The point was verified, contains how many are left
    Verified { remaining: u32 },
    /// The point was verified and it was the last one
    AllVerified,
}

#[derive(Default)]
struct ScreenState {
    patrol: Option<Patrol>,
    /// Points this screen still considers unverified, only re-synced from the store when a
    /// different patrol gets assigned
    remaining: Vec<Id>,
    /// Points currently being written to the store
    verifying: Vec<Id>,
    elapsed_seconds: u32,
    /// When the patrol should end on its own after every point is verified
    auto_end_at: Option<Instant>,
    /// Set when something other than the main loop decided the screen is done
    exit: Option<ScreenExit>,
}

/// Controller for the active patrol screen. Reads patrols from a [PatrolStore], checks the
/// user's position with a [LocationProvider], and reports back to the user via a [ScreenHost].
pub struct PatrolScreen<P: PatrolStore, L: LocationProvider, H: ScreenHost> {
    state: RwLock<ScreenState>,
    store: Arc<P>,
    location: L,
    host: H,
    config: ScreenConfig,
    cancel: CancellationToken,
    rescheduled: Notify,
}

impl<P: PatrolStore, L: LocationProvider, H: ScreenHost> PatrolScreen<P, L, H> {
    pub fn new(config: ScreenConfig, store: Arc<P>, location: L, host: H) -> Self {
        Self {
            state: RwLock::new(ScreenState::default()),
            store,
            location,
            host,
            config,
            cancel: CancellationToken::new(),
            rescheduled: Notify::new(),
        }
    }

    #[cfg(test)]
    fn get_now() -> UtcDT {
        let fake = tokio::time::Instant::now();
        let real = std::time::Instant::now();
        Utc::now() + fake.into_std().saturating_duration_since(real)
    }

    #[cfg(not(test))]
    fn get_now() -> UtcDT {
        Utc::now()
    }

    async fn wait_until(deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    /// Start tracking a newly assigned patrol
    async fn mount(&self, patrol: Patrol) -> WatchGuard<'_, L> {
        info!(
            "Tracking patrol {} ({} points)",
            patrol.id,
            patrol.patrol_points.len()
        );
        let guard = WatchGuard::start(&self.location, &self.config.watch);
        let mut state = self.state.write().await;
        state.remaining = patrol.remaining_ids();
        state.elapsed_seconds = 0;
        state.auto_end_at = None;
        state.patrol = Some(patrol);
        drop(state);
        self.host.send_update();
        guard
    }

    /// The store pushed a new version of the patrol we're already tracking
    async fn refresh(&self, patrol: Patrol) {
        debug!("Patrol {} updated", patrol.id);
        self.state.write().await.patrol = Some(patrol);
        self.host.send_update();
    }

    /// The store no longer has an active patrol, returns how the screen exits
    async fn clear(&self) -> ScreenExit {
        let mut state = self.state.write().await;
        if let Some(exit) = state.exit.take() {
            return exit;
        }
        state.patrol = None;
        state.remaining.clear();
        state.auto_end_at = None;
        drop(state);
        info!("Active patrol is gone, returning home");
        self.host.navigate(Route::Home);
        ScreenExit::Redirected
    }

    /// Recompute elapsed time from the wall clock
    async fn tick(&self, now: UtcDT) {
        let mut state = self.state.write().await;
        let Some(start) = state.patrol.as_ref().map(|p| p.start_time) else {
            return;
        };
        let elapsed = elapsed_seconds(start, now);
        state.elapsed_seconds = state.elapsed_seconds.max(elapsed);
        drop(state);
        self.host.send_update();
    }

    /// End the patrol after every point was verified
    async fn complete_patrol(&self) -> Result<ScreenExit> {
        let mut state = self.state.write().await;
        // Ended by hand while we were waiting for the lock
        if state.patrol.is_none() {
            return Ok(state.exit.take().unwrap_or(ScreenExit::Unmounted));
        }
        info!("All points verified, ending patrol");
        self.store
            .end_patrol()
            .await
            .context("Failed to end patrol")?;
        state.auto_end_at = None;
        state.patrol = None;
        state.remaining.clear();
        drop(state);
        self.host.navigate(Route::Home);
        Ok(ScreenExit::Completed)
    }

    /// Try to verify the point with the given ID using the user's current position.
    pub async fn verify_point(&self, id: Id) -> Result<VerifyOutcome> {
        let mut state = self.state.write().await;

        let Some(patrol) = state.patrol.as_ref() else {
            warn!("Tried to verify {id} without an active patrol");
            return Ok(VerifyOutcome::NoPatrol);
        };
        let patrol_id = patrol.id;

        let Some(point) = patrol.point(id).cloned() else {
            warn!("Point {id} is not part of patrol {patrol_id}");
            return Ok(VerifyOutcome::UnknownPoint);
        };

        if !state.remaining.contains(&id) || state.verifying.contains(&id) {
            debug!("Point {id} was already verified");
            return Ok(VerifyOutcome::AlreadyVerified);
        }

        if self.location.position().is_none() {
            self.host.toast(Toast::error(messages::AWAITING_LOCATION));
            return Ok(VerifyOutcome::AwaitingLocation);
        }

        if !self
            .location
            .is_within_radius(point.latitude, point.longitude, point.radius_meters)
        {
            debug!("Out of range of point {id} ({}m)", point.radius_meters);
            self.host.toast(Toast::error(messages::OUT_OF_RADIUS));
            return Ok(VerifyOutcome::OutOfRadius);
        }

        state.verifying.push(id);
        drop(state);

        let res = self.store.complete_point(id).await;

        let mut state = self.state.write().await;
        state.verifying.retain(|v| *v != id);
        res.context("Failed to complete patrol point")?;

        if state.patrol.as_ref().is_none_or(|p| p.id != patrol_id) {
            warn!("Patrol {patrol_id} went away while verifying {id}");
            return Ok(VerifyOutcome::NoPatrol);
        }

        state.remaining.retain(|r| *r != id);
        info!("Verified point {id}, {} left", state.remaining.len());

        let outcome = if state.remaining.is_empty() {
            self.host.toast(Toast::success(messages::ALL_VERIFIED));
            state.auto_end_at = Some(Instant::now() + self.config.auto_end_delay);
            self.rescheduled.notify_one();
            VerifyOutcome::AllVerified
        } else {
            VerifyOutcome::Verified {
                remaining: u32::try_from(state.remaining.len()).unwrap_or(u32::MAX),
            }
        };

        drop(state);
        self.host.send_update();

        Ok(outcome)
    }

    /// Ask the user to confirm, then end the patrol and head home.
    /// Returns whether the patrol was ended.
    pub async fn end_patrol(&self) -> Result<bool> {
        if self.state.read().await.patrol.is_none() {
            warn!("Tried to end a patrol while none is active");
            return Ok(false);
        }

        if !self.host.confirm(messages::END_PATROL_CONFIRM).await {
            debug!("User decided not to end the patrol");
            return Ok(false);
        }

        let mut state = self.state.write().await;
        // Could have ended on its own while the dialog was open
        if state.patrol.is_none() {
            return Ok(false);
        }
        self.store
            .end_patrol()
            .await
            .context("Failed to end patrol")?;
        state.auto_end_at = None;
        info!("Patrol ended early, {} points skipped", state.remaining.len());
        state.patrol = None;
        state.remaining.clear();
        state.exit = Some(ScreenExit::Ended);
        drop(state);

        self.cancel.cancel();
        self.host.navigate(Route::Home);
        Ok(true)
    }

    /// Flip test mode if the store supports it, returns the resulting mode
    pub async fn toggle_test_mode(&self) -> Result<TestMode> {
        let current = self.store.test_mode();
        if current == TestMode::Unsupported {
            warn!("Patrol store does not support test mode");
            return Ok(current);
        }

        let mode = self
            .store
            .toggle_test_mode()
            .await
            .context("Failed to toggle test mode")?;
        info!("Test mode is now {}", if mode.is_enabled() { "on" } else { "off" });
        self.host.send_update();
        Ok(mode)
    }

    /// Snapshot of what should be drawn, [None] when there's no active patrol
    pub async fn get_ui_state(&self) -> Option<PatrolUiState> {
        let state = self.state.read().await;
        let patrol = state.patrol.as_ref()?;
        Some(PatrolUiState::build(UiInputs {
            patrol,
            remaining: &state.remaining,
            elapsed_seconds: state.elapsed_seconds,
            test_mode: self.store.test_mode(),
            settings: self.store.settings(),
            position: self.location.position(),
            auto_end_pending: state.auto_end_at.is_some(),
        }))
    }

    /// Close the screen, stops the main loop and any pending auto-end
    pub async fn unmount(&self) {
        self.cancel.cancel();
    }

    /// Main loop of the screen, ticks the elapsed time and follows changes from [PatrolStore].
    pub async fn main_loop(&self) -> Result<ScreenExit> {
        let mut patrols = self.store.subscribe();

        let initial = patrols.borrow_and_update().clone();
        let Some(patrol) = initial else {
            info!("No active patrol, returning home");
            self.host.navigate(Route::Home);
            return Ok(ScreenExit::Redirected);
        };

        let mut watch = Some(self.mount(patrol).await);

        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let res = 'screen: loop {
            let auto_end_at = self.state.read().await.auto_end_at;

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    let exit = self.state.write().await.exit.take();
                    break 'screen Ok(exit.unwrap_or(ScreenExit::Unmounted));
                }

                _ = Self::wait_until(auto_end_at) => {
                    break 'screen self.complete_patrol().await;
                }

                changed = patrols.changed() => {
                    if changed.is_err() {
                        break 'screen Err(anyhow!("Patrol store went away"));
                    }

                    let next = patrols.borrow_and_update().clone();
                    match next {
                        None => {
                            drop(watch.take());
                            break 'screen Ok(self.clear().await);
                        }
                        Some(patrol) => {
                            let reassigned = self
                                .state
                                .read()
                                .await
                                .patrol
                                .as_ref()
                                .is_none_or(|current| current.id != patrol.id);

                            if reassigned {
                                drop(watch.take());
                                watch = Some(self.mount(patrol).await);
                                interval.reset_immediately();
                            } else {
                                self.refresh(patrol).await;
                            }
                        }
                    }
                }

                _ = self.rescheduled.notified() => {}

                _ = interval.tick() => {
                    self.tick(Self::get_now()).await;
                }
            }
        };

        drop(watch);

        res
    }
}
