use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use anyhow::bail;
use tokio::sync::{Notify, watch};

use crate::{
    LocationProvider, PatrolStore, ScreenHost, StateUpdateSender,
    host::{Route, Toast},
    location::{Position, WatchOptions},
    patrol::{Id, Patrol, PatrolSettings, TestMode},
    prelude::*,
};

pub struct MockStore {
    patrols: watch::Sender<Option<Patrol>>,
    completed: Mutex<Vec<Id>>,
    ends: AtomicUsize,
    fail: AtomicBool,
    fail_ends: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    test_mode: Mutex<TestMode>,
}

impl MockStore {
    pub fn new(patrol: Option<Patrol>) -> Self {
        let (patrols, _) = watch::channel(patrol);
        Self {
            patrols,
            completed: Mutex::new(Vec::new()),
            ends: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            fail_ends: AtomicBool::new(false),
            gate: Mutex::new(None),
            test_mode: Mutex::new(TestMode::Unsupported),
        }
    }

    /// Replace the active patrol, as if the user started another one
    pub fn assign(&self, patrol: Option<Patrol>) {
        self.patrols.send_replace(patrol);
    }

    /// Mark a point complete without going through the screen
    pub fn complete_externally(&self, id: Id) {
        self.patrols.send_modify(|patrol| {
            if let Some(patrol) = patrol {
                patrol.completed_points.push(id);
            }
        });
    }

    pub fn fail_completions(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn fail_ends(&self, fail: bool) {
        self.fail_ends.store(fail, Ordering::SeqCst);
    }

    /// Make completions wait until the returned [Notify] is triggered, once per completion
    pub fn hold_completions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn support_test_mode(&self) {
        *self.test_mode.lock().unwrap() = TestMode::Supported { enabled: false };
    }

    pub fn completed_calls(&self) -> Vec<Id> {
        self.completed.lock().unwrap().clone()
    }

    pub fn end_calls(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }
}

impl PatrolStore for MockStore {
    fn subscribe(&self) -> watch::Receiver<Option<Patrol>> {
        self.patrols.subscribe()
    }

    async fn complete_point(&self, id: Id) -> Result {
        if self.fail.load(Ordering::SeqCst) {
            bail!("Store is unavailable");
        }
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.completed.lock().unwrap().push(id);
        self.patrols.send_modify(|patrol| {
            if let Some(patrol) = patrol {
                if !patrol.completed_points.contains(&id) {
                    patrol.completed_points.push(id);
                }
            }
        });
        Ok(())
    }

    async fn end_patrol(&self) -> Result {
        if self.fail_ends.load(Ordering::SeqCst) {
            bail!("Store is unavailable");
        }
        self.ends.fetch_add(1, Ordering::SeqCst);
        self.patrols.send_replace(None);
        Ok(())
    }

    fn settings(&self) -> PatrolSettings {
        PatrolSettings::default()
    }

    fn test_mode(&self) -> TestMode {
        *self.test_mode.lock().unwrap()
    }

    async fn toggle_test_mode(&self) -> Result<TestMode> {
        let mode = {
            let mut mode = self.test_mode.lock().unwrap();
            *mode = mode.toggled();
            *mode
        };
        Ok(mode)
    }
}

#[derive(Clone, Default)]
pub struct MockLocation {
    position: Arc<Mutex<Option<Position>>>,
    watching: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
}

impl MockLocation {
    pub fn set(&self, position: Option<Position>) {
        *self.position.lock().unwrap() = position;
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl LocationProvider for MockLocation {
    fn start_watching(&self, _options: &WatchOptions) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.watching.store(true, Ordering::SeqCst);
    }

    fn stop_watching(&self) {
        self.watching.store(false, Ordering::SeqCst);
    }

    fn position(&self) -> Option<Position> {
        *self.position.lock().unwrap()
    }
}

#[derive(Clone)]
pub struct RecordingHost {
    toasts: Arc<Mutex<Vec<Toast>>>,
    navigations: Arc<Mutex<Vec<Route>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    confirm_answer: Arc<AtomicBool>,
    updates: Arc<AtomicUsize>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self {
            toasts: Arc::default(),
            navigations: Arc::default(),
            prompts: Arc::default(),
            confirm_answer: Arc::new(AtomicBool::new(true)),
            updates: Arc::default(),
        }
    }
}

impl RecordingHost {
    pub fn answer_confirm(&self, answer: bool) {
        self.confirm_answer.store(answer, Ordering::SeqCst);
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }

    pub fn navigations(&self) -> Vec<Route> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl StateUpdateSender for RecordingHost {
    fn send_update(&self) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

impl ScreenHost for RecordingHost {
    fn toast(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }

    fn navigate(&self, route: Route) {
        self.navigations.lock().unwrap().push(route);
    }

    async fn confirm(&self, message: &str) -> bool {
        self.prompts.lock().unwrap().push(message.to_string());
        self.confirm_answer.load(Ordering::SeqCst)
    }
}
