use log::{error, info, warn};
use patrol_logic::{PatrolScreen, Position, Route, ScreenHost, StateUpdateSender, Toast};
use patrol_test_shared::*;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::{Mutex, mpsc},
};

/// Forwards toasts, navigation and state updates from the screen to whoever is connected
struct DaemonHost {
    events: mpsc::Sender<TestingResponse>,
    updates: mpsc::Sender<()>,
    confirm_answer: Arc<AtomicBool>,
}

impl DaemonHost {
    fn push(&self, resp: impl Into<TestingResponse>) {
        if let Err(why) = self.events.try_send(resp.into()) {
            warn!("Dropped screen event: {why}");
        }
    }
}

impl StateUpdateSender for DaemonHost {
    fn send_update(&self) {
        // A full channel already has an update waiting to be read
        self.updates.try_send(()).ok();
    }
}

impl ScreenHost for DaemonHost {
    fn toast(&self, toast: Toast) {
        info!("Toast ({:?}): {}", toast.kind, toast.message);
        self.push(toast);
    }

    fn navigate(&self, route: Route) {
        info!("Navigating to {}", route.path());
        self.push(route);
    }

    async fn confirm(&self, message: &str) -> bool {
        let answer = self.confirm_answer.load(Ordering::SeqCst);
        info!("Asked \"{message}\", answering {answer}");
        answer
    }
}

type Screen = PatrolScreen<MemoryStore, ManualLocation, DaemonHost>;

struct Daemon {
    screen: Arc<Screen>,
    store: Arc<MemoryStore>,
    location: ManualLocation,
    confirm_answer: Arc<AtomicBool>,
    updates: Mutex<mpsc::Receiver<()>>,
    tick_interval: Duration,
}

impl Daemon {
    fn new(scenario: Scenario, events: mpsc::Sender<TestingResponse>) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel(2);
        let confirm_answer = Arc::new(AtomicBool::new(false));
        let location = ManualLocation::new(scenario.position);
        let store = Arc::new(MemoryStore::new(
            Some(scenario.patrol),
            scenario.settings,
            scenario.test_mode,
        ));
        let host = DaemonHost {
            events,
            updates: updates_tx,
            confirm_answer: confirm_answer.clone(),
        };
        let tick_interval = scenario.screen.tick_interval;
        let screen = Screen::new(scenario.screen, store.clone(), location.clone(), host);

        Self {
            screen: Arc::new(screen),
            store,
            location,
            confirm_answer,
            updates: Mutex::new(updates_rx),
            tick_interval,
        }
    }

    fn screen_loop(&self, events: mpsc::Sender<TestingResponse>) {
        let screen = self.screen.clone();
        tokio::spawn(async move {
            let resp = match screen.main_loop().await {
                Ok(exit) => {
                    info!("Screen exited: {exit:?}");
                    TestingResponse::from(exit)
                }
                Err(why) => {
                    error!("Screen Error: {why:?}");
                    TestingResponse::from(why)
                }
            };
            if events.send(resp).await.is_err() {
                warn!("Nobody to tell about the screen exiting");
            }
        });
    }

    /// Wait for the screen to send a fresh update, ignoring ones nobody asked for yet
    async fn next_update(&self) -> Result {
        let mut updates = self.updates.lock().await;
        while updates.try_recv().is_ok() {}
        tokio::time::timeout(self.tick_interval * 2, updates.recv())
            .await
            .context("Screen stopped sending updates")?
            .context("Screen went away")
    }

    async fn process_req(&self, req: TestingRequest) -> TestingResponse {
        match req {
            TestingRequest::SetPosition { lat, long } => {
                self.location.set(Some(Position::new(lat, long)));
                TestingResponse::Complete
            }
            TestingRequest::ClearPosition => {
                self.location.set(None);
                TestingResponse::Complete
            }
            TestingRequest::VerifyPoint(id) => match self.screen.verify_point(id).await {
                Ok(outcome) => outcome.into(),
                Err(why) => why.into(),
            },
            TestingRequest::EndPatrol { confirm } => {
                self.confirm_answer.store(confirm, Ordering::SeqCst);
                match self.screen.end_patrol().await {
                    Ok(ended) => TestingResponse::PatrolEnded {
                        ended,
                        skipped: if ended { self.store.skipped() } else { vec![] },
                    },
                    Err(why) => why.into(),
                }
            }
            TestingRequest::ToggleTestMode => match self.screen.toggle_test_mode().await {
                Ok(mode) => mode.into(),
                Err(why) => why.into(),
            },
            TestingRequest::GetState => TestingResponse::State {
                ui: self.screen.get_ui_state().await,
                watching_location: self.location.is_watching(),
            },
            TestingRequest::NextTick => match self.next_update().await {
                Ok(()) => TestingResponse::Complete,
                Err(why) => why.into(),
            },
            TestingRequest::Unmount => {
                self.screen.unmount().await;
                TestingResponse::Complete
            }
        }
    }
}

fn encode(resp: &TestingResponse) -> Result<Vec<u8>> {
    let mut encoded = serde_json::to_vec(resp).context("Failed to encode response")?;
    encoded.push(b'\n');
    Ok(encoded)
}

use interprocess::local_socket::{ListenerOptions, tokio::prelude::*};

const CLI_MSG: &str = "Usage: patrol-test-daemon SOCKET_NAME SCENARIO_PATH";

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> Result {
    colog::init();

    let args = std::env::args().collect::<Vec<_>>();
    let (Some(raw_socket_name), Some(scenario_path)) = (args.get(1), args.get(2)) else {
        bail!(CLI_MSG);
    };

    let raw_scenario = std::fs::read_to_string(scenario_path)
        .with_context(|| format!("Failed to read scenario at {scenario_path}"))?;
    let scenario = Scenario::from_json(&raw_scenario)?;

    let socket_name = get_socket_name(raw_socket_name.clone())?;
    let opts = ListenerOptions::new().name(socket_name);
    let listener = opts.create_tokio().context("Failed to bind to socket")?;
    let (resp_tx, mut resp_rx) = mpsc::channel::<TestingResponse>(40);

    let daemon = Daemon::new(scenario, resp_tx.clone());

    daemon.screen_loop(resp_tx);

    info!("Testing Daemon Ready");

    'server: loop {
        let res = tokio::select! {
            res = listener.accept() => {
                res
            },
            Ok(_) = tokio::signal::ctrl_c() => {
                break 'server;
            }
        };

        match res {
            Ok(stream) => {
                let mut recv = BufReader::new(&stream);
                let mut send = &stream;

                let mut buffer = String::with_capacity(256);

                loop {
                    let resp = tokio::select! {
                        Ok(_) = tokio::signal::ctrl_c() => {
                            break 'server;
                        }
                        res = recv.read_line(&mut buffer) => {
                            match res {
                                Ok(0) => {
                                    break;
                                }
                                Ok(_amnt) => {
                                    let parsed = serde_json::from_str::<TestingRequest>(&buffer);
                                    buffer.clear();
                                    match parsed {
                                        Ok(req) => daemon.process_req(req).await,
                                        Err(why) => TestingResponse::Error(format!("Bad request: {why}")),
                                    }
                                }
                                Err(why) => {
                                    warn!("Read Error: {why:?}");
                                    break;
                                }
                            }
                        }
                        Some(resp) = resp_rx.recv() => {
                            resp
                        }
                    };

                    if let Err(why) = send.write_all(&encode(&resp)?).await {
                        warn!("Failed to send response: {why:?}");
                        break;
                    }
                }
            }
            Err(why) => error!("Error from connection: {why:?}"),
        }
    }

    daemon.screen.unmount().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::{task::yield_now, test};

    use super::*;

    const SCENARIO: &str = include_str!("../scenarios/two_points.json");

    async fn settle() {
        for _ in 0..5 {
            yield_now().await;
        }
    }

    async fn start() -> (Daemon, Scenario, mpsc::Receiver<TestingResponse>) {
        tokio::time::pause();
        let scenario = Scenario::from_json(SCENARIO).expect("Failed to parse scenario");
        let (events, events_rx) = mpsc::channel(40);
        let daemon = Daemon::new(scenario.clone(), events.clone());
        daemon.screen_loop(events);
        settle().await;
        (daemon, scenario, events_rx)
    }

    #[test]
    async fn test_next_tick_waits_for_screen_update() {
        let (daemon, _, _events) = start().await;

        let resp = daemon.process_req(TestingRequest::NextTick).await;
        assert!(matches!(resp, TestingResponse::Complete), "Got {resp:?}");

        daemon.process_req(TestingRequest::Unmount).await;
        settle().await;

        let resp = daemon.process_req(TestingRequest::NextTick).await;
        assert!(
            matches!(resp, TestingResponse::Error(_)),
            "Ticked after unmount: {resp:?}"
        );
    }

    #[test]
    async fn test_end_reports_skipped_points_and_watch() {
        let (daemon, scenario, _events) = start().await;
        let first = scenario.patrol.patrol_points[0].id;
        let second = scenario.patrol.patrol_points[1].id;

        let resp = daemon.process_req(TestingRequest::GetState).await;
        assert!(matches!(
            resp,
            TestingResponse::State {
                ui: Some(_),
                watching_location: true
            }
        ));

        let resp = daemon.process_req(TestingRequest::VerifyPoint(first)).await;
        assert!(matches!(
            resp,
            TestingResponse::Verified(patrol_logic::VerifyOutcome::Verified { remaining: 1 })
        ));

        let resp = daemon
            .process_req(TestingRequest::EndPatrol { confirm: true })
            .await;
        let TestingResponse::PatrolEnded { ended, skipped } = resp else {
            panic!("Expected PatrolEnded, got {resp:?}");
        };
        assert!(ended);
        assert_eq!(skipped, vec![second]);

        settle().await;
        let resp = daemon.process_req(TestingRequest::GetState).await;
        assert!(matches!(
            resp,
            TestingResponse::State {
                ui: None,
                watching_location: false
            }
        ));
    }
}
