//! Integration tests for the reconciliation cycle over mock collaborators.

use autoarm::agent::Agent;
use autoarm::camera::{ArmStateGateway, CameraError};
use autoarm::cloud::{CloudError, StatusMessage, StatusSink, StopCommand};
use autoarm::config::Config;
use autoarm::reconcile::{Action, CycleOutcome};
use autoarm::router::{DiagnosticSource, RouterError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// A dump with one binary line and one station block for 10.0.0.5.
const PHONE_HOME_DUMP: &[u8] = b"\xff\xfe\x00\nstation_info {\n  dhcp_hostname : \"phone\"\n  connected : \"true\"\n  ip_addresses : \"10.0.0.5\"\n}\n";

/// A dump whose only station is not a controlling device.
const STRANGER_DUMP: &[u8] = b"station_info {\n  dhcp_hostname : \"guest\"\n  connected : \"true\"\n  ip_addresses : \"10.0.0.99\"\n}\n";

fn test_config(cycle_interval_secs: u64, report_timeout_secs: u64) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        (
            "MESSAGING_CONNECTION_STRING",
            "Endpoint=https://hub.example.net;Token=abc".to_string(),
        ),
        ("CAMERA_USER", "user".to_string()),
        ("CAMERA_PASS", "pass".to_string()),
        ("CAMERA_NETWORK", "home".to_string()),
        ("CONTROLLING_IPS", "10.0.0.5".to_string()),
        ("CYCLE_INTERVAL_SECS", cycle_interval_secs.to_string()),
        ("REPORT_TIMEOUT_SECS", report_timeout_secs.to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config")
}

#[derive(Clone)]
struct MockRouter {
    body: Option<Vec<u8>>,
    fetches: Arc<AtomicUsize>,
}

impl MockRouter {
    fn serving(body: &[u8]) -> Self {
        Self {
            body: Some(body.to_vec()),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn offline() -> Self {
        Self {
            body: None,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl DiagnosticSource for MockRouter {
    async fn fetch_report(&self) -> Result<Vec<u8>, RouterError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.body
            .clone()
            .ok_or_else(|| RouterError::Network("router offline".to_string()))
    }
}

#[derive(Clone)]
struct MockCamera {
    armed: Option<bool>,
    writes: Arc<Mutex<Vec<bool>>>,
}

impl MockCamera {
    fn armed(armed: bool) -> Self {
        Self {
            armed: Some(armed),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn offline() -> Self {
        Self {
            armed: None,
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ArmStateGateway for MockCamera {
    async fn read_armed(&self) -> Result<bool, CameraError> {
        self.armed
            .ok_or_else(|| CameraError::Network("camera offline".to_string()))
    }

    async fn set_armed(&self, armed: bool) -> Result<(), CameraError> {
        self.writes.lock().unwrap().push(armed);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct MockCloud {
    sent: Arc<Mutex<Vec<StatusMessage>>>,
}

impl StatusSink for MockCloud {
    async fn send_status(&self, message: &StatusMessage) -> Result<(), CloudError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A sink whose sends never complete.
struct HangingCloud;

impl StatusSink for HangingCloud {
    async fn send_status(&self, _message: &StatusMessage) -> Result<(), CloudError> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

#[tokio::test]
async fn test_cycle_disarms_when_controlling_device_present() {
    let camera = MockCamera::armed(true);
    let writes = camera.writes.clone();
    let agent = Agent::new(
        &test_config(30, 30),
        MockRouter::serving(PHONE_HOME_DUMP),
        camera,
        MockCloud::default(),
    );

    let outcome = agent.run_cycle().await;

    assert_eq!(outcome.action, Action::Disarm);
    assert_eq!(outcome.armed, Some(true));
    assert_eq!(outcome.connected_addresses, vec!["10.0.0.5"]);
    assert!(outcome.error.is_none());
    assert_eq!(*writes.lock().unwrap(), vec![false]);
}

#[tokio::test]
async fn test_cycle_arms_when_nobody_home() {
    let camera = MockCamera::armed(false);
    let writes = camera.writes.clone();
    let agent = Agent::new(
        &test_config(30, 30),
        MockRouter::serving(STRANGER_DUMP),
        camera,
        MockCloud::default(),
    );

    let outcome = agent.run_cycle().await;

    assert_eq!(outcome.action, Action::Arm);
    assert_eq!(outcome.connected_addresses, vec!["10.0.0.99"]);
    assert_eq!(*writes.lock().unwrap(), vec![true]);
}

#[tokio::test]
async fn test_arm_state_fetch_failure_suppresses_action() {
    let camera = MockCamera::offline();
    let writes = camera.writes.clone();
    let cloud = MockCloud::default();
    let sent = cloud.sent.clone();
    let agent = Agent::new(
        &test_config(30, 30),
        MockRouter::serving(PHONE_HOME_DUMP),
        camera,
        cloud,
    );

    let outcome = agent.run_cycle().await;

    assert_eq!(outcome.action, Action::None);
    assert_eq!(outcome.armed, None);
    assert!(outcome.error.as_deref().unwrap().contains("arm state read failed"));
    assert!(writes.lock().unwrap().is_empty());

    agent.report(&outcome).await;
    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].action, "");
    assert_eq!(sent[0].armed, None);
    assert_eq!(sent[0].error.as_deref(), Some(outcome.error.as_deref().unwrap()));
}

#[tokio::test]
async fn test_router_fetch_failure_suppresses_action() {
    // Nobody would appear home, but a failed presence fetch must never arm.
    let camera = MockCamera::armed(false);
    let writes = camera.writes.clone();
    let agent = Agent::new(
        &test_config(30, 30),
        MockRouter::offline(),
        camera,
        MockCloud::default(),
    );

    let outcome = agent.run_cycle().await;

    assert_eq!(outcome.action, Action::None);
    assert_eq!(outcome.armed, Some(false));
    assert!(outcome.connected_addresses.is_empty());
    assert!(outcome.error.as_deref().unwrap().contains("presence fetch failed"));
    assert!(writes.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_wait_prevents_next_fetch() {
    let router = MockRouter::serving(STRANGER_DUMP);
    let fetches = router.fetches.clone();
    let cloud = MockCloud::default();
    let sent = cloud.sent.clone();
    // An hour-long wait: the loop only exits promptly if the stop command
    // short-circuits it.
    let agent = Agent::new(&test_config(3600, 30), router, MockCamera::armed(true), cloud);

    let (stop_tx, stop_rx) = mpsc::channel::<StopCommand>(1);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = stop_tx
            .send(StopCommand {
                payload: "shutdown".to_string(),
            })
            .await;
    });

    agent.run(stop_rx).await;

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(sent.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_loop_continues_after_degraded_cycle() {
    let router = MockRouter::offline();
    let fetches = router.fetches.clone();
    let cloud = MockCloud::default();
    let sent = cloud.sent.clone();
    let agent = Agent::new(&test_config(30, 30), router, MockCamera::offline(), cloud);

    let (stop_tx, stop_rx) = mpsc::channel::<StopCommand>(1);
    tokio::spawn(async move {
        // Let two full cycles elapse before stopping.
        tokio::time::sleep(Duration::from_secs(70)).await;
        let _ = stop_tx
            .send(StopCommand {
                payload: "shutdown".to_string(),
            })
            .await;
    });

    agent.run(stop_rx).await;

    assert!(fetches.load(Ordering::SeqCst) >= 2);
    let sent = sent.lock().unwrap();
    assert!(sent.len() >= 2);
    assert!(sent.iter().all(|m| m.action.is_empty() && m.error.is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_report_deadline_overrun_is_not_fatal() {
    let agent = Agent::new(
        &test_config(30, 1),
        MockRouter::serving(STRANGER_DUMP),
        MockCamera::armed(true),
        HangingCloud,
    );

    let outcome = CycleOutcome {
        armed: Some(true),
        connected_addresses: vec![],
        action: Action::None,
        error: None,
    };

    // Returns once the deadline lapses instead of hanging on the sink.
    agent.report(&outcome).await;
}
