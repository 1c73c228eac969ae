use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::{json, Value};
use session::{
    ConnectionPhase, SessionClient, SessionConfig, SessionError, SessionUpdate, Severity, Transport, TransportEvent,
    TransportEventKind,
};

#[derive(Default)]
struct Log {
    opened: Vec<u64>,
    emitted: Vec<(String, Option<Value>)>,
    closes: usize,
    connected: bool,
}

/// Records every call; `emit` only succeeds between `open` and `close`.
#[derive(Clone, Default)]
struct FakeTransport(Arc<Mutex<Log>>);

impl Transport for FakeTransport {
    fn open(&mut self, generation: u64) -> Result<(), SessionError> {
        let mut log = self.0.lock();
        log.opened.push(generation);
        log.connected = true;
        Ok(())
    }

    fn emit(&mut self, event: &str, payload: Option<Value>) -> Result<(), SessionError> {
        let mut log = self.0.lock();
        if !log.connected {
            return Err(SessionError::NotConnected);
        }
        log.emitted.push((event.to_owned(), payload));
        Ok(())
    }

    fn close(&mut self) {
        let mut log = self.0.lock();
        log.closes += 1;
        log.connected = false;
    }
}

fn client() -> (SessionClient<FakeTransport>, Arc<Mutex<Log>>) {
    let transport = FakeTransport::default();
    let log = Arc::clone(&transport.0);
    (SessionClient::new(SessionConfig::default(), transport), log)
}

fn event(client: &SessionClient<FakeTransport>, kind: TransportEventKind) -> TransportEvent {
    TransportEvent {
        generation: client.generation(),
        kind,
    }
}

fn connected() -> (SessionClient<FakeTransport>, Arc<Mutex<Log>>) {
    let (mut client, log) = client();
    client.connect(Instant::now()).unwrap();
    let ack = event(&client, TransportEventKind::Connected { sid: "abc".into() });
    client.handle_event(ack);
    (client, log)
}

fn emitted(log: &Arc<Mutex<Log>>) -> Vec<String> {
    log.lock().emitted.iter().map(|(name, _)| name.clone()).collect()
}

#[test]
fn starts_disconnected() {
    let (client, _) = client();
    assert_eq!(client.phase(), ConnectionPhase::Disconnected);
    assert_eq!(client.state().status.text, "Not connected");
    assert!(client.state().active_controllers.contains("manual"));
    assert!(client.deadline().is_none());
}

#[test]
fn connect_times_out_at_the_deadline_and_not_before() {
    let (mut client, log) = client();
    let start = Instant::now();
    client.connect(start).unwrap();
    assert_eq!(client.phase(), ConnectionPhase::Connecting);
    assert_eq!(client.state().status.text, "Connecting...");
    client.drain_updates();

    assert!(!client.poll_timeout(start + Duration::from_millis(4900)));
    assert_eq!(client.phase(), ConnectionPhase::Connecting);

    assert!(client.poll_timeout(start + Duration::from_millis(5000)));
    assert_eq!(client.phase(), ConnectionPhase::Disconnected);
    assert_eq!(client.state().status.text, "Failed to connect to server");
    assert_eq!(client.state().status.severity, Severity::Error);
    assert_eq!(log.lock().closes, 1);

    let phases: Vec<_> = client
        .drain_updates()
        .into_iter()
        .filter_map(|u| match u {
            SessionUpdate::Phase(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(phases, vec![ConnectionPhase::Failed, ConnectionPhase::Disconnected]);

    // Fires once.
    assert!(!client.poll_timeout(start + Duration::from_millis(9000)));
}

#[test]
fn acknowledgment_cancels_the_timeout_and_sends_init() {
    let (mut client, log) = connected();
    assert_eq!(client.phase(), ConnectionPhase::Connected);
    assert_eq!(client.state().status.text, "Connected! SID: abc");
    assert!(client.deadline().is_none());
    assert!(!client.poll_timeout(Instant::now() + Duration::from_secs(60)));
    assert_eq!(client.phase(), ConnectionPhase::Connected);

    let log = log.lock();
    assert_eq!(log.emitted.len(), 1);
    assert_eq!(log.emitted[0].0, "init");
    assert_eq!(
        log.emitted[0].1,
        Some(json!({"sim_type": "cartpole", "controllers": ["manual"]}))
    );
}

#[test]
fn connect_is_a_no_op_while_connecting_or_connected() {
    let (mut client, log) = client();
    let start = Instant::now();
    client.connect(start).unwrap();
    client.connect(start + Duration::from_millis(100)).unwrap();
    assert_eq!(log.lock().opened.len(), 1);
    assert_eq!(client.deadline(), Some(start + Duration::from_millis(5000)));
}

#[test]
fn simulation_started_records_the_url_and_disconnect_clears_it() {
    let (mut client, _) = connected();
    let started = event(
        &client,
        TransportEventKind::Event {
            name: "simulation_started".into(),
            payload: Some(json!({"url": "http://localhost:7000/static/"})),
        },
    );
    client.handle_event(started);
    assert_eq!(client.state().status.text, "Simulation started!");
    assert_eq!(
        client.state().visualization_url.as_deref(),
        Some("http://localhost:7000/static/")
    );

    let closed = event(&client, TransportEventKind::Closed { reason: "io server disconnect".into() });
    client.handle_event(closed);
    assert_eq!(client.phase(), ConnectionPhase::Disconnected);
    assert_eq!(client.state().status.text, "Disconnected");
    assert!(client.state().visualization_url.is_none());
}

#[test]
fn error_event_is_not_fatal() {
    let (mut client, _) = connected();
    let error = event(
        &client,
        TransportEventKind::Event {
            name: "error".into(),
            payload: Some(json!({"message": "Simulation already initialized"})),
        },
    );
    client.handle_event(error);
    assert_eq!(client.phase(), ConnectionPhase::Connected);
    assert_eq!(client.state().status.text, "Error: Simulation already initialized");
    assert_eq!(client.state().status.severity, Severity::Error);
}

#[test]
fn events_from_an_abandoned_attempt_are_ignored() {
    let (mut client, log) = client();
    let start = Instant::now();
    client.connect(start).unwrap();
    let stale_generation = client.generation();
    client.poll_timeout(start + Duration::from_millis(5000));

    client.connect(start + Duration::from_millis(6000)).unwrap();
    client.handle_event(TransportEvent {
        generation: stale_generation,
        kind: TransportEventKind::Connected { sid: "late".into() },
    });
    assert_eq!(client.phase(), ConnectionPhase::Connecting);
    assert!(log.lock().emitted.is_empty());

    // The retry still times out on its own deadline.
    assert!(client.poll_timeout(start + Duration::from_millis(11_000)));
}

#[test]
fn toggling_twice_restores_the_controller_set() {
    let (mut client, log) = connected();
    let before = client.state().active_controllers.clone();

    assert!(client.toggle_controller("pid").unwrap());
    assert!(client.state().active_controllers.contains("pid"));
    assert_eq!(client.state().status.text, "Toggled controller pid");
    assert!(!client.toggle_controller("pid").unwrap());
    assert_eq!(client.state().active_controllers, before);

    let log = log.lock();
    let toggles: Vec<_> = log.emitted.iter().filter(|(name, _)| name == "ui_input").collect();
    assert_eq!(toggles.len(), 2);
    assert_eq!(
        toggles[0].1,
        Some(json!({"action": "toggle_controller", "value": {"controller": "pid"}}))
    );
}

#[test]
fn toggle_while_disconnected_only_changes_local_state() {
    let (mut client, log) = client();
    assert!(!client.toggle_controller("manual").unwrap());
    assert!(client.state().active_controllers.is_empty());
    assert!(log.lock().emitted.is_empty());
}

#[test]
fn toggle_flips_locally_even_when_the_send_fails() {
    let (mut client, log) = connected();
    log.lock().connected = false;
    client.drain_updates();

    assert!(matches!(client.toggle_controller("pid"), Err(SessionError::NotConnected)));
    assert_eq!(client.phase(), ConnectionPhase::Connected);
    assert!(client.state().active_controllers.contains("pid"));
    assert_eq!(
        client.drain_updates(),
        vec![SessionUpdate::ActiveControllers(vec!["manual".into(), "pid".into()])]
    );
}

#[test]
fn init_declares_controllers_toggled_before_connecting() {
    let (mut client, log) = client();
    client.toggle_controller("pid").unwrap();
    client.connect(Instant::now()).unwrap();
    let ack = event(&client, TransportEventKind::Connected { sid: "s".into() });
    client.handle_event(ack);
    assert_eq!(
        log.lock().emitted[0].1,
        Some(json!({"sim_type": "cartpole", "controllers": ["manual", "pid"]}))
    );
}

#[test]
fn keyboard_input_is_ignored_while_disconnected() {
    let (mut client, log) = client();
    client.send_keyboard_input("ArrowLeft", true).unwrap();
    assert!(log.lock().emitted.is_empty());

    let (mut client, log) = connected();
    client.send_keyboard_input("ArrowLeft", true).unwrap();
    client.send_keyboard_input("ArrowLeft", false).unwrap();
    let log = log.lock();
    assert_eq!(log.emitted[1], ("keyboard_down".to_owned(), Some(json!({"key": "ArrowLeft"}))));
    assert_eq!(log.emitted[2], ("keyboard_up".to_owned(), Some(json!({"key": "ArrowLeft"}))));
}

#[test]
fn fire_and_forget_messages_use_their_wire_names() {
    let (mut client, log) = connected();
    client.set_force(2.5).unwrap();
    client.reset().unwrap();
    client.set_playback(false).unwrap();
    client.update_params(json!({"kp": 0.1})).unwrap();
    client.request_output().unwrap();

    assert_eq!(client.state().force, 2.5);
    assert_eq!(client.state().status.text, "Simulation reset");
    assert_eq!(
        emitted(&log),
        vec!["init", "ui_input", "input_event", "ui_input", "update_param", "get_output"]
    );
    assert_eq!(log.lock().emitted[5].1, None);
}

#[test]
fn connect_error_fails_the_attempt() {
    let (mut client, _) = client();
    client.connect(Instant::now()).unwrap();
    client.drain_updates();
    let refused = event(&client, TransportEventKind::ConnectError("Server at capacity".into()));
    client.handle_event(refused);

    assert_eq!(client.phase(), ConnectionPhase::Disconnected);
    assert!(client.state().status.text.contains("Server at capacity"));
    assert!(client.deadline().is_none());
    assert!(client
        .drain_updates()
        .contains(&SessionUpdate::Phase(ConnectionPhase::Failed)));
}

#[test]
fn sim_data_is_kept() {
    let (mut client, _) = connected();
    let data = event(
        &client,
        TransportEventKind::Event {
            name: "sim_data".into(),
            payload: Some(json!({"cart_position": 1.5})),
        },
    );
    client.handle_event(data);
    assert_eq!(client.state().last_sim_data, Some(json!({"cart_position": 1.5})));
}

#[test]
fn disconnect_and_drop_close_the_transport() {
    let (mut client, log) = connected();
    client.disconnect();
    assert_eq!(client.phase(), ConnectionPhase::Disconnected);
    assert_eq!(client.state().status.text, "Disconnected");
    let closes = log.lock().closes;
    assert!(closes >= 1);

    drop(client);
    assert_eq!(log.lock().closes, closes + 1);
}
