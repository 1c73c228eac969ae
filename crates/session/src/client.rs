//! # Session Client
//!
//! Connection state machine for a remote simulation session:
//!
//! ```text
//! Disconnected --connect--> Connecting --ack--> Connected
//!                           Connecting --timeout / refused--> Failed --> Disconnected
//!                           Connected  --disconnect / closed--> Disconnected
//! ```
//!
//! The client performs no I/O and reads no clock. Time is passed in, the
//! transport is injected, and every observable change is queued as a
//! [`SessionUpdate`] for the caller to drain.

use std::time::Instant;

use indexmap::IndexSet;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::protocol::{Inbound, InitPayload, InputEvent, Outbound, UiInput};
use crate::transport::{Transport, TransportEvent, TransportEventKind};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub severity: Severity,
}

impl StatusMessage {
    fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }
}

/// Observable state of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub phase: ConnectionPhase,
    pub visualization_url: Option<String>,
    /// Controllers believed active on the server, in activation order.
    pub active_controllers: IndexSet<String>,
    pub status: StatusMessage,
    /// Last manual force sent.
    pub force: f64,
    pub last_sim_data: Option<Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionUpdate {
    Phase(ConnectionPhase),
    Status(StatusMessage),
    VisualizationUrl(Option<String>),
    ActiveControllers(Vec<String>),
    SimData(Value),
}

pub struct SessionClient<T: Transport> {
    config: SessionConfig,
    transport: T,
    state: SessionState,
    generation: u64,
    deadline: Option<Instant>,
    updates: Vec<SessionUpdate>,
}

impl<T: Transport> SessionClient<T> {
    #[must_use]
    pub fn new(config: SessionConfig, transport: T) -> Self {
        let state = SessionState {
            phase: ConnectionPhase::Disconnected,
            visualization_url: None,
            active_controllers: config.initial_controllers.iter().cloned().collect(),
            status: StatusMessage::new("Not connected", Severity::Error),
            force: 0.0,
            last_sim_data: None,
        };
        Self {
            config,
            transport,
            state,
            generation: 0,
            deadline: None,
            updates: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.state.phase
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current connection attempt; events tagged otherwise are stale.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When the pending connect attempt times out, if one is pending.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take every update queued since the last call.
    pub fn drain_updates(&mut self) -> Vec<SessionUpdate> {
        std::mem::take(&mut self.updates)
    }

    fn set_phase(&mut self, phase: ConnectionPhase) {
        if self.state.phase != phase {
            info!(from = ?self.state.phase, to = ?phase, "session phase");
            self.state.phase = phase;
            self.updates.push(SessionUpdate::Phase(phase));
        }
    }

    fn set_status(&mut self, text: impl Into<String>, severity: Severity) {
        let status = StatusMessage::new(text, severity);
        match severity {
            Severity::Error => warn!(status = %status.text, "session status"),
            Severity::Info | Severity::Success => info!(status = %status.text, "session status"),
        }
        self.state.status = status.clone();
        self.updates.push(SessionUpdate::Status(status));
    }

    fn set_visualization_url(&mut self, url: Option<String>) {
        if self.state.visualization_url != url {
            self.state.visualization_url.clone_from(&url);
            self.updates.push(SessionUpdate::VisualizationUrl(url));
        }
    }

    /// Drop the transport and make every in-flight event stale.
    fn abandon(&mut self) {
        self.deadline = None;
        self.transport.close();
        self.generation += 1;
    }

    /// Start a connection attempt that must be acknowledged by `now` plus the
    /// configured timeout. No-op while connecting or connected.
    ///
    /// # Errors
    ///
    /// Fails if the transport cannot start the attempt; the client is then
    /// back in `Disconnected`.
    pub fn connect(&mut self, now: Instant) -> Result<(), SessionError> {
        if matches!(self.state.phase, ConnectionPhase::Connecting | ConnectionPhase::Connected) {
            debug!(phase = ?self.state.phase, "connect ignored");
            return Ok(());
        }
        self.generation += 1;
        if let Err(e) = self.transport.open(self.generation) {
            self.set_status(format!("Failed to connect to server: {e}"), Severity::Error);
            self.set_phase(ConnectionPhase::Disconnected);
            return Err(e);
        }
        self.deadline = Some(now + self.config.connect_timeout());
        self.set_phase(ConnectionPhase::Connecting);
        self.set_status("Connecting...", Severity::Info);
        Ok(())
    }

    /// End the session locally. No-op when not connecting or connected.
    pub fn disconnect(&mut self) {
        if !matches!(self.state.phase, ConnectionPhase::Connecting | ConnectionPhase::Connected) {
            return;
        }
        self.abandon();
        self.set_visualization_url(None);
        self.set_phase(ConnectionPhase::Disconnected);
        self.set_status("Disconnected", Severity::Error);
    }

    /// Fail the pending attempt if its deadline has passed.
    ///
    /// Returns whether the attempt timed out.
    pub fn poll_timeout(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline && self.state.phase == ConnectionPhase::Connecting => {
                warn!(generation = self.generation, "connect timed out");
                self.fail("Failed to connect to server".to_owned());
                true
            }
            _ => false,
        }
    }

    fn fail(&mut self, status: String) {
        self.abandon();
        self.set_phase(ConnectionPhase::Failed);
        self.set_status(status, Severity::Error);
        self.set_visualization_url(None);
        self.set_phase(ConnectionPhase::Disconnected);
    }

    /// Feed one transport event. Events from an abandoned attempt are
    /// dropped.
    pub fn handle_event(&mut self, event: TransportEvent) {
        let live = matches!(self.state.phase, ConnectionPhase::Connecting | ConnectionPhase::Connected);
        if event.generation != self.generation || !live {
            debug!(
                generation = event.generation,
                current = self.generation,
                kind = ?event.kind,
                "stale transport event dropped"
            );
            return;
        }

        match event.kind {
            TransportEventKind::Connected { sid } => self.on_connected(&sid),
            TransportEventKind::Event { name, payload } => self.on_event(&name, payload),
            TransportEventKind::ConnectError(message) => {
                self.fail(format!("Connection refused: {message}"));
            }
            TransportEventKind::Closed { reason } => {
                debug!(%reason, "transport closed");
                if self.state.phase == ConnectionPhase::Connecting {
                    self.fail(format!("Failed to connect to server: {reason}"));
                } else {
                    self.abandon();
                    self.set_visualization_url(None);
                    self.set_phase(ConnectionPhase::Disconnected);
                    self.set_status("Disconnected", Severity::Error);
                }
            }
        }
    }

    fn on_connected(&mut self, sid: &str) {
        if self.state.phase != ConnectionPhase::Connecting {
            return;
        }
        self.deadline = None;
        self.set_phase(ConnectionPhase::Connected);
        self.set_status(format!("Connected! SID: {sid}"), Severity::Success);

        let init = Outbound::Init(InitPayload {
            sim_type: self.config.sim_type.clone(),
            controllers: self.state.active_controllers.iter().cloned().collect(),
        });
        if let Err(e) = self.send(&init) {
            warn!(error = %e, "init not sent");
        }
    }

    fn on_event(&mut self, name: &str, payload: Option<Value>) {
        match Inbound::from_event(name, payload) {
            Ok(Inbound::SimulationStarted { url }) => {
                self.set_status("Simulation started!", Severity::Success);
                self.set_visualization_url(Some(url));
            }
            Ok(Inbound::Error { message }) => {
                self.set_status(format!("Error: {message}"), Severity::Error);
            }
            Ok(Inbound::SimData(data)) => {
                self.state.last_sim_data = Some(data.clone());
                self.updates.push(SessionUpdate::SimData(data));
            }
            Ok(Inbound::Other { name, .. }) => debug!(event = %name, "unhandled server event"),
            Err(e) => warn!(error = %e, "bad server event"),
        }
    }

    /// Emit while connected; otherwise the message is dropped.
    fn send(&mut self, message: &Outbound) -> Result<(), SessionError> {
        if self.state.phase != ConnectionPhase::Connected {
            debug!(event = message.event_name(), "not connected, message dropped");
            return Ok(());
        }
        let payload = message.payload()?;
        self.transport.emit(message.event_name(), payload)
    }

    /// Flip `controller` locally and ask the server to do the same, without
    /// waiting for confirmation. Returns whether it is now active locally.
    ///
    /// # Errors
    ///
    /// Transport failure; the local flip stands regardless.
    pub fn toggle_controller(&mut self, controller: &str) -> Result<bool, SessionError> {
        let active = if self.state.active_controllers.shift_remove(controller) {
            false
        } else {
            self.state.active_controllers.insert(controller.to_owned());
            true
        };
        self.updates.push(SessionUpdate::ActiveControllers(
            self.state.active_controllers.iter().cloned().collect(),
        ));
        self.send(&Outbound::Ui(UiInput::ToggleController {
            controller: controller.to_owned(),
        }))?;
        self.set_status(format!("Toggled controller {controller}"), Severity::Success);
        Ok(active)
    }

    /// # Errors
    ///
    /// Transport failure.
    pub fn set_force(&mut self, force: f64) -> Result<(), SessionError> {
        self.state.force = force;
        self.send(&Outbound::Ui(UiInput::SetForce(force)))
    }

    /// # Errors
    ///
    /// Transport failure.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.send(&Outbound::Input(InputEvent::Reset))?;
        self.set_status("Simulation reset", Severity::Success);
        Ok(())
    }

    /// # Errors
    ///
    /// Transport failure.
    pub fn set_playback(&mut self, playing: bool) -> Result<(), SessionError> {
        let input = if playing { UiInput::Play } else { UiInput::Pause };
        self.send(&Outbound::Ui(input))
    }

    /// Forward a key edge. Ignored unless connected.
    ///
    /// # Errors
    ///
    /// Transport failure.
    pub fn send_keyboard_input(&mut self, key: &str, down: bool) -> Result<(), SessionError> {
        let key = key.to_owned();
        self.send(&if down { Outbound::KeyDown(key) } else { Outbound::KeyUp(key) })
    }

    /// # Errors
    ///
    /// Transport failure.
    pub fn update_params(&mut self, params: Value) -> Result<(), SessionError> {
        self.send(&Outbound::UpdateParam(params))
    }

    /// # Errors
    ///
    /// Transport failure.
    pub fn request_output(&mut self) -> Result<(), SessionError> {
        self.send(&Outbound::GetOutput)
    }
}

impl<T: Transport> Drop for SessionClient<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
