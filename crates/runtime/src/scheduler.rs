//! # Simulation Scheduler
//!
//! Owns the cart-pole engine and the controller registry and advances them
//! one fixed tick at a time:
//!
//! 1. drain queued [`SchedulerCommand`]s,
//! 2. read the state and let the registry pick a control force,
//! 3. add the manual force and apply the sum to the cart,
//! 4. step the engine and publish a [`TickFrame`].
//!
//! Everything happens on the thread that calls [`Scheduler::tick`]; other
//! threads talk to it through a [`SchedulerHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use control::{ControlCommand, ControllerRegistry};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use physics::{BodyPose, BodyState, CartPoleEngine, PhysicsError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::command::{SchedulerCommand, SchedulerHandle};
use crate::error::SchedulerError;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wall-clock rate of [`Scheduler::run_realtime`].
    pub tick_rate_hz: f64,
    /// Log a progress line every this many ticks; 0 disables it.
    pub log_every: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            log_every: 50,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
}

/// Everything that happened in one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickFrame {
    /// 1-based tick counter, monotonic across resets.
    pub tick: u64,
    /// State the controllers saw, before the step.
    pub observed: BodyState,
    /// State after the step.
    pub state: BodyState,
    pub command: ControlCommand,
    /// Control force plus manual force.
    pub applied_force: f64,
    pub poses: Vec<BodyPose>,
}

pub struct Scheduler {
    engine: CartPoleEngine,
    registry: ControllerRegistry,
    config: SchedulerConfig,
    phase: Phase,
    manual_force: f64,
    tick: u64,
    command_tx: Sender<SchedulerCommand>,
    command_rx: Receiver<SchedulerCommand>,
    subscribers: Vec<Sender<TickFrame>>,
    last_frame: Option<TickFrame>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("phase", &self.phase)
            .field("tick", &self.tick)
            .field("manual_force", &self.manual_force)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new(engine: CartPoleEngine, registry: ControllerRegistry, config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        Self {
            engine,
            registry,
            config,
            phase: Phase::Idle,
            manual_force: 0.0,
            tick: 0,
            command_tx,
            command_rx,
            subscribers: Vec::new(),
            last_frame: None,
        }
    }

    /// A handle for queuing commands from other threads.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            tx: self.command_tx.clone(),
        }
    }

    /// Receive every future frame on a bounded channel. A subscriber that
    /// falls `capacity` frames behind misses frames; the tick never waits.
    #[must_use]
    pub fn subscribe(&mut self, capacity: usize) -> Receiver<TickFrame> {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        self.subscribers.push(tx);
        rx
    }

    /// Drop every subscriber; their receivers see the channel close.
    pub fn unsubscribe_all(&mut self) {
        self.subscribers.clear();
    }

    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Running;
            info!(tick = self.tick, "scheduler started");
        }
    }

    /// Stop ticking. Once this returns no further tick runs until `start`.
    pub fn stop(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Idle;
            info!(tick = self.tick, "scheduler stopped");
        }
    }

    /// Put the engine back at rest, drop the manual force and controller
    /// history, and carry on in the phase it was in.
    pub fn reset(&mut self) {
        let was_running = self.phase == Phase::Running;
        self.stop();
        self.engine.reset();
        self.manual_force = 0.0;
        self.registry.reset();
        info!(was_running, "simulation reset");
        if was_running {
            self.start();
        }
    }

    /// Set the manual force added to the control force from the next tick on.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidForce`] for a non-finite force.
    pub fn apply_manual_force(&mut self, force: f64) -> Result<(), SchedulerError> {
        if !force.is_finite() {
            return Err(SchedulerError::InvalidForce(force));
        }
        self.manual_force = force;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails for an unknown controller id.
    pub fn enable_controller(&mut self, id: &str, enabled: bool) -> Result<(), SchedulerError> {
        Ok(self.registry.enable_controller(id, enabled)?)
    }

    /// # Errors
    ///
    /// Fails for an unknown controller id or a rejected parameter patch.
    pub fn set_parameters(&mut self, id: &str, params: &Value) -> Result<(), SchedulerError> {
        Ok(self.registry.set_parameters(id, params)?)
    }

    /// Knock the pole to `angle` radians.
    ///
    /// # Errors
    ///
    /// Fails for a non-finite angle.
    pub fn apply_disturbance(&mut self, angle: f64) -> Result<(), SchedulerError> {
        self.engine.set_pole_angle(angle)?;
        info!(angle, "disturbance applied");
        Ok(())
    }

    fn apply_command(&mut self, command: SchedulerCommand) -> Result<(), SchedulerError> {
        trace!(?command, "command");
        match command {
            SchedulerCommand::Start => self.start(),
            SchedulerCommand::Stop => self.stop(),
            SchedulerCommand::Reset => self.reset(),
            SchedulerCommand::ManualForce(force) => self.apply_manual_force(force)?,
            SchedulerCommand::EnableController { id, enabled } => self.enable_controller(&id, enabled)?,
            SchedulerCommand::SetParameters { id, params } => self.set_parameters(&id, &params)?,
            SchedulerCommand::Disturb(angle) => self.apply_disturbance(angle)?,
        }
        Ok(())
    }

    /// Apply every queued command in arrival order. A rejected command is
    /// logged and skipped.
    fn drain_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            if let Err(e) = self.apply_command(command) {
                warn!(error = %e, "queued command rejected");
            }
        }
    }

    /// Run one tick if running.
    ///
    /// Returns `Ok(None)` while idle.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Physics`] when the engine fails; the scheduler is
    /// stopped and needs a `reset` before it is useful again.
    pub fn tick(&mut self) -> Result<Option<TickFrame>, SchedulerError> {
        self.drain_commands();
        if self.phase != Phase::Running {
            return Ok(None);
        }
        match self.advance() {
            Ok(frame) => {
                self.publish(&frame);
                Ok(Some(frame))
            }
            Err(e) => {
                error!(tick = self.tick + 1, error = %e, "physics step failed");
                self.stop();
                Err(e.into())
            }
        }
    }

    #[allow(clippy::float_cmp)]
    fn advance(&mut self) -> Result<TickFrame, PhysicsError> {
        let observed = self.engine.state();
        let command = self.registry.compute_control(&observed);
        let applied_force = command.force + self.manual_force;
        if applied_force != 0.0 {
            self.engine.apply_force(applied_force)?;
        }
        self.engine.step()?;
        self.tick += 1;

        let state = self.engine.state();
        if self.config.log_every > 0 && self.tick % self.config.log_every == 0 {
            info!(
                tick = self.tick,
                cart_position = state.cart_position,
                cart_velocity = state.cart_velocity,
                pole_angle = state.pole_angle,
                pole_angular_velocity = state.pole_angular_velocity,
                force = applied_force,
                controller = command.source_id.as_deref().unwrap_or("-"),
                "simulation progress"
            );
        }
        Ok(TickFrame {
            tick: self.tick,
            observed,
            state,
            command,
            applied_force,
            poses: self.engine.poses(),
        })
    }

    fn publish(&mut self, frame: &TickFrame) {
        self.subscribers.retain(|tx| match tx.try_send(frame.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!(tick = frame.tick, "subscriber lagging, frame dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("subscriber gone");
                false
            }
        });
        self.last_frame = Some(frame.clone());
    }

    /// Run up to `ticks` ticks back to back, stopping early when the
    /// scheduler goes idle. Returns the number of ticks run.
    ///
    /// # Errors
    ///
    /// See [`Self::tick`].
    pub fn run_ticks(&mut self, ticks: u64) -> Result<u64, SchedulerError> {
        let mut ran = 0;
        while ran < ticks {
            if self.tick()?.is_none() {
                break;
            }
            ran += 1;
        }
        Ok(ran)
    }

    /// Tick at the configured wall-clock rate until `shutdown` is raised or
    /// `max_ticks` ticks have run. While idle the loop keeps polling for
    /// commands at the same rate.
    ///
    /// # Errors
    ///
    /// See [`Self::tick`].
    pub fn run_realtime(&mut self, max_ticks: Option<u64>, shutdown: &AtomicBool) -> Result<u64, SchedulerError> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.tick_rate_hz.max(1.0));
        info!(rate_hz = self.config.tick_rate_hz, ?max_ticks, "realtime loop started");

        let mut ran = 0;
        while !shutdown.load(Ordering::Relaxed) && max_ticks.map_or(true, |max| ran < max) {
            let frame_start = Instant::now();
            if self.tick()?.is_some() {
                ran += 1;
            }

            // Frame rate limiting
            let frame_time = frame_start.elapsed();
            if frame_time < frame_duration {
                std::thread::sleep(frame_duration - frame_time);
            }
        }
        info!(ticks = ran, "realtime loop finished");
        Ok(ran)
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    #[must_use]
    pub fn manual_force(&self) -> f64 {
        self.manual_force
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn state(&self) -> BodyState {
        self.engine.state()
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<&TickFrame> {
        self.last_frame.as_ref()
    }

    #[must_use]
    pub fn engine(&self) -> &CartPoleEngine {
        &self.engine
    }

    #[must_use]
    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Stop and release the engine.
    pub fn shutdown(mut self) {
        self.stop();
        info!(ticks = self.tick, "scheduler shut down");
        self.engine.cleanup();
    }
}
