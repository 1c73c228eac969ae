//! Cross-thread access to a running [`crate::Scheduler`].
//!
//! UI and network threads never touch the engine or registry directly. They
//! queue [`SchedulerCommand`]s that the scheduler drains at the start of its
//! next tick, so a change lands between ticks and never inside one.

use crossbeam_channel::Sender;
use serde_json::Value;

use crate::error::SchedulerError;

#[derive(Clone, Debug, PartialEq)]
pub enum SchedulerCommand {
    Start,
    Stop,
    Reset,
    ManualForce(f64),
    EnableController { id: String, enabled: bool },
    SetParameters { id: String, params: Value },
    Disturb(f64),
}

/// Cloneable sender side of a scheduler's command queue.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    pub(crate) tx: Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Queue a raw command.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Disconnected`] once the scheduler has been dropped.
    pub fn send(&self, command: SchedulerCommand) -> Result<(), SchedulerError> {
        self.tx.send(command).map_err(|_| SchedulerError::Disconnected)
    }

    /// # Errors
    ///
    /// See [`Self::send`].
    pub fn start(&self) -> Result<(), SchedulerError> {
        self.send(SchedulerCommand::Start)
    }

    /// # Errors
    ///
    /// See [`Self::send`].
    pub fn stop(&self) -> Result<(), SchedulerError> {
        self.send(SchedulerCommand::Stop)
    }

    /// # Errors
    ///
    /// See [`Self::send`].
    pub fn reset(&self) -> Result<(), SchedulerError> {
        self.send(SchedulerCommand::Reset)
    }

    /// # Errors
    ///
    /// [`SchedulerError::InvalidForce`] for a non-finite force, otherwise see
    /// [`Self::send`].
    pub fn apply_manual_force(&self, force: f64) -> Result<(), SchedulerError> {
        if !force.is_finite() {
            return Err(SchedulerError::InvalidForce(force));
        }
        self.send(SchedulerCommand::ManualForce(force))
    }

    /// # Errors
    ///
    /// See [`Self::send`].
    pub fn enable_controller(&self, id: impl Into<String>, enabled: bool) -> Result<(), SchedulerError> {
        self.send(SchedulerCommand::EnableController {
            id: id.into(),
            enabled,
        })
    }

    /// # Errors
    ///
    /// See [`Self::send`].
    pub fn set_parameters(&self, id: impl Into<String>, params: Value) -> Result<(), SchedulerError> {
        self.send(SchedulerCommand::SetParameters { id: id.into(), params })
    }

    /// # Errors
    ///
    /// See [`Self::send`].
    pub fn apply_disturbance(&self, angle: f64) -> Result<(), SchedulerError> {
        self.send(SchedulerCommand::Disturb(angle))
    }
}
