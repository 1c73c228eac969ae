use control::ControlError;
use physics::PhysicsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("physics failure, scheduler stopped")]
    Physics(#[from] PhysicsError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("manual force must be finite, got {0}")]
    InvalidForce(f64),
    #[error("scheduler is gone")]
    Disconnected,
}
