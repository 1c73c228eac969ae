use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("body `{label}` reached a non-finite state")]
    NonFiniteState { label: &'static str },
    #[error("force must be finite, got {0}")]
    InvalidForce(f64),
    #[error("pole angle must be finite, got {0}")]
    InvalidAngle(f64),
    #[error("unknown body handle {0}")]
    UnknownBody(usize),
    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),
}
