use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("controller `{0}` is already registered")]
    DuplicateController(String),
    #[error("no controller registered as `{0}`")]
    UnknownController(String),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("malformed parameter document")]
    Malformed(#[from] serde_json::Error),
}
