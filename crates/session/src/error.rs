use thiserror::Error;

use crate::packet::PacketError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported url scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("not connected")]
    NotConnected,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed `{event}` payload: {reason}")]
    Protocol { event: String, reason: String },
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
