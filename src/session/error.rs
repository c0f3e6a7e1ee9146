use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the live session controller
#[derive(Debug, Error)]
pub enum LiveError {
    #[error("a call is already in progress")]
    AlreadyActive,

    #[error("no call in progress")]
    NotActive,

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("microphone unavailable: {0:#}")]
    Microphone(anyhow::Error),

    #[error("audio output unavailable: {0:#}")]
    OutputDevice(anyhow::Error),

    #[error("live session handshake failed: {0:#}")]
    Handshake(anyhow::Error),

    #[error("live session handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
}
