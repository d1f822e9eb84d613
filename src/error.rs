//! Error taxonomy for control-plane synchronization.
//!
//! Every failure that crosses a component boundary is reduced to one of four
//! kinds so callers (startup/shutdown logic, the reload worker) can decide
//! what to do without inspecting transport internals.

use thiserror::Error;

/// Coarse classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Auth,
    Decode,
    State,
}

impl ErrorKind {
    /// Stable lowercase label, used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Auth => "auth",
            ErrorKind::Decode => "decode",
            ErrorKind::State => "state",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while talking to the management plane or driving node state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Management plane unreachable, transport failure or non-OK status.
    #[error("connection error: {0}")]
    Connection(String),

    /// Missing or untrusted client certificate, or rejected node secret.
    #[error("auth error: {0}")]
    Auth(String),

    /// Malformed envelope or a `Message` with the wrong shape for the call.
    #[error("decode error: {0}")]
    Decode(String),

    /// Operation invoked in an invalid node registration state.
    #[error("state error: {0}")]
    State(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Connection(_) => ErrorKind::Connection,
            SyncError::Auth(_) => ErrorKind::Auth,
            SyncError::Decode(_) => ErrorKind::Decode,
            SyncError::State(_) => ErrorKind::State,
        }
    }
}

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;
