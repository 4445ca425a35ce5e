//! Session error types

use std::path::PathBuf;

use thiserror::Error;

use super::SessionState;

/// Errors returned by session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The requested lifecycle step is not legal from the current state
    #[error("Illegal session transition: {from} -> {to}")]
    IllegalTransition { from: SessionState, to: SessionState },

    /// Loading failed; the session is now in the ERROR state
    #[error("Failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    /// The operation needs a loaded file
    #[error("No audio loaded (state: {0})")]
    NoAudioLoaded(SessionState),

    /// The operation is only available while stopped or paused
    #[error("{operation} not available while {state}")]
    NotAvailable {
        operation: &'static str,
        state: SessionState,
    },
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
