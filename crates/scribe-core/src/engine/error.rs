//! Audio engine error types

use thiserror::Error;

/// Errors reported by an audio engine adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The file could not be opened or decoded
    #[error("Failed to load audio '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    /// The container or codec is not supported by the backend
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// A handle was released or never issued by this engine
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Any other native backend failure
    #[error("Audio backend error: {0}")]
    Backend(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
