//! Error types for revive operations.
//!
//! This module defines [`ReviveError`], the error type used below the retry
//! controller, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `ReviveError` for failures that callers need to tell apart
//! - Use `anyhow::Error` (via `ReviveError::Other`) for unexpected errors
//! - The retry controller never lets these escape a run; it folds them into
//!   a [`RunOutcome`](crate::runner::RunOutcome)

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for revive operations.
#[derive(Debug, Error)]
pub enum ReviveError {
    /// The script (or an installer binary) could not be started at all.
    #[error("Cannot launch {target}: {message}")]
    Launch { target: String, message: String },

    /// An explicitly named configuration file does not exist.
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReviveError {
    /// Build a launch error for `target`.
    pub fn launch(target: impl Into<String>, message: impl Into<String>) -> Self {
        ReviveError::Launch {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for revive operations.
pub type Result<T> = std::result::Result<T, ReviveError>;
