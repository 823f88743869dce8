//! Error types for normdraft.
//!
//! Library crates use [`DraftError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all normdraft operations.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// No completion-service credential is available.
    #[error("missing credential: {message}")]
    MissingCredential { message: String },

    /// A source document could not be turned into text.
    #[error("could not read {source_label}: {message}")]
    Load {
        source_label: String,
        message: String,
    },

    /// Completion-service fault (network, auth, rate limit, model error).
    #[error("completion service error: {0}")]
    Service(String),

    /// Model output did not have the structure we asked for.
    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DraftError>;

impl DraftError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a missing-credential error.
    pub fn missing_credential(msg: impl Into<String>) -> Self {
        Self::MissingCredential {
            message: msg.into(),
        }
    }

    /// Create a load error for the named source.
    pub fn load(source_label: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Load {
            source_label: source_label.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
