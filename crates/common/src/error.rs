//! Error types shared across Peekaboo crates.

use std::path::PathBuf;

/// Top-level error type for Peekaboo operations.
#[derive(Debug, thiserror::Error)]
pub enum PeekabooError {
    /// The capture device refused access (webcam permission denied).
    #[error("Capture denied: {message}")]
    CaptureDenied { message: String },

    /// The pose-estimation model could not be initialized.
    #[error("Pose model unavailable: {message}")]
    ModelUnavailable { message: String },

    /// A session lifecycle operation was used in the wrong state.
    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed pose data (e.g. a bad replay line).
    #[error("Pose data error: {message}")]
    Pose { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PeekabooError.
pub type PeekabooResult<T> = Result<T, PeekabooError>;

impl PeekabooError {
    pub fn capture_denied(msg: impl Into<String>) -> Self {
        Self::CaptureDenied {
            message: msg.into(),
        }
    }

    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn pose(msg: impl Into<String>) -> Self {
        Self::Pose {
            message: msg.into(),
        }
    }
}
