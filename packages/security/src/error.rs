//! Security layer error types

use std::path::PathBuf;
use thiserror::Error;
use warrant_token::{TokenError, PUBLIC_INVALID_TOKEN};

/// Security operation result type
pub type Result<T> = std::result::Result<T, SecurityError>;

/// Security layer error types
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Token engine error
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Duration string does not follow the `1h30m` notation
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// Configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read
    #[error("Failed to read configuration {path}: {source}")]
    ConfigRead {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration could not be deserialized
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Duration-windowed token failed verification
    #[error("token signature, format or age is invalid")]
    InvalidToken,

    /// Token verified but names no known user
    #[error("token does not resolve to a user")]
    UnknownUser,
}

impl SecurityError {
    /// Generic message safe to return to an untrusted caller.
    #[inline]
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        PUBLIC_INVALID_TOKEN
    }

    /// Create a configuration error
    #[inline]
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        SecurityError::Config(msg.into())
    }
}
