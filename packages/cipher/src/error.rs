//! Error handling for the symmetric wrapper

use thiserror::Error;

/// Cipher-specific errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// AES accepts 16, 24 or 32 byte keys only
    #[error("Invalid key length: expected 16, 24 or 32 bytes, got {actual}")]
    InvalidKeyLength {
        /// Actual key length in bytes
        actual: usize,
    },

    /// Ciphertext shorter than one block cannot carry an IV
    #[error("Token too short: expected at least {expected} bytes, got {actual}")]
    TokenLength {
        /// Minimum length in bytes
        expected: usize,
        /// Actual decoded length in bytes
        actual: usize,
    },

    /// Invalid encrypted data provided
    #[error("Invalid encrypted data: {0}")]
    InvalidEncryptedData(String),

    /// Encryption operation failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
}

impl From<base64::DecodeError> for CipherError {
    fn from(err: base64::DecodeError) -> Self {
        CipherError::InvalidEncryptedData(format!("Base64 decode error: {err}"))
    }
}

/// Result type for cipher operations
pub type Result<T> = std::result::Result<T, CipherError>;
