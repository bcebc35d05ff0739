//! Token error types

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use thiserror::Error;
use warrant_cipher::CipherError;

/// Token operation result type
pub type TokenResult<T> = Result<T, TokenError>;

/// Message shown to remote callers for every token failure.
pub const PUBLIC_INVALID_TOKEN: &str = "invalid token";

/// Token error types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Hash algorithm behind a signing method cannot be instantiated
    #[error("Hash unavailable: {0}")]
    HashUnavailable(String),

    /// Key is not usable by the signing method
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Signature does not match the signing string
    #[error("signature is invalid")]
    SignatureInvalid,

    /// Algorithm name is not registered
    #[error("Unknown signing method: {0}")]
    UnknownAlgorithm(String),

    /// Timestamp layout contains an unsupported specifier
    #[error("Invalid timestamp format: {0}")]
    InvalidTimestampFormat(String),

    /// Key resolver refused to hand out a key for this token
    #[error("Key resolution failed: {0}")]
    KeyResolution(String),

    /// Header or claims could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Symmetric wrapping failed
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Token parsed but failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl TokenError {
    /// Generic message safe to return to an untrusted caller.
    #[inline]
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        PUBLIC_INVALID_TOKEN
    }

    /// Validation classification, if this is a validation failure.
    #[must_use]
    pub fn validation_flags(&self) -> Option<ValidationFlags> {
        match self {
            TokenError::Validation(err) => Some(err.flags),
            _ => None,
        }
    }

    /// Create a serialization error
    #[inline]
    #[must_use]
    pub fn serialization(msg: &str) -> Self {
        TokenError::Serialization(msg.to_string())
    }
}

/// Composable classification of a token validation failure.
///
/// Flags are not mutually exclusive: a token can be expired and forged at the
/// same time, and both bits are reported.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ValidationFlags(u32);

impl ValidationFlags {
    /// Structural decode failure; no further checks were run
    pub const MALFORMED: Self = Self(1 << 0);
    /// Unknown or missing algorithm, or key resolution failed
    pub const UNVERIFIABLE: Self = Self(1 << 1);
    /// Signature does not verify
    pub const SIGNATURE_INVALID: Self = Self(1 << 2);
    /// `exp` claim is in the past
    pub const EXPIRED: Self = Self(1 << 3);
    /// `nbf` claim is in the future
    pub const NOT_VALID_YET: Self = Self(1 << 4);

    const NAMES: [(Self, &'static str); 5] = [
        (Self::MALFORMED, "MALFORMED"),
        (Self::UNVERIFIABLE, "UNVERIFIABLE"),
        (Self::SIGNATURE_INVALID, "SIGNATURE_INVALID"),
        (Self::EXPIRED, "EXPIRED"),
        (Self::NOT_VALID_YET, "NOT_VALID_YET"),
    ];

    /// No flags set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when no flag is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every flag in `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set every flag in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for ValidationFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ValidationFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Debug for ValidationFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("ValidationFlags(empty)");
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "ValidationFlags({})", names.join(" | "))
    }
}

/// Validation failure: the classification bitset plus a human readable detail.
///
/// The detail is meant for logs and tests. Use
/// [`ValidationError::public_message`] for anything sent to a remote caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    /// Accumulated classification.
    pub flags: ValidationFlags,
    /// Detail of every check that failed, in evaluation order.
    pub message: String,
}

impl ValidationError {
    /// Single-cause validation error.
    #[must_use]
    pub fn new(flags: ValidationFlags, message: impl Into<String>) -> Self {
        Self {
            flags,
            message: message.into(),
        }
    }

    /// Structural decode failure.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ValidationFlags::MALFORMED, message)
    }

    /// Unverifiable token.
    #[must_use]
    pub fn unverifiable(message: impl Into<String>) -> Self {
        Self::new(ValidationFlags::UNVERIFIABLE, message)
    }

    /// True when at least one flag in `flags` is set. Unlike
    /// [`ValidationFlags::contains`], a partial match is enough.
    #[must_use]
    pub fn has_any(&self, flags: ValidationFlags) -> bool {
        self.flags.bits() & flags.bits() != 0
    }

    /// Generic message safe to return to an untrusted caller.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        PUBLIC_INVALID_TOKEN
    }
}

/// Outcome of the time and signature checks on a parsed token.
pub type ValidationResult = Result<(), ValidationError>;

/// Accumulates non-fatal validation failures.
#[derive(Debug, Default)]
pub(crate) struct ValidationErrors {
    flags: ValidationFlags,
    messages: Vec<String>,
}

impl ValidationErrors {
    pub(crate) fn push(&mut self, flag: ValidationFlags, message: impl Into<String>) {
        self.flags |= flag;
        self.messages.push(message.into());
    }

    pub(crate) fn finish(self) -> ValidationResult {
        if self.flags.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.flags, self.messages.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_compose() {
        let mut flags = ValidationFlags::EXPIRED;
        flags |= ValidationFlags::SIGNATURE_INVALID;
        assert!(flags.contains(ValidationFlags::EXPIRED));
        assert!(flags.contains(ValidationFlags::SIGNATURE_INVALID));
        assert!(!flags.contains(ValidationFlags::MALFORMED));
        assert!(flags.contains(ValidationFlags::EXPIRED | ValidationFlags::SIGNATURE_INVALID));
        assert_eq!(
            format!("{flags:?}"),
            "ValidationFlags(SIGNATURE_INVALID | EXPIRED)"
        );
    }

    #[test]
    fn test_accumulator_joins_messages() {
        let mut errs = ValidationErrors::default();
        assert!(ValidationErrors::default().finish().is_ok());

        errs.push(ValidationFlags::EXPIRED, "token is expired");
        errs.push(ValidationFlags::SIGNATURE_INVALID, "signature is invalid");
        let err = errs.finish().unwrap_err();
        assert_eq!(err.message, "token is expired; signature is invalid");
        assert!(err.has_any(ValidationFlags::EXPIRED));
        assert!(err.has_any(ValidationFlags::EXPIRED | ValidationFlags::MALFORMED));
        assert!(!err.has_any(ValidationFlags::MALFORMED | ValidationFlags::NOT_VALID_YET));
        assert!(!err.flags.contains(ValidationFlags::EXPIRED | ValidationFlags::MALFORMED));
        assert_eq!(err.public_message(), "invalid token");
    }

    #[test]
    fn test_token_error_exposes_flags() {
        let err: TokenError = ValidationError::malformed("bad").into();
        assert_eq!(err.validation_flags(), Some(ValidationFlags::MALFORMED));
        assert_eq!(TokenError::SignatureInvalid.validation_flags(), None);
        assert_eq!(err.public_message(), PUBLIC_INVALID_TOKEN);
    }
}
