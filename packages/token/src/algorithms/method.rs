//! Signing method interface

use crate::error::TokenResult;
use std::fmt;

/// Signing algorithm interface.
///
/// Implementations are stateless and must be thread-safe (Send + Sync); one
/// instance is shared by every signatory using the algorithm.
pub trait SigningMethod: Send + Sync + fmt::Debug + 'static {
    /// Header `alg` value.
    fn alg(&self) -> &'static str;

    /// Sign `signing_string` with `key`, returning the base64url signature
    /// without padding.
    ///
    /// # Errors
    /// Returns `TokenError::InvalidKey` or `TokenError::HashUnavailable` when
    /// the method cannot produce a signature.
    fn sign(&self, signing_string: &str, key: &[u8]) -> TokenResult<String>;

    /// Verify a base64url `signature` over `signing_string`.
    ///
    /// # Errors
    /// Returns `TokenError::SignatureInvalid` for any mismatch, including a
    /// signature that does not decode.
    fn verify(&self, signing_string: &str, signature: &str, key: &[u8]) -> TokenResult<()>;
}
