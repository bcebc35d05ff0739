//! # Warrant Cipher
//!
//! Symmetric wrapping for signed tokens.
//!
//! A signatory configured with an encryption key hides its claims by
//! encrypting the whole compact token with AES in CFB mode. The random IV is
//! prepended to the ciphertext and the result is base64url encoded.

#![forbid(unsafe_code)]

pub mod error;
pub mod symmetric;

pub use error::{CipherError, Result};
pub use symmetric::{SymmetricKey, BLOCK_SIZE};
