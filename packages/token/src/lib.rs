//! Compact signed claim tokens
//!
//! This crate provides:
//! - A registry of named signing methods (HMAC over SHA-256/384/512)
//! - The three-segment compact codec and its composable validation flags
//! - Typed claim sets with string-valued system claims
//! - [`Signatory`], the per-purpose unit that issues and validates tokens,
//!   optionally wrapping them in AES-CFB
//!
//! ```no_run
//! use std::sync::Arc;
//! use warrant_token::{ClaimSet, MethodRegistry, Signatory};
//!
//! # fn main() -> warrant_token::TokenResult<()> {
//! let registry = Arc::new(MethodRegistry::with_defaults());
//! let reset = Signatory::builder("send_reset").secret("k").build(registry)?;
//!
//! let token = reset.signed_string(&ClaimSet::from_pairs(["ut:user-42"]))?;
//! let parsed = reset.valid(token.as_str())?;
//! assert_eq!(parsed.claims().get("ut"), Some("user-42"));
//! # Ok(())
//! # }
//! ```

pub mod algorithms;
pub mod claims;
pub mod error;
pub mod signatory;
pub mod timestamp;
pub mod token;

pub use algorithms::{HashAlgorithm, HmacMethod, MethodConstructor, MethodRegistry, SigningMethod};
pub use claims::{ClaimSet, Claims};
pub use error::{
    TokenError, TokenResult, ValidationError, ValidationFlags, ValidationResult,
    PUBLIC_INVALID_TOKEN,
};
pub use signatory::{Signatory, SignatoryBuilder, DEFAULT_ALGORITHM};
pub use timestamp::{parse_timestamp, TimestampFormat, DEFAULT_TIMESTAMP_FORMAT};
pub use token::{parse, Header, ParsedToken, SignedToken, UnsignedToken, TOKEN_TYPE};
