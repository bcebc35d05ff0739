//! Account-security token layer
//!
//! This crate provides:
//! - [`SecurityConfig`]: JSON settings with per-purpose overrides and named durations
//! - [`Manager`]: one compact-token [`warrant_token::Signatory`] and one
//!   duration-windowed [`TimeSigner`] per purpose, with `default` fallback
//! - Packed user tokens and leased anti-replay tokens
//! - [`Times`]: named durations and the expiry instants derived from them

pub mod config;
pub mod error;
pub mod manager;
pub mod signer;
pub mod times;

pub use config::{default_salt, SecurityConfig, SignatoryConfig, DEFAULT_PURPOSE, LEASED_PURPOSE, PURPOSES};
pub use error::{Result, SecurityError};
pub use manager::{pack_signable, unpack_signable, Manager, UserLookup};
pub use signer::{Base64Signer, TimeSigner, EPOCH, SEPARATOR};
pub use times::{parse_duration, Times, DEFAULT_DURATION};
