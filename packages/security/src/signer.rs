//! Duration-windowed signer
//!
//! A much simpler format than the compact claim token, used for packed
//! purpose tokens and leased anti-replay tokens:
//!
//! - base form: `payload "." base64url(HMAC(secret, payload))`
//! - timed form: the base form over `payload "." base64url(elapsed)`, where
//!   `elapsed` is the issue time in seconds since [`EPOCH`], written as
//!   minimal big-endian bytes
//!
//! Verification always splits on the last separator, so the payload itself
//! may contain separators.

use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use subtle::ConstantTimeEq;
use warrant_common::{decode_segment, encode_segment, SharedClock, SystemClock};
use warrant_token::HashAlgorithm;
use zeroize::Zeroizing;

/// Custom epoch (2011-01-01T00:00:00Z) that keeps encoded timestamps short.
pub const EPOCH: i64 = 1_293_840_000;

/// Separator between payload, timestamp and signature.
pub const SEPARATOR: char = '.';

/// Keyed-hash signer without a time component.
#[derive(Clone)]
pub struct Base64Signer {
    hash: HashAlgorithm,
    secret: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for Base64Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Base64Signer")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

impl Base64Signer {
    /// Signer keyed with `secret`.
    #[must_use]
    pub fn new(hash: HashAlgorithm, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            hash,
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// Signer keyed with `key || salt`.
    #[must_use]
    pub fn salted(hash: HashAlgorithm, key: &[u8], salt: &[u8]) -> Self {
        let mut secret = Vec::with_capacity(key.len() + salt.len());
        secret.extend_from_slice(key);
        secret.extend_from_slice(salt);
        Self::new(hash, secret)
    }

    /// Hash behind the MAC.
    #[must_use]
    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    fn signature(&self, payload: &str) -> Result<String> {
        let digest = self.hash.mac(&self.secret, payload.as_bytes())?;
        Ok(encode_segment(&digest))
    }

    /// `payload "." signature`.
    ///
    /// # Errors
    /// Propagates a MAC construction failure.
    pub fn sign(&self, payload: &str) -> Result<String> {
        let signature = self.signature(payload)?;
        Ok(format!("{payload}{SEPARATOR}{signature}"))
    }

    /// Payload of `blob` if its signature matches.
    #[must_use]
    pub fn verify<'a>(&self, blob: &'a str) -> Option<&'a str> {
        let (payload, presented) = blob.rsplit_once(SEPARATOR)?;
        let expected = self.signature(payload).ok()?;
        bool::from(expected.as_bytes().ct_eq(presented.as_bytes())).then_some(payload)
    }
}

/// Signer that also stamps the issue time and enforces a maximum age.
#[derive(Debug, Clone)]
pub struct TimeSigner {
    base: Base64Signer,
    clock: SharedClock,
}

impl TimeSigner {
    /// Timed signer over `base`, reading time from the wall clock.
    #[must_use]
    pub fn new(base: Base64Signer) -> Self {
        Self::with_clock(base, SystemClock::shared())
    }

    /// Timed signer over `base`, reading time from `clock`.
    #[must_use]
    pub fn with_clock(base: Base64Signer, clock: SharedClock) -> Self {
        Self { base, clock }
    }

    /// Underlying signer.
    #[must_use]
    pub fn base(&self) -> &Base64Signer {
        &self.base
    }

    /// Sign `payload`, stamped with the current time.
    ///
    /// # Errors
    /// Propagates a MAC construction failure.
    pub fn sign(&self, payload: &str) -> Result<String> {
        self.sign_at(payload, self.clock.now())
    }

    /// Sign `payload`, stamped with `now`.
    ///
    /// # Errors
    /// Propagates a MAC construction failure.
    pub fn sign_at(&self, payload: &str, now: DateTime<Utc>) -> Result<String> {
        let stamped = format!("{payload}{SEPARATOR}{}", encode_time(now.timestamp()));
        self.base.sign(&stamped)
    }

    /// Payload of `blob` if its signature matches and it is at most
    /// `max_age` old.
    #[must_use]
    pub fn verify<'a>(&self, blob: &'a str, max_age: Duration) -> Option<&'a str> {
        self.verify_at(blob, max_age, self.clock.now())
    }

    /// Payload of `blob` if its signature matches and it is at most
    /// `max_age` old as of `now`.
    #[must_use]
    pub fn verify_at<'a>(
        &self,
        blob: &'a str,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Option<&'a str> {
        let stamped = self.base.verify(blob)?;
        let (payload, encoded) = stamped.rsplit_once(SEPARATOR)?;
        let issued = DateTime::from_timestamp(decode_time(encoded)?, 0)?;
        (now - issued <= max_age).then_some(payload)
    }
}

fn encode_time(unix: i64) -> String {
    let elapsed = u64::try_from(unix.saturating_sub(EPOCH)).unwrap_or(0);
    let bytes = elapsed.to_be_bytes();
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    encode_segment(&bytes[first..])
}

fn decode_time(encoded: &str) -> Option<i64> {
    let bytes = decode_segment(encoded).ok()?;
    if bytes.len() > 8 {
        return None;
    }
    let elapsed = bytes
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    i64::try_from(elapsed).ok()?.checked_add(EPOCH)
}
