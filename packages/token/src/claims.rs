//! Token claims
//!
//! [`ClaimSet`] is what callers hand to a signatory: a few typed, named
//! fields plus an escape hatch for extra string claims. [`Claims`] is the
//! flat map that is actually serialized into, and parsed out of, a token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Registered claim names.
pub mod names {
    /// Issue time.
    pub const ISSUED_AT: &str = "iat";
    /// Expiry time.
    pub const EXPIRES: &str = "exp";
    /// Not-before time.
    pub const NOT_BEFORE: &str = "nbf";
    /// Subject.
    pub const SUBJECT: &str = "sub";
    /// Purpose tag of the signatory that issued the token.
    pub const PURPOSE: &str = "purpose";
    /// Random per-token value.
    pub const NONCE: &str = "nonce";
    /// Layout used for the time-bound claims.
    pub const TIMESTAMP_FORMAT: &str = "timestamp_format";

    /// Claims a signatory injects itself; callers cannot override them.
    pub const SYSTEM: [&str; 6] = [
        ISSUED_AT,
        EXPIRES,
        NOT_BEFORE,
        PURPOSE,
        NONCE,
        TIMESTAMP_FORMAT,
    ];
}

/// Caller-supplied claims for one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    pub(crate) subject: Option<String>,
    pub(crate) expires_at: Option<DateTime<Utc>>,
    pub(crate) not_before: Option<DateTime<Utc>>,
    pub(crate) extra: BTreeMap<String, String>,
}

impl ClaimSet {
    /// Empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim set from `"key:value"` items.
    ///
    /// Items that do not contain exactly one `:` are dropped silently.
    #[must_use]
    pub fn from_pairs<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        items
            .into_iter()
            .fold(Self::new(), |set, item| set.pair(item.as_ref()))
    }

    /// Add one `"key:value"` item, following the same drop rule as
    /// [`ClaimSet::from_pairs`].
    #[must_use]
    pub fn pair(self, item: &str) -> Self {
        let mut parts = item.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => self.extra(key, value),
            _ => self,
        }
    }

    /// Add an extra string claim.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Set the subject (`sub`) claim.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the expiry (`exp`) claim.
    #[must_use]
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Set the not-before (`nbf`) claim.
    #[must_use]
    pub fn not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = Some(at);
        self
    }

    /// Number of extra claims.
    #[must_use]
    pub fn extra_len(&self) -> usize {
        self.extra.len()
    }
}

/// Flat claim map carried by a token.
///
/// Values written by this crate are always strings. Parsed tokens may carry
/// other JSON values; [`Claims::get`] only exposes string values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims {
    entries: BTreeMap<String, Value>,
}

impl Claims {
    /// Empty claim map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// String value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    /// Raw JSON value of `key`.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// True when `key` is present with any value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no claim is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over string-valued claims.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
    }

    /// Insert a string claim, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), Value::String(value.into()));
    }
}
