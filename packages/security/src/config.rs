//! Security settings
//!
//! Loaded from JSON; every field has a default so a config file only needs
//! to carry the secret key and whatever it overrides.

use crate::error::{Result, SecurityError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use warrant_token::{DEFAULT_ALGORITHM, DEFAULT_TIMESTAMP_FORMAT};

/// Purposes every manager configures, whether or not they are listed.
pub const PURPOSES: [&str; 6] = [
    "default",
    "passwordless",
    "send_confirm",
    "send_reset",
    "signed",
    "leased_token",
];

/// Purpose used when a lookup names an unknown purpose.
pub const DEFAULT_PURPOSE: &str = "default";

/// Purpose behind leased anti-replay tokens.
pub const LEASED_PURPOSE: &str = "leased_token";

const DEFAULT_DURATIONS: [(&str, &str); 6] = [
    ("leased_token", "5m"),
    ("passwordless", "12h"),
    ("send_confirm", "60h"),
    ("send_reset", "60h"),
    ("reset", "60h"),
    ("change", "60h"),
];

/// Salt mixed into the secret of `purpose` when none is configured.
#[must_use]
pub fn default_salt(purpose: &str) -> String {
    match purpose {
        "default" => "default-salt".to_string(),
        "passwordless" => "login-salt".to_string(),
        "send_confirm" => "confirm-salt".to_string(),
        "send_reset" => "reset-salt".to_string(),
        "signed" => "signed-salt".to_string(),
        "leased_token" => "leased-salt".to_string(),
        other => format!("{other}-salt"),
    }
}

/// Top-level security settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Application secret; every purpose key is derived from it.
    pub secret_key: String,
    /// Signing method for compact tokens.
    #[serde(default = "default_signing_method")]
    pub signing_method: String,
    /// Layout for time-bound claims and rendered expirations.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    /// Hash behind the duration-windowed signers.
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
    /// Per-purpose overrides.
    #[serde(default)]
    pub signatories: BTreeMap<String, SignatoryConfig>,
    /// Named durations, e.g. `"send_reset": "60h"`.
    #[serde(default)]
    pub durations: BTreeMap<String, String>,
}

/// Overrides for one purpose.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatoryConfig {
    /// Signing method, instead of [`SecurityConfig::signing_method`].
    pub algorithm: Option<String>,
    /// Secret used as-is, instead of `secret_key || salt`.
    pub secret: Option<String>,
    /// Salt appended to the application secret.
    pub salt: Option<String>,
    /// Timestamp layout, instead of [`SecurityConfig::timestamp_format`].
    pub timestamp_format: Option<String>,
    /// AES key (16, 24 or 32 bytes) wrapping every compact token.
    pub encryption_key: Option<String>,
    /// Token lifetime for this purpose.
    pub duration: Option<String>,
    /// Inject a random nonce claim.
    pub nonce: Option<bool>,
}

fn default_signing_method() -> String {
    DEFAULT_ALGORITHM.to_string()
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

fn default_hash_algorithm() -> String {
    "sha256".to_string()
}

impl SecurityConfig {
    /// Settings with defaults everywhere except the secret.
    #[must_use]
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            signing_method: default_signing_method(),
            timestamp_format: default_timestamp_format(),
            hash_algorithm: default_hash_algorithm(),
            signatories: BTreeMap::new(),
            durations: BTreeMap::new(),
        }
    }

    /// Parse and validate JSON settings.
    ///
    /// # Errors
    /// Returns [`SecurityError::ConfigParse`] for malformed JSON and
    /// [`SecurityError::Config`] if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON settings file.
    ///
    /// # Errors
    /// Returns [`SecurityError::ConfigRead`] if the file cannot be read, then
    /// as [`SecurityConfig::from_json_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SecurityError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading security configuration");
        Self::from_json_str(&json)
    }

    /// Reject settings no manager could be built from.
    ///
    /// # Errors
    /// Returns [`SecurityError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            return Err(SecurityError::config("secret_key must not be empty"));
        }
        for (purpose, signatory) in &self.signatories {
            if let Some(secret) = &signatory.secret {
                if secret.is_empty() {
                    return Err(SecurityError::config(format!(
                        "signatories.{purpose}.secret must not be empty"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Override or add one purpose.
    #[must_use]
    pub fn with_signatory(mut self, purpose: impl Into<String>, config: SignatoryConfig) -> Self {
        self.signatories.insert(purpose.into(), config);
        self
    }

    /// Set a named duration.
    #[must_use]
    pub fn with_duration(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.durations.insert(key.into(), value.into());
        self
    }

    /// Overrides for `purpose`, if any.
    #[must_use]
    pub fn signatory(&self, purpose: &str) -> Option<&SignatoryConfig> {
        self.signatories.get(purpose)
    }

    /// Every purpose to configure: the built-in ones plus any listed.
    #[must_use]
    pub fn purposes(&self) -> Vec<String> {
        let mut purposes: Vec<String> = PURPOSES.iter().map(|p| (*p).to_string()).collect();
        for purpose in self.signatories.keys() {
            if !purposes.contains(purpose) {
                purposes.push(purpose.clone());
            }
        }
        purposes
    }

    /// Salt for `purpose`.
    #[must_use]
    pub fn salt(&self, purpose: &str) -> String {
        self.signatory(purpose)
            .and_then(|s| s.salt.clone())
            .unwrap_or_else(|| default_salt(purpose))
    }

    /// Every named duration as a string, built-in defaults first, then the
    /// `durations` table, then per-purpose overrides.
    #[must_use]
    pub fn duration_settings(&self) -> BTreeMap<String, String> {
        let mut settings: BTreeMap<String, String> = DEFAULT_DURATIONS
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        settings.extend(self.durations.iter().map(|(k, v)| (k.clone(), v.clone())));
        for (purpose, signatory) in &self.signatories {
            if let Some(duration) = &signatory.duration {
                settings.insert(purpose.clone(), duration.clone());
            }
        }
        settings
    }
}
