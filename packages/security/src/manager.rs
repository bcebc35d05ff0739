//! Per-purpose token manager
//!
//! Owns one [`Signatory`] and one [`TimeSigner`] per purpose, built once from
//! [`SecurityConfig`] and read-only afterwards. Lookups by an unknown purpose
//! fall back to the `default` purpose.

use crate::config::{SecurityConfig, DEFAULT_PURPOSE, LEASED_PURPOSE};
use crate::error::{Result, SecurityError};
use crate::signer::{Base64Signer, TimeSigner};
use crate::times::Times;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::BTreeMap;
use std::sync::Arc;
use warrant_common::{decode_segment, encode_segment, LoggingTransformer, SharedClock, SystemClock};
use warrant_token::{HashAlgorithm, MethodRegistry, Signatory, TimestampFormat};
use zeroize::Zeroizing;

/// Bytes of randomness in a leased token.
const LEASE_NONCE_LEN: usize = 16;

/// Separator between packed items.
const ITEM_SEPARATOR: &str = ":";

/// Resolves the user named by a token.
pub trait UserLookup {
    /// Resolved user.
    type User;

    /// User with identifier `id`, or `None` for an unknown or anonymous user.
    fn lookup(&self, id: &str) -> Option<Self::User>;
}

#[derive(Debug, Clone)]
struct Purpose {
    signatory: Signatory,
    signer: TimeSigner,
}

/// Purpose name to signatory and duration-windowed signer.
#[derive(Debug)]
pub struct Manager {
    default: Purpose,
    purposes: BTreeMap<String, Purpose>,
    times: Times,
    clock: SharedClock,
}

impl Manager {
    /// Build every purpose from `config`, reading time from the wall clock.
    ///
    /// # Errors
    /// Returns an error for invalid settings, an unregistered algorithm, an
    /// unknown hash, a bad timestamp layout or a bad encryption key.
    pub fn new(config: &SecurityConfig, registry: Arc<MethodRegistry>) -> Result<Self> {
        Self::with_clock(config, registry, SystemClock::shared())
    }

    /// Build every purpose from `config`, reading time from `clock`.
    ///
    /// # Errors
    /// See [`Manager::new`].
    pub fn with_clock(
        config: &SecurityConfig,
        registry: Arc<MethodRegistry>,
        clock: SharedClock,
    ) -> Result<Self> {
        config.validate()?;
        let hash: HashAlgorithm = config.hash_algorithm.parse()?;

        let mut purposes = BTreeMap::new();
        for name in config.purposes() {
            let purpose = build_purpose(config, &name, hash, &registry, &clock)?;
            purposes.insert(name, purpose);
        }
        let default = purposes
            .get(DEFAULT_PURPOSE)
            .cloned()
            .ok_or_else(|| SecurityError::config("default purpose is missing"))?;

        let times = Times::new(
            config.duration_settings(),
            TimestampFormat::new(config.timestamp_format.clone())?,
            Arc::clone(&clock),
        );

        tracing::info!(
            purposes = purposes.len(),
            hash = %hash,
            "security manager configured"
        );

        Ok(Self {
            default,
            purposes,
            times,
            clock,
        })
    }

    fn purpose(&self, name: &str) -> &Purpose {
        self.purposes.get(name).unwrap_or(&self.default)
    }

    /// Signatory for `name`, or the default one.
    #[must_use]
    pub fn signatory(&self, name: &str) -> &Signatory {
        &self.purpose(name).signatory
    }

    /// Duration-windowed signer for `name`, or the default one.
    #[must_use]
    pub fn time_signatory(&self, name: &str) -> &TimeSigner {
        &self.purpose(name).signer
    }

    /// Configured purpose names.
    pub fn purposes(&self) -> impl Iterator<Item = &str> {
        self.purposes.keys().map(String::as_str)
    }

    /// Named durations.
    #[must_use]
    pub fn times(&self) -> &Times {
        &self.times
    }

    /// Sign `items` packed into one payload with the `purpose` signer.
    ///
    /// # Errors
    /// Propagates a MAC construction failure.
    pub fn generate_token<S: AsRef<str>>(&self, purpose: &str, items: &[S]) -> Result<String> {
        self.generate_token_at(purpose, items, self.clock.now())
    }

    /// [`Manager::generate_token`] stamped with `now`.
    ///
    /// # Errors
    /// Propagates a MAC construction failure.
    pub fn generate_token_at<S: AsRef<str>>(
        &self,
        purpose: &str,
        items: &[S],
        now: DateTime<Utc>,
    ) -> Result<String> {
        self.time_signatory(purpose)
            .sign_at(&pack_signable(items), now)
            .inspect_err(|err| LoggingTransformer::log_token_failure("generate", purpose, err))
    }

    /// Items packed into `token` if it verifies within the `purpose` duration.
    ///
    /// # Errors
    /// Returns [`SecurityError::InvalidToken`] for a bad signature, an
    /// expired token or an undecodable payload.
    pub fn valid_token(&self, purpose: &str, token: &str) -> Result<Vec<String>> {
        self.valid_token_at(purpose, token, self.clock.now())
    }

    /// [`Manager::valid_token`] as of `now`.
    ///
    /// # Errors
    /// See [`Manager::valid_token`].
    pub fn valid_token_at(
        &self,
        purpose: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let max_age = self.times.duration(purpose);
        match self.time_signatory(purpose).verify_at(token, max_age, now) {
            Some(packed) => unpack_signable(packed),
            None => {
                LoggingTransformer::log_token_rejected(purpose, token, "signature or age");
                Err(SecurityError::InvalidToken)
            }
        }
    }

    /// User named by `token` and its "remember" flag.
    ///
    /// The first packed item is the user identifier; the second, if it
    /// parses as a boolean, is the remember flag (otherwise `false`).
    ///
    /// # Errors
    /// Returns [`SecurityError::InvalidToken`] as [`Manager::valid_token`]
    /// and [`SecurityError::UnknownUser`] if the identifier does not resolve.
    pub fn valid_user_token<U: UserLookup>(
        &self,
        purpose: &str,
        token: &str,
        users: &U,
    ) -> Result<(U::User, bool)> {
        self.valid_user_token_at(purpose, token, users, self.clock.now())
    }

    /// [`Manager::valid_user_token`] as of `now`.
    ///
    /// # Errors
    /// See [`Manager::valid_user_token`].
    pub fn valid_user_token_at<U: UserLookup>(
        &self,
        purpose: &str,
        token: &str,
        users: &U,
        now: DateTime<Utc>,
    ) -> Result<(U::User, bool)> {
        let items = self.valid_token_at(purpose, token, now)?;
        let id = items.first().ok_or(SecurityError::InvalidToken)?;
        let user = users.lookup(id).ok_or(SecurityError::UnknownUser)?;
        let remember = items
            .get(1)
            .and_then(|flag| parse_bool(flag))
            .unwrap_or(false);
        Ok((user, remember))
    }

    /// Fresh leased token for `name`.
    ///
    /// # Errors
    /// Propagates a MAC construction failure.
    pub fn issue(&self, name: &str) -> Result<String> {
        self.issue_at(name, self.clock.now())
    }

    /// [`Manager::issue`] stamped with `now`.
    ///
    /// # Errors
    /// Propagates a MAC construction failure.
    pub fn issue_at(&self, name: &str, now: DateTime<Utc>) -> Result<String> {
        let mut nonce = [0u8; LEASE_NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);
        self.time_signatory(name)
            .sign_at(&encode_segment(&nonce), now)
            .inspect_err(|err| LoggingTransformer::log_token_failure("issue", name, err))
    }

    /// True if `token` was issued for `name` at most `max_age` ago.
    #[must_use]
    pub fn redeem(&self, name: &str, token: &str, max_age: Duration) -> bool {
        self.redeem_at(name, token, max_age, self.clock.now())
    }

    /// [`Manager::redeem`] as of `now`.
    #[must_use]
    pub fn redeem_at(&self, name: &str, token: &str, max_age: Duration, now: DateTime<Utc>) -> bool {
        let redeemed = self
            .time_signatory(name)
            .verify_at(token, max_age, now)
            .is_some();
        if !redeemed {
            LoggingTransformer::log_token_rejected(name, token, "lease expired or forged");
        }
        redeemed
    }

    /// Fresh token for the `leased_token` purpose.
    ///
    /// # Errors
    /// Propagates a MAC construction failure.
    pub fn leased_token(&self) -> Result<String> {
        self.issue(LEASED_PURPOSE)
    }

    /// True if `token` is a `leased_token` within its configured duration.
    #[must_use]
    pub fn valid_leased_token(&self, token: &str) -> bool {
        self.valid_leased_token_at(token, self.clock.now())
    }

    /// [`Manager::valid_leased_token`] as of `now`.
    #[must_use]
    pub fn valid_leased_token_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.redeem_at(
            LEASED_PURPOSE,
            token,
            self.times.duration(LEASED_PURPOSE),
            now,
        )
    }
}

fn build_purpose(
    config: &SecurityConfig,
    name: &str,
    hash: HashAlgorithm,
    registry: &Arc<MethodRegistry>,
    clock: &SharedClock,
) -> Result<Purpose> {
    let overrides = config.signatory(name).cloned().unwrap_or_default();

    let secret = Zeroizing::new(match overrides.secret {
        Some(secret) => secret.into_bytes(),
        None => [config.secret_key.as_bytes(), config.salt(name).as_bytes()].concat(),
    });

    let mut builder = Signatory::builder(name)
        .algorithm(
            overrides
                .algorithm
                .unwrap_or_else(|| config.signing_method.clone()),
        )
        .secret(secret.to_vec())
        .timestamp_format(
            overrides
                .timestamp_format
                .unwrap_or_else(|| config.timestamp_format.clone()),
        )
        .purpose(name)
        .with_nonce(overrides.nonce.unwrap_or(name == LEASED_PURPOSE))
        .clock(Arc::clone(clock));
    if let Some(key) = overrides.encryption_key {
        builder = builder.encryption_key(key.into_bytes());
    }

    Ok(Purpose {
        signatory: builder.build(Arc::clone(registry))?,
        signer: TimeSigner::with_clock(Base64Signer::new(hash, secret.to_vec()), Arc::clone(clock)),
    })
}

/// Join `items` with `:` and base64url-encode the result.
#[must_use]
pub fn pack_signable<S: AsRef<str>>(items: &[S]) -> String {
    let joined = items
        .iter()
        .map(|item| item.as_ref())
        .collect::<Vec<&str>>()
        .join(ITEM_SEPARATOR);
    encode_segment(joined.as_bytes())
}

/// Reverse of [`pack_signable`].
///
/// # Errors
/// Returns [`SecurityError::InvalidToken`] if `packed` is not base64url text.
pub fn unpack_signable(packed: &str) -> Result<Vec<String>> {
    let bytes = decode_segment(packed).map_err(|_| SecurityError::InvalidToken)?;
    let joined = String::from_utf8(bytes).map_err(|_| SecurityError::InvalidToken)?;
    Ok(joined.split(ITEM_SEPARATOR).map(str::to_string).collect())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
