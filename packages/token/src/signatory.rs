//! Per-purpose token signatories
//!
//! A [`Signatory`] binds one purpose name to a signing method, a secret, a
//! timestamp layout and, optionally, a symmetric key that wraps every token
//! it issues. Signatories are immutable: rotating the key or algorithm means
//! building a new one.

use crate::algorithms::{MethodRegistry, SigningMethod};
use crate::claims::{names, ClaimSet, Claims};
use crate::error::{TokenError, TokenResult, ValidationError};
use crate::timestamp::TimestampFormat;
use crate::token::{parse, ParsedToken, SignedToken, UnsignedToken};
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use warrant_cipher::SymmetricKey;
use warrant_common::{encode_segment, LoggingTransformer, SharedClock, SystemClock};
use zeroize::Zeroizing;

/// Default signing method name.
pub const DEFAULT_ALGORITHM: &str = "HS256";

/// Bytes of randomness in a nonce claim.
const NONCE_LEN: usize = 16;

/// Signs and validates tokens for one purpose.
#[derive(Clone)]
pub struct Signatory {
    name: String,
    method: Arc<dyn SigningMethod>,
    key: Zeroizing<Vec<u8>>,
    timestamp_format: TimestampFormat,
    cipher: Option<SymmetricKey>,
    purpose: Option<String>,
    nonce: bool,
    registry: Arc<MethodRegistry>,
    clock: SharedClock,
}

impl fmt::Debug for Signatory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signatory")
            .field("name", &self.name)
            .field("alg", &self.method.alg())
            .field("key", &"<redacted>")
            .field("timestamp_format", &self.timestamp_format.as_str())
            .field("encrypted", &self.cipher.is_some())
            .field("purpose", &self.purpose)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

impl Signatory {
    /// Start configuring a signatory called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SignatoryBuilder {
        SignatoryBuilder::new(name)
    }

    /// Purpose name this signatory was configured for.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signing method name.
    #[must_use]
    pub fn alg(&self) -> &'static str {
        self.method.alg()
    }

    /// Layout of the time-bound claims.
    #[must_use]
    pub fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }

    /// True when issued tokens are wrapped in symmetric encryption.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Value of the `purpose` claim, if one is injected.
    #[must_use]
    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }

    /// Current time according to this signatory's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Unsigned token carrying `claims` plus the system claims, issued now.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidTimestampFormat`] if a time claim cannot
    /// be rendered.
    pub fn token(&self, claims: &ClaimSet) -> TokenResult<UnsignedToken> {
        self.token_at(claims, self.now())
    }

    /// Unsigned token carrying `claims` plus the system claims, issued at `now`.
    ///
    /// Caller extras go in first; the typed fields and the system claims are
    /// written after them and replace any extra of the same name.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidTimestampFormat`] if a time claim cannot
    /// be rendered.
    pub fn token_at(&self, claims: &ClaimSet, now: DateTime<Utc>) -> TokenResult<UnsignedToken> {
        let mut map = Claims::new();
        for (key, value) in &claims.extra {
            map.insert(key.as_str(), value.as_str());
        }

        if let Some(subject) = &claims.subject {
            map.insert(names::SUBJECT, subject.as_str());
        }
        if let Some(expires) = claims.expires_at {
            map.insert(names::EXPIRES, self.timestamp_format.format(expires)?);
        }
        if let Some(not_before) = claims.not_before {
            map.insert(names::NOT_BEFORE, self.timestamp_format.format(not_before)?);
        }
        map.insert(names::ISSUED_AT, self.timestamp_format.format(now)?);
        map.insert(names::TIMESTAMP_FORMAT, self.timestamp_format.as_str());
        if let Some(purpose) = &self.purpose {
            map.insert(names::PURPOSE, purpose.as_str());
        }
        if self.nonce {
            map.insert(names::NONCE, generate_nonce());
        }

        Ok(UnsignedToken::with_claims(Arc::clone(&self.method), map))
    }

    /// Signed (and, if configured, encrypted) token for `claims`, issued now.
    ///
    /// # Errors
    /// Propagates claim rendering, signing and encryption errors.
    pub fn signed_string(&self, claims: &ClaimSet) -> TokenResult<SignedToken> {
        self.signed_string_at(claims, self.now())
    }

    /// Signed token built from `"key:value"` items.
    ///
    /// # Errors
    /// Propagates claim rendering, signing and encryption errors.
    pub fn signed_string_from_pairs<I, S>(&self, items: I) -> TokenResult<SignedToken>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.signed_string(&ClaimSet::from_pairs(items))
    }

    /// Signed (and, if configured, encrypted) token for `claims`, issued at `now`.
    ///
    /// # Errors
    /// Propagates claim rendering, signing and encryption errors.
    pub fn signed_string_at(
        &self,
        claims: &ClaimSet,
        now: DateTime<Utc>,
    ) -> TokenResult<SignedToken> {
        self.seal(claims, now)
            .inspect_err(|err| LoggingTransformer::log_token_failure("sign", &self.name, err))
    }

    fn seal(&self, claims: &ClaimSet, now: DateTime<Utc>) -> TokenResult<SignedToken> {
        let signed = self.token_at(claims, now)?.sign(&self.key)?;
        match &self.cipher {
            Some(cipher) => {
                let wrapped = cipher.encrypt(signed.as_str().as_bytes())?;
                Ok(SignedToken::new(wrapped))
            }
            None => Ok(signed),
        }
    }

    /// Decode and check `token` as of now, returning it whatever the outcome.
    ///
    /// # Errors
    /// Returns [`TokenError::Cipher`] if an encrypted token cannot be
    /// decrypted, and a `MALFORMED` validation error if the decrypted bytes
    /// are not text. Every other failure is carried in the returned token.
    pub fn inspect(&self, token: &str) -> TokenResult<ParsedToken> {
        self.inspect_at(token, self.now())
    }

    /// Decode and check `token` as of `now`, returning it whatever the outcome.
    ///
    /// # Errors
    /// See [`Signatory::inspect`].
    pub fn inspect_at(&self, token: &str, now: DateTime<Utc>) -> TokenResult<ParsedToken> {
        let compact = self.unwrap_token(token)?;
        let parsed = parse(
            &compact,
            &self.registry,
            |candidate| match candidate.alg() {
                Some(alg) if alg == self.method.alg() => Ok(self.key.as_slice()),
                other => Err(TokenError::KeyResolution(format!(
                    "{} only verifies {} tokens, got {}",
                    self.name,
                    self.method.alg(),
                    other.unwrap_or("none")
                ))),
            },
            now,
        );
        Ok(parsed)
    }

    /// Validate `token` as of now.
    ///
    /// # Errors
    /// Returns [`TokenError::Validation`] with the accumulated flags if any
    /// check failed, or the decryption error of an unreadable wrapped token.
    pub fn valid(&self, token: &str) -> TokenResult<ParsedToken> {
        self.valid_at(token, self.now())
    }

    /// Validate `token` as of `now`.
    ///
    /// # Errors
    /// See [`Signatory::valid`].
    pub fn valid_at(&self, token: &str, now: DateTime<Utc>) -> TokenResult<ParsedToken> {
        let parsed = match self.inspect_at(token, now) {
            Ok(parsed) => parsed,
            Err(err) => {
                LoggingTransformer::log_token_rejected(&self.name, token, &err.to_string());
                return Err(err);
            }
        };
        if let Err(err) = parsed.validation() {
            LoggingTransformer::log_token_rejected(&self.name, token, &err.message);
            return Err(TokenError::Validation(err.clone()));
        }
        Ok(parsed)
    }

    fn unwrap_token<'a>(&self, token: &'a str) -> TokenResult<Cow<'a, str>> {
        let Some(cipher) = &self.cipher else {
            return Ok(Cow::Borrowed(token));
        };
        let plaintext = cipher.decrypt(token)?;
        let compact = String::from_utf8(plaintext)
            .map_err(|_| ValidationError::malformed("decrypted token is not text"))?;
        Ok(Cow::Owned(compact))
    }
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut bytes);
    encode_segment(&bytes)
}

/// Configuration for a [`Signatory`].
pub struct SignatoryBuilder {
    name: String,
    algorithm: String,
    secret: Zeroizing<Vec<u8>>,
    timestamp_format: Option<String>,
    encryption_key: Option<Zeroizing<Vec<u8>>>,
    purpose: Option<String>,
    nonce: bool,
    clock: Option<SharedClock>,
}

impl fmt::Debug for SignatoryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatoryBuilder")
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("encrypted", &self.encryption_key.is_some())
            .finish_non_exhaustive()
    }
}

impl SignatoryBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            algorithm: DEFAULT_ALGORITHM.to_string(),
            secret: Zeroizing::new(Vec::new()),
            timestamp_format: None,
            encryption_key: None,
            purpose: None,
            nonce: false,
            clock: None,
        }
    }

    /// Signing method name, looked up in the registry at build time.
    #[must_use]
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    /// Signing secret.
    #[must_use]
    pub fn secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.secret = Zeroizing::new(secret.into());
        self
    }

    /// strftime-style layout for the time-bound claims.
    #[must_use]
    pub fn timestamp_format(mut self, layout: impl Into<String>) -> Self {
        self.timestamp_format = Some(layout.into());
        self
    }

    /// AES key (16, 24 or 32 bytes) that wraps every issued token.
    #[must_use]
    pub fn encryption_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.encryption_key = Some(Zeroizing::new(key.into()));
        self
    }

    /// Inject a `purpose` claim into every token.
    #[must_use]
    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    /// Inject a random `nonce` claim into every token.
    #[must_use]
    pub fn with_nonce(mut self, enabled: bool) -> Self {
        self.nonce = enabled;
        self
    }

    /// Clock used when no explicit time is given.
    #[must_use]
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Resolve the algorithm and validate the configuration.
    ///
    /// # Errors
    /// - [`TokenError::UnknownAlgorithm`] if the algorithm is not registered
    /// - [`TokenError::InvalidTimestampFormat`] for an unusable layout
    /// - [`TokenError::Cipher`] if the encryption key is not 16, 24 or 32 bytes
    pub fn build(self, registry: Arc<MethodRegistry>) -> TokenResult<Signatory> {
        let method = registry
            .get(&self.algorithm)
            .ok_or_else(|| TokenError::UnknownAlgorithm(self.algorithm.clone()))?;

        let timestamp_format = match self.timestamp_format {
            Some(layout) => TimestampFormat::new(layout)?,
            None => TimestampFormat::default(),
        };

        let cipher = self
            .encryption_key
            .map(|key| SymmetricKey::new(key.as_slice()))
            .transpose()?;

        LoggingTransformer::log_signatory_configured(&self.name, method.alg(), cipher.is_some());

        Ok(Signatory {
            name: self.name,
            method,
            key: self.secret,
            timestamp_format,
            cipher,
            purpose: self.purpose,
            nonce: self.nonce,
            registry,
            clock: self.clock.unwrap_or_else(SystemClock::shared),
        })
    }
}
