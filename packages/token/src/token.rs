//! Compact token codec
//!
//! Wire format: `base64url(header) "." base64url(claims) "." base64url(signature)`,
//! every segment without padding. A token moves through three states:
//! [`UnsignedToken`] (built, not encoded), [`SignedToken`] (the compact
//! string) and [`ParsedToken`] (decoded and checked, terminal). There is no
//! way back from a signed or parsed token to an unsigned one.

use crate::algorithms::{MethodRegistry, SigningMethod};
use crate::claims::{names, Claims};
use crate::error::{
    TokenError, TokenResult, ValidationError, ValidationErrors, ValidationFlags, ValidationResult,
};
use crate::timestamp::{parse_timestamp, DEFAULT_TIMESTAMP_FORMAT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use warrant_common::{decode_segment, encode_segment};

/// `typ` header value written by this crate.
pub const TOKEN_TYPE: &str = "token";

/// Token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Token type.
    pub typ: String,
    /// Signing method name.
    pub alg: String,
}

impl Header {
    /// Header for `alg`.
    #[must_use]
    pub fn new(alg: &str) -> Self {
        Self {
            typ: TOKEN_TYPE.to_string(),
            alg: alg.to_string(),
        }
    }
}

/// A token being built: header and claims are set, nothing is encoded yet.
#[derive(Debug, Clone)]
pub struct UnsignedToken {
    header: Header,
    claims: Claims,
    method: Arc<dyn SigningMethod>,
}

impl UnsignedToken {
    /// Empty token for `method`.
    #[must_use]
    pub fn new(method: Arc<dyn SigningMethod>) -> Self {
        Self::with_claims(method, Claims::new())
    }

    /// Token for `method` carrying `claims`.
    #[must_use]
    pub fn with_claims(method: Arc<dyn SigningMethod>, claims: Claims) -> Self {
        Self {
            header: Header::new(method.alg()),
            claims,
            method,
        }
    }

    /// Header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Claims.
    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Mutable claims.
    pub fn claims_mut(&mut self) -> &mut Claims {
        &mut self.claims
    }

    /// `base64url(header) "." base64url(claims)`.
    ///
    /// # Errors
    /// Returns [`TokenError::Serialization`] if either part fails to serialize.
    pub fn signing_string(&self) -> TokenResult<String> {
        let header = serde_json::to_vec(&self.header)
            .map_err(|e| TokenError::serialization(&e.to_string()))?;
        let claims = serde_json::to_vec(&self.claims)
            .map_err(|e| TokenError::serialization(&e.to_string()))?;
        Ok(format!("{}.{}", encode_segment(&header), encode_segment(&claims)))
    }

    /// Sign with `key`, producing the compact string.
    ///
    /// # Errors
    /// Propagates serialization and signing-method errors.
    pub fn sign(self, key: &[u8]) -> TokenResult<SignedToken> {
        let signing_string = self.signing_string()?;
        let signature = self.method.sign(&signing_string, key)?;
        Ok(SignedToken(format!("{signing_string}.{signature}")))
    }
}

/// A signed token string.
///
/// Either the raw compact form or, for encrypting signatories, the wrapped
/// blob. Kept distinct from `String` so an error message can never be handed
/// out in place of a token.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SignedToken(String);

impl SignedToken {
    pub(crate) fn new(token: String) -> Self {
        Self(token)
    }

    /// Token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the token text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedToken({})", warrant_common::fingerprint(&self.0))
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SignedToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<SignedToken> for String {
    fn from(token: SignedToken) -> Self {
        token.0
    }
}

/// A decoded token together with the outcome of its checks.
#[derive(Debug, Clone)]
pub struct ParsedToken {
    raw: String,
    header: Map<String, Value>,
    claims: Claims,
    method: Option<Arc<dyn SigningMethod>>,
    signature: String,
    validation: ValidationResult,
}

impl ParsedToken {
    fn empty(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            header: Map::new(),
            claims: Claims::new(),
            method: None,
            signature: String::new(),
            validation: Ok(()),
        }
    }

    fn rejected(mut self, error: ValidationError) -> Self {
        self.validation = Err(error);
        self
    }

    /// String the token was parsed from.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded header fields.
    #[must_use]
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// Declared `alg`, if the header carries one.
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// Decoded claims; empty if the token was malformed.
    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Resolved signing method, if `alg` named a registered one.
    #[must_use]
    pub fn method(&self) -> Option<&Arc<dyn SigningMethod>> {
        self.method.as_ref()
    }

    /// Signature segment as presented.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// True iff every check passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validation.is_ok()
    }

    /// Outcome of the checks.
    #[must_use]
    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    /// The token if valid, its validation error otherwise.
    ///
    /// # Errors
    /// Returns the accumulated [`ValidationError`] of an invalid token.
    pub fn into_result(self) -> Result<Self, ValidationError> {
        match self.validation {
            Ok(()) => Ok(self),
            Err(ref err) => Err(err.clone()),
        }
    }
}

/// Decode and verify a compact token as of `now`.
///
/// `keyfunc` sees the partly decoded token (header, claims, resolved method)
/// and returns the verification key, so the key can depend on the declared
/// algorithm. Malformed and unverifiable tokens stop at the first failure;
/// the expiry, not-before and signature checks all run and their flags
/// accumulate.
pub fn parse<F, K>(
    compact: &str,
    registry: &MethodRegistry,
    keyfunc: F,
    now: DateTime<Utc>,
) -> ParsedToken
where
    F: FnOnce(&ParsedToken) -> TokenResult<K>,
    K: AsRef<[u8]>,
{
    let mut token = ParsedToken::empty(compact);

    let parts: Vec<&str> = compact.split('.').collect();
    let [header_b64, claims_b64, signature_b64] = parts.as_slice() else {
        return token.rejected(ValidationError::malformed(
            "token contains an invalid number of segments",
        ));
    };
    token.signature = (*signature_b64).to_string();

    token.header = match decode_json::<Map<String, Value>>(header_b64, "header") {
        Ok(header) => header,
        Err(err) => return token.rejected(err),
    };
    token.claims = match decode_json::<Claims>(claims_b64, "claims") {
        Ok(claims) => claims,
        Err(err) => return token.rejected(err),
    };

    let Some(alg) = token.alg().map(str::to_string) else {
        return token.rejected(ValidationError::unverifiable(
            "signing method (alg) is unspecified",
        ));
    };
    let Some(method) = registry.get(&alg) else {
        return token.rejected(ValidationError::unverifiable(format!(
            "signing method (alg) {alg} is unavailable"
        )));
    };
    token.method = Some(Arc::clone(&method));

    let key = match keyfunc(&token) {
        Ok(key) => key,
        Err(err) => return token.rejected(ValidationError::unverifiable(err.to_string())),
    };

    let mut errors = ValidationErrors::default();
    let layout = token
        .claims
        .get(names::TIMESTAMP_FORMAT)
        .unwrap_or(DEFAULT_TIMESTAMP_FORMAT);

    if let Some(expires) = token
        .claims
        .get(names::EXPIRES)
        .and_then(|exp| parse_timestamp(exp, layout))
    {
        if now > expires {
            errors.push(ValidationFlags::EXPIRED, "token is expired");
        }
    }
    if let Some(not_before) = token
        .claims
        .get(names::NOT_BEFORE)
        .and_then(|nbf| parse_timestamp(nbf, layout))
    {
        if now < not_before {
            errors.push(ValidationFlags::NOT_VALID_YET, "token is not valid yet");
        }
    }

    let signing_string = format!("{header_b64}.{claims_b64}");
    if let Err(err) = method.verify(&signing_string, signature_b64, key.as_ref()) {
        errors.push(ValidationFlags::SIGNATURE_INVALID, err.to_string());
    }

    token.validation = errors.finish();
    token
}

fn decode_json<T: for<'de> Deserialize<'de>>(segment: &str, what: &str) -> Result<T, ValidationError> {
    let bytes = decode_segment(segment)
        .map_err(|e| ValidationError::malformed(format!("{what} segment: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ValidationError::malformed(format!("{what} segment: {e}")))
}
