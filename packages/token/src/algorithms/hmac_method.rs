//! HMAC-based signing methods (HS256, HS384, HS512)

use super::method::SigningMethod;
use crate::error::{TokenError, TokenResult};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use warrant_common::{decode_segment, encode_segment};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Hash function behind a keyed MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Lower-case name, as accepted by [`FromStr`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes.
    #[must_use]
    pub fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// HMAC of `data` under `key`.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidKey`] if the MAC rejects the key.
    pub fn mac(self, key: &[u8], data: &[u8]) -> TokenResult<Vec<u8>> {
        let invalid_key = |_| TokenError::InvalidKey("Invalid HMAC key".to_string());
        let digest = match self {
            HashAlgorithm::Sha256 => {
                let mut mac = HmacSha256::new_from_slice(key).map_err(invalid_key)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashAlgorithm::Sha384 => {
                let mut mac = HmacSha384::new_from_slice(key).map_err(invalid_key)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashAlgorithm::Sha512 => {
                let mut mac = HmacSha512::new_from_slice(key).map_err(invalid_key)?;
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        };
        Ok(digest)
    }
}

impl FromStr for HashAlgorithm {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            _ => Err(TokenError::HashUnavailable(s.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// HMAC signing method bound to one hash function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HmacMethod {
    name: &'static str,
    hash: HashAlgorithm,
}

impl HmacMethod {
    /// Method with an arbitrary `alg` name.
    #[must_use]
    pub const fn new(name: &'static str, hash: HashAlgorithm) -> Self {
        Self { name, hash }
    }

    /// HMAC-SHA256
    #[must_use]
    pub const fn hs256() -> Self {
        Self::new("HS256", HashAlgorithm::Sha256)
    }

    /// HMAC-SHA384
    #[must_use]
    pub const fn hs384() -> Self {
        Self::new("HS384", HashAlgorithm::Sha384)
    }

    /// HMAC-SHA512
    #[must_use]
    pub const fn hs512() -> Self {
        Self::new("HS512", HashAlgorithm::Sha512)
    }

    /// Underlying hash function.
    #[must_use]
    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }
}

impl SigningMethod for HmacMethod {
    fn alg(&self) -> &'static str {
        self.name
    }

    fn sign(&self, signing_string: &str, key: &[u8]) -> TokenResult<String> {
        let digest = self.hash.mac(key, signing_string.as_bytes())?;
        Ok(encode_segment(&digest))
    }

    fn verify(&self, signing_string: &str, signature: &str, key: &[u8]) -> TokenResult<()> {
        // The MAC is computed before the signature is decoded, and a decode
        // failure compares against an empty slice, so both failure paths do
        // the same work and surface the same error.
        let expected = self.hash.mac(key, signing_string.as_bytes())?;
        let presented = decode_segment(signature).unwrap_or_default();

        if bool::from(expected.as_slice().ct_eq(presented.as_slice())) {
            Ok(())
        } else {
            Err(TokenError::SignatureInvalid)
        }
    }
}
