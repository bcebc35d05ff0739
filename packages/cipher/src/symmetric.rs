//! AES-CFB token wrapping
//!
//! Wire format: `base64url(iv || AES_CFB(plaintext))` with `=` padding. The IV
//! is one AES block of fresh CSPRNG output per call.

use crate::{CipherError, Result};
use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use rand::RngCore;
use std::fmt;
use warrant_common::{decode_segment, encode_segment_padded};
use zeroize::Zeroizing;

/// AES block length, which is also the IV length.
pub const BLOCK_SIZE: usize = 16;

type CfbEncryptor<C> = cfb_mode::Encryptor<C>;
type CfbDecryptor<C> = cfb_mode::Decryptor<C>;

/// Validated AES key.
///
/// Construction is the only place the key length is checked, so a
/// misconfigured key fails when the signatory is built rather than on the
/// first request.
#[derive(Clone)]
pub struct SymmetricKey {
    key: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey(AES-{}, REDACTED)", self.bits())
    }
}

impl SymmetricKey {
    /// Build a key from raw bytes.
    ///
    /// # Errors
    /// Returns [`CipherError::InvalidKeyLength`] unless the key is exactly 16,
    /// 24 or 32 bytes long.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let key = Zeroizing::new(bytes.into());
        match key.len() {
            16 | 24 | 32 => Ok(Self { key }),
            actual => Err(CipherError::InvalidKeyLength { actual }),
        }
    }

    /// Key size in bits (128, 192 or 256).
    #[must_use]
    pub fn bits(&self) -> usize {
        self.key.len() * 8
    }

    /// Encrypt `plaintext` under a fresh random IV.
    ///
    /// # Errors
    /// Returns [`CipherError::EncryptionFailed`] if the cipher cannot be
    /// initialised.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut iv = [0u8; BLOCK_SIZE];
        rand::rng().fill_bytes(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    /// Encrypt with a caller-chosen IV. Reusing an IV under the same key leaks
    /// plaintext relationships; only [`SymmetricKey::encrypt`] should be used
    /// outside of known-answer tests.
    pub(crate) fn encrypt_with_iv(&self, plaintext: &[u8], iv: &[u8; BLOCK_SIZE]) -> Result<String> {
        let mut blob = Vec::with_capacity(BLOCK_SIZE + plaintext.len());
        blob.extend_from_slice(iv);
        blob.extend_from_slice(plaintext);

        apply_keystream(&self.key, iv, &mut blob[BLOCK_SIZE..], Direction::Encrypt)?;
        Ok(encode_segment_padded(&blob))
    }

    /// Decrypt a blob produced by [`SymmetricKey::encrypt`].
    ///
    /// CFB is unauthenticated: a corrupted blob of valid length decrypts to
    /// garbage rather than failing here. Integrity comes from the signature
    /// inside the wrapped token.
    ///
    /// # Errors
    /// - [`CipherError::InvalidEncryptedData`] if `encoded` is not base64url
    /// - [`CipherError::TokenLength`] if the decoded blob is shorter than one block
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>> {
        let mut blob = decode_segment(encoded)?;
        if blob.len() < BLOCK_SIZE {
            tracing::debug!(actual = blob.len(), "encrypted token shorter than its IV");
            return Err(CipherError::TokenLength {
                expected: BLOCK_SIZE,
                actual: blob.len(),
            });
        }

        let mut ciphertext = blob.split_off(BLOCK_SIZE);
        apply_keystream(&self.key, &blob, &mut ciphertext, Direction::Decrypt)?;
        Ok(ciphertext)
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

fn apply_keystream(key: &[u8], iv: &[u8], buf: &mut [u8], direction: Direction) -> Result<()> {
    match key.len() {
        16 => run::<Aes128>(key, iv, buf, direction),
        24 => run::<Aes192>(key, iv, buf, direction),
        32 => run::<Aes256>(key, iv, buf, direction),
        actual => Err(CipherError::InvalidKeyLength { actual }),
    }
}

fn run<C>(key: &[u8], iv: &[u8], buf: &mut [u8], direction: Direction) -> Result<()>
where
    C: aes::cipher::BlockEncryptMut + aes::cipher::BlockCipher + aes::cipher::KeyInit,
    CfbEncryptor<C>: KeyIvInit + AsyncStreamCipher,
    CfbDecryptor<C>: KeyIvInit + AsyncStreamCipher,
{
    let init_err = |e: aes::cipher::InvalidLength| CipherError::EncryptionFailed(e.to_string());
    match direction {
        Direction::Encrypt => CfbEncryptor::<C>::new_from_slices(key, iv)
            .map_err(init_err)?
            .encrypt(buf),
        Direction::Decrypt => CfbDecryptor::<C>::new_from_slices(key, iv)
            .map_err(init_err)?
            .decrypt(buf),
    }
    Ok(())
}
