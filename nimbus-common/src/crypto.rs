//! Authenticated encryption of whole payloads.
//!
//! A sealed payload is laid out as `nonce (12) || tag (16) || ciphertext` so it can be
//! written to disk as-is and split again on read.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Key, Nonce, Tag,
};
use rand::prelude::Rng;

use crate::constants::sealed_layout::{NONCE_LEN, OVERHEAD, TAG_LEN};
use crate::keys::TenantKey;

/// Errors of the sealing layer and of key handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The authentication tag did not verify. Nothing was decrypted.
    #[error("sealed payload failed authentication")]
    IntegrityFailure,
    /// The payload is too short to even hold a nonce and a tag.
    #[error("sealed payload is {0} bytes, shorter than nonce and tag")]
    Truncated(usize),
    /// The cipher refused the plaintext (only happens for absurdly large inputs).
    #[error("encryption failed")]
    Encryption,
    /// HKDF could not expand the requested key length.
    #[error("key derivation failed")]
    KeyDerivation,
    /// A master secret could not be parsed.
    #[error("invalid master secret: {0}")]
    InvalidSecret(String),
}

/// Random byte array from the thread local rng.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut rng = rand::thread_rng();
    let mut arr = [0u8; N];

    #[allow(clippy::needless_range_loop)]
    for i in 0..N {
        arr[i] = rng.gen();
    }
    arr
}

fn cipher(key: &TenantKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

/// Encrypt `plaintext` with a fresh random nonce.
///
/// Returns `nonce || tag || ciphertext`.
pub fn seal(key: &TenantKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let nonce_bytes: [u8; NONCE_LEN] = random_bytes();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut buffer = plaintext.to_vec();
    let tag = cipher(key)
        .encrypt_in_place_detached(nonce, b"", &mut buffer)
        .map_err(|_| CryptoError::Encryption)?;

    let mut sealed = Vec::with_capacity(OVERHEAD + buffer.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(tag.as_slice());
    sealed.extend_from_slice(&buffer);
    Ok(sealed)
}

/// Verify and decrypt a payload produced by [`seal`].
///
/// Fails closed: on a tag mismatch no plaintext is returned.
pub fn open(key: &TenantKey, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < OVERHEAD {
        return Err(CryptoError::Truncated(sealed.len()));
    }

    let (nonce_bytes, rest) = sealed.split_at(NONCE_LEN);
    let (tag_bytes, ciphertext) = rest.split_at(TAG_LEN);

    let mut buffer = ciphertext.to_vec();
    cipher(key)
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce_bytes),
            b"",
            &mut buffer,
            Tag::from_slice(tag_bytes),
        )
        .map_err(|_| CryptoError::IntegrityFailure)?;

    Ok(buffer)
}
