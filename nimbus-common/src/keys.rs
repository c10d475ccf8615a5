//! Key material.
//!
//! Files are never encrypted with a process-wide constant. The server holds one
//! [`MasterSecret`] and a [`KeyProvider`] hands out a [`TenantKey`] per tenant at call time.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;

use crate::crypto::{random_bytes, CryptoError};
use crate::namespaces;

/// Length in bytes of both the master secret and derived tenant keys.
pub const KEY_LEN: usize = 32;

/// The server-wide secret every tenant key is derived from.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterSecret([u8; KEY_LEN]);

impl MasterSecret {
    /// Generate a new random secret.
    pub fn random() -> Self {
        Self(random_bytes())
    }

    /// Wrap existing secret bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse the hex encoding produced by [`MasterSecret::to_hex`].
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let decoded = hex::decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidSecret(e.to_string()))?;
        let bytes: [u8; KEY_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            CryptoError::InvalidSecret(format!("expected {KEY_LEN} bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Hex encoding, suitable for a secret file.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret(..)")
    }
}

/// A 256-bit symmetric key belonging to exactly one tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct TenantKey([u8; KEY_LEN]);

impl TenantKey {
    /// Wrap existing key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TenantKey(..)")
    }
}

/// Resolves the encryption key of a tenant.
///
/// `tenant` is an opaque, stable context string such as `users/alice` or
/// `workspaces/team-a`. Members of a shared workspace use the workspace's key.
pub trait KeyProvider: Send + Sync + fmt::Debug {
    /// Return the key for `tenant`.
    fn tenant_key(&self, tenant: &str) -> Result<TenantKey, CryptoError>;
}

/// Derives tenant keys from a master secret with HKDF-SHA256.
#[derive(Debug, Clone)]
pub struct DerivedKeyProvider {
    master: MasterSecret,
}

impl DerivedKeyProvider {
    /// Create a provider over `master`.
    pub fn new(master: MasterSecret) -> Self {
        Self { master }
    }
}

impl KeyProvider for DerivedKeyProvider {
    fn tenant_key(&self, tenant: &str) -> Result<TenantKey, CryptoError> {
        let hkdf = Hkdf::<Sha256>::new(None, self.master.as_bytes());

        let mut info = Vec::with_capacity(namespaces::TENANT_FILE_KEY.len() + tenant.len());
        info.extend_from_slice(namespaces::TENANT_FILE_KEY);
        info.extend_from_slice(tenant.as_bytes());

        let mut okm = [0u8; KEY_LEN];
        hkdf.expand(&info, &mut okm)
            .map_err(|_| CryptoError::KeyDerivation)?;
        Ok(TenantKey(okm))
    }
}
