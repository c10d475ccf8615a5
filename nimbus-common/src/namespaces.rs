//! Namespaces used as HKDF context so derived keys never collide with other uses of the master secret.

/// Context prefix for per-tenant file encryption keys.
pub const TENANT_FILE_KEY: &[u8; 10] = b"nimbus/v1/";
