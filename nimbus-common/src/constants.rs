//! Constants used across Nimbus.

/// Name of the reserved recycle-bin directory inside every storage scope.
pub const TRASH_DIR_NAME: &str = ".trash";

/// Workspace identifier value that selects a user's personal scope.
pub const PERSONAL_WORKSPACE: &str = "personal";

/// Sizes of the sealed payload layout.
pub mod sealed_layout {
    /// Length of the random nonce that prefixes every sealed payload.
    pub const NONCE_LEN: usize = 12;
    /// Length of the AES-GCM authentication tag that follows the nonce.
    pub const TAG_LEN: usize = 16;
    /// Bytes of overhead a sealed payload carries on top of its plaintext.
    pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;
}
