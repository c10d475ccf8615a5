use nimbus_common::crypto::CryptoError;

/// Errors of the storage engine.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The addressed file or folder does not exist.
    #[error("not found")]
    NotFound,
    /// The operation would clobber or collide with an existing item.
    #[error("conflict: {0}")]
    Conflict(String),
    /// An identifier or base name is not acceptable.
    #[error("invalid name: {0}")]
    InvalidName(String),
    /// A relative path could not be normalized inside its scope.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// Stored ciphertext failed authentication or key material was unusable.
    #[error("integrity failure: {0}")]
    Integrity(#[from] CryptoError),
    /// A directory walk went deeper than allowed.
    #[error("directory tree is nested deeper than {max_depth} levels")]
    TraversalTooDeep {
        /// The configured limit.
        max_depth: usize,
    },
    /// The write would push the tenant over its storage quota.
    #[error("storage quota of {limit_bytes} bytes exceeded")]
    QuotaExceeded {
        /// The configured limit.
        limit_bytes: u64,
    },
    /// Any other filesystem error.
    #[error(transparent)]
    Io(std::io::Error),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            _ => StorageError::Io(error),
        }
    }
}

/// `Ok(None)` for a missing path, the value otherwise.
pub(crate) fn ok_if_missing<T>(result: std::io::Result<T>) -> Result<Option<T>, StorageError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Io(e)),
    }
}
