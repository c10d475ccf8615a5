//! Encrypted at-rest storage of single files.

use std::path::Path;

use nimbus_common::{crypto, keys::TenantKey};

use super::{trash::validate_base_name, StorageError};

/// Encrypt `plain` and write it to `dir/filename`, creating `dir` if needed.
///
/// Returns the file name written.
pub async fn encrypt_and_store(
    key: &TenantKey,
    plain: &[u8],
    filename: &str,
    dir: &Path,
) -> Result<String, StorageError> {
    validate_base_name(filename)?;
    let sealed = crypto::seal(key, plain)?;

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(filename), sealed).await?;
    Ok(filename.to_string())
}

/// Read `dir/filename` and decrypt it. Fails closed on any authentication error.
pub async fn read_and_decrypt(
    key: &TenantKey,
    filename: &str,
    dir: &Path,
) -> Result<Vec<u8>, StorageError> {
    validate_base_name(filename)?;
    let sealed = tokio::fs::read(dir.join(filename)).await?;
    Ok(crypto::open(key, &sealed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_common::{constants::sealed_layout::OVERHEAD, crypto::CryptoError};

    fn key() -> TenantKey {
        TenantKey::from_bytes([3; 32])
    }

    #[tokio::test]
    async fn store_and_read_back() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("not/yet/there");

        let name = encrypt_and_store(&key(), b"quarterly numbers", "report.txt", &dir)
            .await
            .unwrap();
        assert_eq!(name, "report.txt");

        let on_disk = std::fs::read(dir.join("report.txt")).unwrap();
        assert_eq!(on_disk.len(), "quarterly numbers".len() + OVERHEAD);
        assert!(!on_disk.windows(9).any(|w| w == b"quarterly"));

        let plain = read_and_decrypt(&key(), "report.txt", &dir).await.unwrap();
        assert_eq!(plain, b"quarterly numbers");
    }

    #[tokio::test]
    async fn tampered_file_fails_closed() {
        let temp = tempfile::TempDir::new().unwrap();
        encrypt_and_store(&key(), b"payload", "a.bin", temp.path())
            .await
            .unwrap();

        let path = temp.path().join("a.bin");
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[20] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();

        let result = read_and_decrypt(&key(), "a.bin", temp.path()).await;
        assert!(matches!(
            result,
            Err(StorageError::Integrity(CryptoError::IntegrityFailure))
        ));
    }

    #[tokio::test]
    async fn short_file_fails_closed() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("short"), b"tiny").unwrap();
        let result = read_and_decrypt(&key(), "short", temp.path()).await;
        assert!(matches!(result, Err(StorageError::Integrity(CryptoError::Truncated(4)))));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = read_and_decrypt(&key(), "missing", temp.path()).await;
        assert!(matches!(result, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn filename_must_be_a_base_name() {
        let temp = tempfile::TempDir::new().unwrap();
        let result = encrypt_and_store(&key(), b"x", "../escape", temp.path()).await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
    }
}
