//!
//! The application context shared between all components.
//! Think of it as a simple Dependency Injection container.
//!
//! Create with a `DataDir` instance: `AppContext::read_from(data_dir)`
//!

#[cfg(any(test, feature = "testing"))]
use crate::MockDataDir;
use crate::{
    dav_server::{AccessControl, TrustedHeaderAccess},
    persistence::StorageService,
    ConfigToml, DataDir,
};
use nimbus_common::keys::DerivedKeyProvider;
use std::sync::Arc;

/// Errors that can occur when converting a `DataDir` to an `AppContext`.
#[derive(Debug, thiserror::Error)]
pub enum AppContextConversionError {
    /// Failed to ensure data directory exists and is writable.
    #[error("Failed to ensure data directory exists and is writable: {0}")]
    DataDir(anyhow::Error),
    /// Failed to read or create config file.
    #[error("Failed to read or create config file: {0}")]
    Config(anyhow::Error),
    /// Failed to read or create the master secret.
    #[error("Failed to read or create master secret: {0}")]
    Secret(anyhow::Error),
    /// Failed to create the storage root.
    #[error("Failed to create storage root: {0}")]
    Storage(std::io::Error),
}

/// The application context shared between all components.
#[derive(Clone)]
pub struct AppContext {
    /// The storage engine bound to the configured storage root.
    pub(crate) storage: StorageService,
    pub(crate) config_toml: ConfigToml,
    /// Keep data_dir alive. The mock dir will cleanup on drop.
    pub(crate) data_dir: Arc<dyn DataDir>,
    /// Decides who a request belongs to and what it may touch.
    pub(crate) access: Arc<dyn AccessControl>,
}

impl AppContext {
    /// Create a new AppContext for testing.
    #[cfg(any(test, feature = "testing"))]
    pub async fn test() -> Self {
        let data_dir = MockDataDir::test();
        Self::read_from(data_dir)
            .await
            .expect("failed to build AppContext from MockDataDir")
    }

    /// Create a new AppContext from a data directory.
    pub async fn read_from<D: DataDir + 'static>(dir: D) -> Result<Self, AppContextConversionError> {
        dir.ensure_data_dir_exists_and_is_writable()
            .map_err(AppContextConversionError::DataDir)?;
        let conf = dir
            .read_or_create_config_file()
            .map_err(AppContextConversionError::Config)?;
        let secret = dir
            .read_or_create_master_secret()
            .map_err(AppContextConversionError::Secret)?;

        let root = conf.storage_root(dir.path());
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(AppContextConversionError::Storage)?;
        tracing::debug!("Storage root at {}", root.display());

        let storage = StorageService::new(
            root,
            Arc::new(DerivedKeyProvider::new(secret)),
            conf.storage.max_traversal_depth,
            conf.storage_quota_bytes(),
        );

        Ok(Self {
            storage,
            config_toml: conf,
            data_dir: Arc::new(dir),
            access: Arc::new(TrustedHeaderAccess),
        })
    }

    /// Replace the access control of this context.
    pub fn with_access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = access;
        self
    }

    /// The storage engine.
    pub fn storage(&self) -> &StorageService {
        &self.storage
    }

    /// The effective configuration.
    pub fn config(&self) -> &ConfigToml {
        &self.config_toml
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("storage", &self.storage)
            .field("data_dir", &self.data_dir.path())
            .finish_non_exhaustive()
    }
}
