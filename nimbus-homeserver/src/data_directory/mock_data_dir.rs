use std::path::Path;

use nimbus_common::keys::MasterSecret;

use super::{ConfigToml, DataDir};

/// Mock data directory for testing.
///
/// Backed by a temporary directory that is removed as soon as the last clone is dropped.
#[derive(Debug, Clone)]
pub struct MockDataDir {
    pub(crate) temp_dir: std::sync::Arc<tempfile::TempDir>,
    /// The configuration for the homeserver.
    pub config_toml: ConfigToml,
    /// The master secret tenant keys are derived from.
    pub master_secret: MasterSecret,
}

impl MockDataDir {
    /// Create a new mock data directory in a fresh temporary directory.
    ///
    /// A random master secret is generated if none is provided.
    pub fn new(
        config_toml: ConfigToml,
        master_secret: Option<MasterSecret>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            temp_dir: std::sync::Arc::new(tempfile::TempDir::new()?),
            config_toml,
            master_secret: master_secret.unwrap_or_else(MasterSecret::random),
        })
    }

    /// A mock data directory with a config and secret appropriate for testing.
    #[cfg(any(test, feature = "testing"))]
    pub fn test() -> Self {
        Self::new(ConfigToml::test(), Some(MasterSecret::from_bytes([0; 32])))
            .expect("failed to create MockDataDir")
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for MockDataDir {
    fn default() -> Self {
        Self::test()
    }
}

impl DataDir for MockDataDir {
    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn ensure_data_dir_exists_and_is_writable(&self) -> anyhow::Result<()> {
        Ok(()) // Guaranteed by the tempfile crate.
    }

    fn read_or_create_config_file(&self) -> anyhow::Result<ConfigToml> {
        Ok(self.config_toml.clone())
    }

    fn read_or_create_master_secret(&self) -> anyhow::Result<MasterSecret> {
        Ok(self.master_secret.clone())
    }
}
