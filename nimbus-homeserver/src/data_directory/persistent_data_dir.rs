use super::{ConfigToml, DataDir};
use nimbus_common::keys::MasterSecret;
use std::{
    io::Write,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

/// The data directory on disk.
///
/// Paths starting with `~/` are expanded to the home directory.
#[derive(Debug, Clone)]
pub struct PersistentDataDir {
    expanded_path: PathBuf,
}

impl PersistentDataDir {
    /// Creates a new data directory handle. Nothing is touched on disk yet.
    pub fn new(path: PathBuf) -> Self {
        Self {
            expanded_path: Self::expand_home_dir(path),
        }
    }

    fn expand_home_dir(path: PathBuf) -> PathBuf {
        let Some(raw) = path.to_str() else {
            // Not valid utf-8, can't be a `~/` path.
            return path;
        };
        match (raw.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => path,
        }
    }

    /// Path of `config.toml` in this directory.
    pub fn get_config_file_path(&self) -> PathBuf {
        self.expanded_path.join("config.toml")
    }

    /// Path of the master secret file in this directory.
    pub fn get_secret_file_path(&self) -> PathBuf {
        self.expanded_path.join("secret")
    }

    fn write_default_config_file(&self) -> anyhow::Result<()> {
        let mut config_file = std::fs::File::create(self.get_config_file_path())?;
        config_file.write_all(ConfigToml::default_string().as_bytes())?;
        Ok(())
    }

    fn write_master_secret(&self, secret: &MasterSecret) -> anyhow::Result<()> {
        let path = self.get_secret_file_path();
        std::fs::write(&path, secret.to_hex())?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        Ok(())
    }
}

impl Default for PersistentDataDir {
    fn default() -> Self {
        Self::new(PathBuf::from("~/.nimbus"))
    }
}

impl DataDir for PersistentDataDir {
    fn path(&self) -> &Path {
        &self.expanded_path
    }

    fn ensure_data_dir_exists_and_is_writable(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.expanded_path)?;

        let test_file = self.expanded_path.join(".write-test");
        std::fs::write(&test_file, b"")
            .map_err(|e| anyhow::anyhow!("data directory is not writable: {e}"))?;
        std::fs::remove_file(test_file)?;
        Ok(())
    }

    fn read_or_create_config_file(&self) -> anyhow::Result<ConfigToml> {
        let config_file_path = self.get_config_file_path();
        if !config_file_path.exists() {
            self.write_default_config_file()?;
        }
        Ok(ConfigToml::from_file(config_file_path)?)
    }

    fn read_or_create_master_secret(&self) -> anyhow::Result<MasterSecret> {
        let secret_file_path = self.get_secret_file_path();
        if !secret_file_path.exists() {
            tracing::info!("Generating master secret at {}", secret_file_path.display());
            self.write_master_secret(&MasterSecret::random())?;
        }
        let encoded = std::fs::read_to_string(secret_file_path)?;
        Ok(MasterSecret::from_hex(&encoded)?)
    }
}
