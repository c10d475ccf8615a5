use super::ConfigToml;
use nimbus_common::keys::MasterSecret;
use std::{fmt::Debug, path::Path};

/// A directory holding everything the homeserver persists: the config file,
/// the master secret and, unless configured elsewhere, the storage root.
pub trait DataDir: Debug + Send + Sync {
    /// Root path of the data directory.
    fn path(&self) -> &Path;

    /// Create the directory if needed and fail early when it can't be written to.
    fn ensure_data_dir_exists_and_is_writable(&self) -> anyhow::Result<()>;

    /// Read `config.toml`, creating a commented default one if missing.
    fn read_or_create_config_file(&self) -> anyhow::Result<ConfigToml>;

    /// Read the master secret tenant keys are derived from, generating one if missing.
    fn read_or_create_master_secret(&self) -> anyhow::Result<MasterSecret>;
}
