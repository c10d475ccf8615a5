mod config_toml;
mod data_dir;
mod log_level;
mod mock_data_dir;
mod persistent_data_dir;

pub use config_toml::{
    ConfigReadError, ConfigToml, DavToml, GeneralToml, LoggingToml, StorageToml, DEFAULT_CONFIG,
};
pub use data_dir::DataDir;
pub use log_level::{LogLevel, TargetLevel};
pub use mock_data_dir::MockDataDir;
pub use persistent_data_dir::PersistentDataDir;
