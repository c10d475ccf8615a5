//!
//! Module to initialize tracing logs.
//!
//! Logs are configured from the `[logging]` section of the config file, falling back to
//! the defaults if the file can't be read. `RUST_LOG` overrides both.
//!
//! Called before the server starts so config loading errors are logged too.
//!

use crate::{ConfigToml, PersistentDataDir};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn read_config_from_file(data_dir: &Path) -> anyhow::Result<ConfigToml> {
    let data_dir = PersistentDataDir::new(data_dir.to_path_buf());
    let config_file_path = data_dir.get_config_file_path();
    let config = ConfigToml::from_file(config_file_path)?;
    Ok(config)
}

fn env_filter(config: &crate::LoggingToml) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new("");
        filter = filter.add_directive(config.level.to_owned().into());
        for directive in &config.module_levels {
            filter = filter.add_directive(directive.to_owned().into());
        }
        filter
    })
}

/// Initialize tracing logger based on the values defined in the config file.
/// Does nothing if the config has no `[logging]` section.
pub fn init_tracing_logs_with_config_if_set(config: &ConfigToml) -> anyhow::Result<()> {
    let Some(logging) = &config.logging else {
        return Ok(());
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(logging))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}

/// Initialize tracing logger based on the values defined in the config file.
/// If the config file is not found, use default values.
pub fn init_tracing_logs_if_set(data_dir: &Path) -> anyhow::Result<()> {
    let config = match read_config_from_file(data_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to read config from file, using defaults: {}", e);
            ConfigToml::default()
        }
    };

    init_tracing_logs_with_config_if_set(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_without_logging_is_a_noop() {
        assert!(init_tracing_logs_with_config_if_set(&ConfigToml::test()).is_ok());
    }

    #[test]
    fn filter_contains_module_levels() {
        let config = ConfigToml::default();
        let logging = config.logging.expect("default config has a logging section");
        let filter = env_filter(&logging).to_string();
        if std::env::var("RUST_LOG").is_err() {
            assert!(filter.contains("nimbus_homeserver=debug"));
        }
    }
}
