//! Configuration module
//!
//! Handles loading and saving launcher configuration.

mod schema;

pub use schema::{
    AccountsConfig, Config, GameConfig, GeneralConfig, JavaConfig, LaunchConfig, NetworkConfig,
    NewsCache, runtime_dir_in,
};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable used to point a worker process at the launcher directory
pub const LAUNCHER_DIR_ENV: &str = "SOWLAUNCHER_DIR";

/// Get the launcher directory path
///
/// Worker processes inherit the host's directory through [`LAUNCHER_DIR_ENV`].
pub fn launcher_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(LAUNCHER_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sowlauncher")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    launcher_dir().join("config.toml")
}

/// Load configuration from disk
pub fn load() -> Result<Config> {
    load_from(&launcher_dir())
}

/// Load configuration from a specific launcher directory
pub fn load_from(dir: &Path) -> Result<Config> {
    let path = dir.join("config.toml");

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {:?}", path))?
    } else {
        // Create default config
        let config = Config::default();
        save_to(&config, dir)?;
        config
    };

    config.launcher_dir = dir.to_path_buf();
    Ok(config)
}

/// Save configuration to disk
pub fn save(config: &Config) -> Result<()> {
    save_to(config, &config.launcher_dir)
}

/// Save configuration into a specific launcher directory
pub fn save_to(config: &Config, dir: &Path) -> Result<()> {
    let path = dir.join("config.toml");

    // Ensure config directory exists
    std::fs::create_dir_all(dir)?;

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;

    tracing::debug!("Configuration saved to {:?}", path);
    Ok(())
}
