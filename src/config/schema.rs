//! Configuration schema
//!
//! Defines the structure of the configuration file.

use crate::core::auth::AuthAccount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub java: JavaConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub game: GameConfig,

    #[serde(default)]
    pub launch: LaunchConfig,

    #[serde(default)]
    pub accounts: AccountsConfig,

    #[serde(default)]
    pub news: NewsCache,

    /// Directory the config was loaded from
    #[serde(skip)]
    pub launcher_dir: PathBuf,
}

impl Config {
    /// Root for game data (defaults to the launcher directory)
    pub fn data_dir(&self) -> PathBuf {
        match &self.general.data_directory {
            Some(dir) => dir.clone(),
            None => self.launcher_dir.clone(),
        }
    }

    /// Shared libraries, assets, versions and mod store
    pub fn common_dir(&self) -> PathBuf {
        self.data_dir().join("common")
    }

    /// Per-server game directories
    pub fn instance_dir(&self) -> PathBuf {
        self.data_dir().join("instances")
    }

    /// Managed Java runtimes
    pub fn runtime_dir(&self) -> PathBuf {
        runtime_dir_in(&self.data_dir())
    }

    /// Game directory of one server
    pub fn server_dir(&self, server_id: &str) -> PathBuf {
        self.instance_dir().join(server_id)
    }

    /// The vanilla launcher's game directory
    pub fn minecraft_dir(&self) -> PathBuf {
        if cfg!(target_os = "windows") {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".minecraft")
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("minecraft")
        } else {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".minecraft")
        }
    }

    /// Path of the launcher log uploaded by error reports
    pub fn log_path(&self) -> PathBuf {
        self.launcher_dir.join("latest.log")
    }
}

/// Managed Java runtimes below a data directory
pub fn runtime_dir_in(data_dir: &Path) -> PathBuf {
    data_dir.join("runtime").join("x64")
}

/// General launcher settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Where game files are stored (unset = launcher directory)
    #[serde(default)]
    pub data_directory: Option<PathBuf>,

    /// Read `distribution_dev.json` instead of the remote index
    #[serde(default)]
    pub dev_mode: bool,
}

/// Java runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JavaConfig {
    /// Path to Java executable (unset = scan on launch)
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Minimum memory allocation
    #[serde(default = "default_min_memory")]
    pub min_memory: String,

    /// Maximum memory allocation
    #[serde(default = "default_max_memory")]
    pub max_memory: String,

    /// Extra JVM arguments
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Compatibility mode forbids pointing the launcher at a hand-installed Java
    #[serde(default)]
    pub compatibility_mode: bool,
}

impl Default for JavaConfig {
    fn default() -> Self {
        Self {
            executable: None,
            min_memory: default_min_memory(),
            max_memory: default_max_memory(),
            extra_args: Vec::new(),
            compatibility_mode: false,
        }
    }
}

/// Network settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Remote distribution index (empty = only use the local copy)
    #[serde(default)]
    pub distribution_url: String,

    /// Error report endpoint
    #[serde(default = "default_report_url")]
    pub report_url: String,

    /// Maintenance flag endpoint
    #[serde(default = "default_maintenance_url")]
    pub maintenance_url: String,

    /// Service status endpoint (empty = statuses unknown)
    #[serde(default)]
    pub status_url: String,

    /// Number of concurrent downloads
    #[serde(default = "default_concurrent_downloads")]
    pub concurrent_downloads: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            distribution_url: String::new(),
            report_url: default_report_url(),
            maintenance_url: default_maintenance_url(),
            status_url: String::new(),
            concurrent_downloads: default_concurrent_downloads(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Game window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_width")]
    pub resolution_width: u32,
    #[serde(default = "default_height")]
    pub resolution_height: u32,
    #[serde(default)]
    pub fullscreen: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            resolution_width: default_width(),
            resolution_height: default_height(),
            fullscreen: false,
        }
    }
}

/// Landing and launch behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Currently selected server id
    #[serde(default)]
    pub selected_server: Option<String>,

    /// Copy shader packs from the vanilla game directory before launch
    #[serde(default)]
    pub shader_mirroring: bool,

    /// Entries of the mods folder that survive the pre-launch purge
    #[serde(default = "default_protected_mods")]
    pub protected_mods: Vec<String>,

    /// Value forced into `resourcePacks:` of options.txt
    #[serde(default = "default_resource_packs")]
    pub resource_packs: Vec<String>,

    /// Chat line printed when the player enters the server world
    #[serde(default = "default_server_joined_pattern")]
    pub server_joined_pattern: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            selected_server: None,
            shader_mirroring: false,
            protected_mods: default_protected_mods(),
            resource_packs: default_resource_packs(),
            server_joined_pattern: default_server_joined_pattern(),
        }
    }
}

/// Known accounts, keyed by UUID
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsConfig {
    #[serde(default)]
    pub selected: Option<String>,

    #[serde(default)]
    pub entries: BTreeMap<String, AuthAccount>,
}

/// Last seen news article
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsCache {
    /// Publication time in milliseconds since the epoch
    #[serde(default)]
    pub date: Option<i64>,
    /// SHA-1 of the article content
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub dismissed: bool,
}

// Default value functions for serde
fn default_min_memory() -> String {
    "2G".to_string()
}
fn default_max_memory() -> String {
    "4G".to_string()
}
fn default_report_url() -> String {
    "https://mysql.songs-of-war.com/reporting/reporting.php".to_string()
}
fn default_maintenance_url() -> String {
    "https://mysql.songs-of-war.com/maintenance".to_string()
}
fn default_concurrent_downloads() -> u32 {
    4
}
fn default_timeout() -> u64 {
    30
}
fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    720
}
fn default_protected_mods() -> Vec<String> {
    ["OptiFine.jar", "MixinBootstrap.jar", "nicephore"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_resource_packs() -> Vec<String> {
    ["mod_resources", "vanilla", "programer_art", "file/SoWPack"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_server_joined_pattern() -> String {
    r"\[.+\]: \[CHAT\] \[\+\] [a-zA-Z0-9_]{1,16} has entered Ardonia".to_string()
}
