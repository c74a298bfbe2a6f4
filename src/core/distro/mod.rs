//! Distribution index
//!
//! The remote manifest that lists the servers the launcher can join and
//! every artifact (libraries, Forge, mods, files) each of them needs.

mod maven;

pub use maven::MavenId;

use crate::config::Config;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Cached copy of the remote index
pub const DISTRO_FILE: &str = "distribution.json";
/// Hand-edited index used in dev mode
pub const DEV_DISTRO_FILE: &str = "distribution_dev.json";

#[derive(Debug, Error)]
pub enum DistroError {
    #[error("Failed to fetch distribution index: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Distribution index returned HTTP {0}")]
    Status(u16),

    #[error("Failed to parse distribution index: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No remote distribution URL configured")]
    NoRemote,

    #[error("Could not load a copy of the distribution index.")]
    Unavailable,

    #[error("Server not found in distribution: {0}")]
    ServerNotFound(String),
}

/// Root of the distribution index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub version: String,
    /// News feed
    #[serde(default)]
    pub rss: Option<String>,
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Modpack version
    pub version: String,
    /// `host[:port]`
    pub address: String,
    pub minecraft_version: String,
    #[serde(default)]
    pub main_server: bool,
    #[serde(default)]
    pub autoconnect: bool,
    #[serde(default)]
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Maven identifier, `group:artifact:version[:classifier][@ext]`
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    #[serde(default)]
    pub required: Option<Required>,
    pub artifact: Artifact,
    #[serde(default)]
    pub sub_modules: Vec<Module>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleType {
    Library,
    ForgeHosted,
    Forge,
    LiteLoader,
    ForgeMod,
    LiteMod,
    File,
    VersionManifest,
}

impl ModuleType {
    /// Modules placed on the classpath
    pub fn is_library(self) -> bool {
        matches!(
            self,
            ModuleType::Library | ModuleType::ForgeHosted | ModuleType::Forge | ModuleType::LiteLoader
        )
    }

    pub fn is_mod(self) -> bool {
        matches!(self, ModuleType::ForgeMod | ModuleType::LiteMod)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Required {
    #[serde(default = "default_true")]
    pub value: bool,
    #[serde(default = "default_true")]
    pub def: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub size: u64,
    /// Hex digest; the key is upper-case on the wire
    #[serde(rename = "MD5", default)]
    pub md5: Option<String>,
    pub url: String,
    /// Explicit location, overriding the maven layout
    #[serde(default)]
    pub path: Option<String>,
}

/// Directories a module path is resolved against
#[derive(Debug, Clone)]
pub struct Layout {
    pub common_dir: PathBuf,
    pub instance_dir: PathBuf,
}

impl Layout {
    pub fn from_config(config: &Config) -> Self {
        Self {
            common_dir: config.common_dir(),
            instance_dir: config.instance_dir(),
        }
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.common_dir.join("libraries")
    }

    pub fn modstore_dir(&self) -> PathBuf {
        self.common_dir.join("modstore")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.common_dir.join("versions")
    }

    pub fn server_dir(&self, server_id: &str) -> PathBuf {
        self.instance_dir.join(server_id)
    }

    pub fn mods_dir(&self, server_id: &str) -> PathBuf {
        self.server_dir(server_id).join("mods")
    }
}

impl Distribution {
    pub fn from_json(json: &str) -> Result<Self, DistroError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Find a server by id
    pub fn get_server(&self, id: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }

    /// The server flagged as main, else the first one
    pub fn main_server(&self) -> Option<&Server> {
        self.servers
            .iter()
            .find(|s| s.main_server)
            .or_else(|| self.servers.first())
    }
}

impl Server {
    /// Host and port, defaulting to 25565
    pub fn host_port(&self) -> (String, u16) {
        match self.address.rsplit_once(':') {
            Some((host, port)) => match port.parse() {
                Ok(port) => (host.to_string(), port),
                Err(_) => (self.address.clone(), 25565),
            },
            None => (self.address.clone(), 25565),
        }
    }

    /// Every enabled module, depth first
    pub fn flatten_modules(&self) -> Vec<&Module> {
        fn walk<'a>(modules: &'a [Module], out: &mut Vec<&'a Module>) {
            for module in modules.iter().filter(|m| m.is_enabled()) {
                out.push(module);
                walk(&module.sub_modules, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.modules, &mut out);
        out
    }

    /// The Forge module, if this server runs Forge
    pub fn forge_module(&self) -> Option<&Module> {
        self.modules
            .iter()
            .find(|m| m.module_type == ModuleType::ForgeHosted)
    }
}

impl Module {
    /// Required modules and optional ones that are on by default
    pub fn is_enabled(&self) -> bool {
        match self.required {
            None => true,
            Some(req) => req.value || req.def,
        }
    }

    pub fn maven(&self) -> Option<MavenId> {
        MavenId::parse(&self.id)
    }

    /// Where this module lives on disk
    pub fn local_path(&self, layout: &Layout, server_id: &str) -> PathBuf {
        let explicit = self.artifact.path.as_deref();
        let maven_path = || {
            self.maven()
                .map(|m| m.path())
                .unwrap_or_else(|| PathBuf::from(&self.name))
        };

        match self.module_type {
            ModuleType::VersionManifest => {
                let version = self
                    .maven()
                    .map(|m| m.version)
                    .unwrap_or_else(|| self.id.clone());
                layout
                    .versions_dir()
                    .join(&version)
                    .join(format!("{}.json", version))
            }
            ModuleType::File => layout
                .server_dir(server_id)
                .join(explicit.map(PathBuf::from).unwrap_or_else(maven_path)),
            ModuleType::ForgeMod | ModuleType::LiteMod => match explicit {
                Some(path) => layout.server_dir(server_id).join(path),
                None => layout.modstore_dir().join(maven_path()),
            },
            _ => layout
                .libraries_dir()
                .join(explicit.map(PathBuf::from).unwrap_or_else(maven_path)),
        }
    }
}

/// Loads and caches the distribution index
pub struct DistroManager {
    launcher_dir: PathBuf,
    client: reqwest::Client,
    current: Option<Distribution>,
}

impl DistroManager {
    pub fn new(launcher_dir: impl Into<PathBuf>, client: reqwest::Client) -> Self {
        Self {
            launcher_dir: launcher_dir.into(),
            client,
            current: None,
        }
    }

    /// The last successfully loaded index
    pub fn distribution(&self) -> Option<&Distribution> {
        self.current.as_ref()
    }

    fn cache_path(&self, dev_mode: bool) -> PathBuf {
        let file = if dev_mode { DEV_DISTRO_FILE } else { DISTRO_FILE };
        self.launcher_dir.join(file)
    }

    /// Fetch the index and write it to the local cache
    pub async fn pull_remote(&mut self, url: &str) -> Result<&Distribution, DistroError> {
        let distro = self.fetch_remote(url).await?;
        Ok(&*self.current.insert(distro))
    }

    /// Read the cached index from disk
    pub fn pull_local(&mut self, dev_mode: bool) -> Result<&Distribution, DistroError> {
        let distro = read_local(&self.cache_path(dev_mode))?;
        Ok(&*self.current.insert(distro))
    }

    async fn fetch_remote(&self, url: &str) -> Result<Distribution, DistroError> {
        if url.is_empty() {
            return Err(DistroError::NoRemote);
        }

        tracing::info!("Fetching distribution index from {}", url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DistroError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        let distro = Distribution::from_json(&body)?;

        write_cache(&self.cache_path(false), &body)?;
        Ok(distro)
    }

    /// Remote first, then the local copy, then whatever is already loaded
    pub async fn refresh(
        &mut self,
        remote_url: &str,
        dev_mode: bool,
    ) -> Result<&Distribution, DistroError> {
        if !dev_mode {
            match self.fetch_remote(remote_url).await {
                Ok(distro) => return Ok(&*self.current.insert(distro)),
                Err(e) => {
                    tracing::warn!(
                        "Error while fetching a fresh copy of the distribution index: {}",
                        e
                    );
                }
            }
        }

        match read_local(&self.cache_path(dev_mode)) {
            Ok(distro) => self.current = Some(distro),
            Err(e) => tracing::error!("Unable to refresh distribution index: {}", e),
        }

        self.current.as_ref().ok_or(DistroError::Unavailable)
    }
}

/// Read a distribution file
pub fn read_local(path: &Path) -> Result<Distribution, DistroError> {
    let content = std::fs::read_to_string(path).map_err(|source| DistroError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Distribution::from_json(&content)
}

fn write_cache(path: &Path, body: &str) -> Result<(), DistroError> {
    let io = |source| DistroError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(path, body).map_err(io)
}

/// Make sure the selected server exists, falling back to the main server
///
/// Returns true when the selection changed.
pub fn ensure_selected_server(config: &mut Config, distro: &Distribution) -> bool {
    let valid = config
        .launch
        .selected_server
        .as_deref()
        .is_some_and(|id| distro.get_server(id).is_some());
    if valid {
        return false;
    }

    let fallback = distro.main_server().map(|s| s.id.clone());
    tracing::info!("Selected server unavailable, switching to {:?}", fallback);
    config.launch.selected_server = fallback;
    true
}

/// Resolve the selected server or fail with a clear message
pub fn selected_server<'a>(config: &Config, distro: &'a Distribution) -> anyhow::Result<&'a Server> {
    let id = config
        .launch
        .selected_server
        .as_deref()
        .context("No server selected")?;
    distro
        .get_server(id)
        .ok_or_else(|| DistroError::ServerNotFound(id.to_string()).into())
}
