//! Version details
//!
//! Version JSON as published by Mojang and by Forge's version manifest.

use crate::core::distro::MavenId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Detailed version information from version JSON
///
/// Forge manifests only carry the fields they override, so everything but
/// `id` and `mainClass` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDetails {
    pub id: String,

    #[serde(rename = "type", default)]
    pub version_type: Option<String>,

    pub main_class: String,

    /// Legacy argument format (pre-1.13)
    #[serde(default)]
    pub minecraft_arguments: Option<String>,

    /// Modern argument format (1.13+)
    #[serde(default)]
    pub arguments: Option<Arguments>,

    #[serde(default)]
    pub libraries: Vec<Library>,

    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,

    /// Legacy asset id
    #[serde(default)]
    pub assets: Option<String>,

    #[serde(default)]
    pub downloads: Option<Downloads>,

    #[serde(default)]
    pub logging: Option<Logging>,

    #[serde(default)]
    pub inherits_from: Option<String>,
}

impl VersionDetails {
    /// Asset index id (`assetIndex.id`, or the legacy `assets` field)
    pub fn asset_id(&self) -> &str {
        self.asset_index
            .as_ref()
            .map(|a| a.id.as_str())
            .or(self.assets.as_deref())
            .unwrap_or("legacy")
    }

    pub fn client_download(&self) -> Option<&DownloadInfo> {
        self.downloads.as_ref().and_then(|d| d.client.as_ref())
    }

    pub fn client_logging(&self) -> Option<&LoggingClient> {
        self.logging.as_ref().and_then(|l| l.client.as_ref())
    }
}

/// Modern argument structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgumentValue>,
    #[serde(default)]
    pub jvm: Vec<ArgumentValue>,
}

/// Argument can be a simple string or a conditional object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Simple(String),
    Conditional(ConditionalArgument),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalArgument {
    pub rules: Vec<Rule>,
    pub value: StringOrVec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrVec {
    Single(String),
    Multiple(Vec<String>),
}

impl StringOrVec {
    pub fn values(&self) -> Vec<String> {
        match self {
            StringOrVec::Single(s) => vec![s.clone()],
            StringOrVec::Multiple(v) => v.clone(),
        }
    }
}

impl ArgumentValue {
    /// Values this argument contributes under the given feature flags
    pub fn resolve(&self, features: &HashMap<String, bool>) -> Vec<String> {
        match self {
            ArgumentValue::Simple(s) => vec![s.clone()],
            ArgumentValue::Conditional(c) => {
                if rules_allow(&c.rules, features) {
                    c.value.values()
                } else {
                    Vec::new()
                }
            }
        }
    }
}

/// Library dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub name: String,

    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,

    /// Repository base for libraries without downloads section
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub rules: Option<Vec<Rule>>,

    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,

    #[serde(default)]
    pub extract: Option<ExtractRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<Artifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, Artifact>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRule {
    pub exclude: Option<Vec<String>>,
}

/// Rule for conditional inclusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub action: String,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsRule {
    pub name: Option<String>,
    pub version: Option<String>,
    pub arch: Option<String>,
}

/// Asset index information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub sha1: String,
    pub size: u64,
    pub total_size: Option<u64>,
    pub url: String,
}

/// Download information for client/server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Downloads {
    pub client: Option<DownloadInfo>,
    pub server: Option<DownloadInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

/// Log4j configuration shipped with the version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub client: Option<LoggingClient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingClient {
    pub argument: String,
    pub file: LoggingFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingFile {
    pub id: String,
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

// === Rule evaluation ===

/// Mojang rule semantics: the last matching rule decides, default deny
pub fn rules_allow(rules: &[Rule], features: &HashMap<String, bool>) -> bool {
    let mut allowed = false;
    for rule in rules {
        if rule.matches(features) {
            allowed = rule.action == "allow";
        }
    }
    allowed
}

impl Rule {
    fn matches(&self, features: &HashMap<String, bool>) -> bool {
        let os_matches = self.os.as_ref().is_none_or(|os| os.matches_current());
        let features_match = self.features.as_ref().is_none_or(|wanted| {
            wanted
                .iter()
                .all(|(name, value)| features.get(name).copied().unwrap_or(false) == *value)
        });
        os_matches && features_match
    }
}

pub fn current_os() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

impl OsRule {
    /// Check if current OS matches the rule
    pub fn matches_current(&self) -> bool {
        if let Some(ref name) = self.name {
            if name != current_os() {
                return false;
            }
        }

        if let Some(ref arch) = self.arch {
            let current_arch = if cfg!(target_arch = "x86_64") {
                "x64"
            } else if cfg!(target_arch = "x86") {
                "x86"
            } else if cfg!(target_arch = "aarch64") {
                "arm64"
            } else {
                "unknown"
            };

            if arch != current_arch {
                return false;
            }
        }

        true
    }
}

impl Library {
    /// Check if library should be included based on rules
    pub fn should_include(&self) -> bool {
        match &self.rules {
            None => true,
            Some(rules) => rules_allow(rules, &HashMap::new()),
        }
    }

    pub fn maven_id(&self) -> Option<MavenId> {
        MavenId::parse(&self.name)
    }

    /// Get the native classifier for current OS
    pub fn native_classifier(&self) -> Option<String> {
        let natives = self.natives.as_ref()?;
        let arch = if cfg!(target_pointer_width = "64") {
            "64"
        } else {
            "32"
        };
        natives
            .get(current_os())
            .map(|s| s.replace("${arch}", arch))
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.downloads.as_ref().and_then(|d| d.artifact.as_ref())
    }

    pub fn native_artifact(&self) -> Option<&Artifact> {
        let classifier = self.native_classifier()?;
        self.downloads
            .as_ref()
            .and_then(|d| d.classifiers.as_ref())
            .and_then(|c| c.get(&classifier))
    }

    /// Repository-relative path of the main jar
    pub fn relative_path(&self) -> Option<String> {
        if let Some(artifact) = self.artifact() {
            return Some(artifact.path.clone());
        }
        self.maven_id()
            .map(|id| id.path().to_string_lossy().replace('\\', "/"))
    }

    /// Download URL of the main jar
    ///
    /// Artifacts declared with an empty url are built locally and have none.
    pub fn download_url(&self) -> Option<String> {
        if let Some(artifact) = self.artifact() {
            return Some(artifact.url.clone()).filter(|url| !url.is_empty());
        }
        let base = self
            .url
            .as_deref()
            .unwrap_or("https://libraries.minecraft.net/");
        let path = self.relative_path()?;
        Some(format!("{}/{}", base.trim_end_matches('/'), path))
    }
}

/// Asset index containing all game assets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    /// Path of this asset below the objects directory
    pub fn relative_path(&self) -> String {
        let prefix = self.hash.get(..2).unwrap_or_default();
        format!("{}/{}", prefix, &self.hash)
    }

    pub fn url(&self) -> String {
        format!(
            "https://resources.download.minecraft.net/{}",
            self.relative_path()
        )
    }
}
