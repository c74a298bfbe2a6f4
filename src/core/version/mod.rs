//! Version management module
//!
//! Resolve and cache Minecraft version JSON.

mod details;

pub use details::*;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version manifest from Mojang
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Path of a cached version JSON inside `versions_dir`
pub fn version_json_path(versions_dir: &Path, version_id: &str) -> PathBuf {
    versions_dir
        .join(version_id)
        .join(format!("{}.json", version_id))
}

/// Path of a version's client jar inside `versions_dir`
pub fn client_jar_path(versions_dir: &Path, version_id: &str) -> PathBuf {
    versions_dir
        .join(version_id)
        .join(format!("{}.jar", version_id))
}

/// Fetch the version manifest from Mojang
pub async fn fetch_manifest(client: &reqwest::Client) -> Result<VersionManifest> {
    let response = client
        .get(VERSION_MANIFEST_URL)
        .send()
        .await
        .context("Failed to fetch version manifest")?;
    let manifest: VersionManifest = response.error_for_status()?.json().await?;
    Ok(manifest)
}

/// Get version info by ID
pub fn get_version_info<'a>(
    manifest: &'a VersionManifest,
    version_id: &str,
) -> Option<&'a VersionInfo> {
    manifest.versions.iter().find(|v| v.id == version_id)
}

/// Read a version JSON from disk
pub fn read_details(path: &Path) -> Result<VersionDetails> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read version file {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid version file {:?}", path))
}

/// Load version details, downloading them into the cache when missing
pub async fn load_details(
    client: &reqwest::Client,
    versions_dir: &Path,
    version_id: &str,
) -> Result<VersionDetails> {
    let path = version_json_path(versions_dir, version_id);

    if path.is_file() {
        match read_details(&path) {
            Ok(details) => return Ok(details),
            Err(e) => tracing::warn!("Cached version data is unusable, refetching: {:#}", e),
        }
    }

    let manifest = fetch_manifest(client).await?;
    let info = get_version_info(&manifest, version_id)
        .with_context(|| format!("Unknown Minecraft version {}", version_id))?;

    tracing::info!("Downloading version data for {}", version_id);
    let body = client
        .get(&info.url)
        .send()
        .await
        .context("Failed to fetch version data")?
        .error_for_status()?
        .text()
        .await?;
    let details: VersionDetails = serde_json::from_str(&body)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &body)?;

    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VANILLA: &str = r#"{
        "id": "1.16.5",
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main",
        "assetIndex": {"id": "1.16", "sha1": "abc", "size": 1, "totalSize": 2,
                       "url": "https://example.invalid/1.16.json"},
        "downloads": {"client": {"sha1": "def", "size": 3, "url": "https://example.invalid/client.jar"}},
        "libraries": []
    }"#;

    #[tokio::test]
    async fn test_load_details_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = version_json_path(dir.path(), "1.16.5");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, VANILLA).unwrap();

        let client = reqwest::Client::new();
        let details = load_details(&client, dir.path(), "1.16.5").await.unwrap();
        assert_eq!(details.asset_id(), "1.16");
        assert_eq!(details.client_download().unwrap().size, 3);
    }

    #[test]
    fn test_paths() {
        let versions = Path::new("/data/common/versions");
        assert_eq!(
            client_jar_path(versions, "1.16.5"),
            PathBuf::from("/data/common/versions/1.16.5/1.16.5.jar")
        );
    }
}
