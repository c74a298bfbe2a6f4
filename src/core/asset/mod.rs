//! Asset management
//!
//! Validate Minecraft assets and queue the missing ones.

use crate::core::version::{AssetIndex, AssetIndexInfo, AssetObject};
use crate::util::download::DownloadItem;
use crate::util::hash::verify_sha1;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The `assets` directory of the common dir
pub struct AssetStore {
    assets_dir: PathBuf,
}

impl AssetStore {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.assets_dir.join("indexes")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.assets_dir.join("objects")
    }

    pub fn index_path(&self, id: &str) -> PathBuf {
        self.indexes_dir().join(format!("{}.json", id))
    }

    pub fn object_path(&self, object: &AssetObject) -> PathBuf {
        self.objects_dir().join(object.relative_path())
    }

    /// Load the asset index, downloading it when missing or stale
    pub async fn load_index(
        &self,
        client: &reqwest::Client,
        info: &AssetIndexInfo,
    ) -> Result<AssetIndex> {
        let index_path = self.index_path(&info.id);

        if index_path.is_file() && verify_sha1(&index_path, &info.sha1).unwrap_or(false) {
            let content = std::fs::read_to_string(&index_path)?;
            return Ok(serde_json::from_str(&content)?);
        }

        tracing::info!("Downloading asset index: {}", info.id);
        let content = client
            .get(&info.url)
            .send()
            .await
            .context("Failed to download asset index")?
            .error_for_status()?
            .text()
            .await?;

        std::fs::create_dir_all(self.indexes_dir())?;
        std::fs::write(&index_path, &content)?;

        Ok(serde_json::from_str(&content)?)
    }

    /// Check every object, reporting `(checked, total)` after each one
    pub fn missing_objects<F>(&self, index: &AssetIndex, mut progress: F) -> Vec<DownloadItem>
    where
        F: FnMut(usize, usize),
    {
        let total = index.objects.len();
        let mut missing = Vec::new();

        for (checked, object) in index.objects.values().enumerate() {
            let path = self.object_path(object);
            if !path.is_file() || !verify_sha1(&path, &object.hash).unwrap_or(false) {
                missing.push(
                    DownloadItem::new(object.url(), path, object.size)
                        .with_sha1(Some(object.hash.clone())),
                );
            }
            progress(checked + 1, total);
        }

        missing
    }
}
