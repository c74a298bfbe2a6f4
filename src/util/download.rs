//! Download utilities
//!
//! Async file downloading with progress and integrity checks.

use super::hash::{verify_md5, verify_sha1};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// One file to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub url: String,
    pub dest: PathBuf,
    /// Expected size in bytes (0 if unknown)
    pub size: u64,
    pub md5: Option<String>,
    pub sha1: Option<String>,
}

impl DownloadItem {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            size,
            md5: None,
            sha1: None,
        }
    }

    pub fn with_md5(mut self, md5: Option<String>) -> Self {
        self.md5 = md5;
        self
    }

    pub fn with_sha1(mut self, sha1: Option<String>) -> Self {
        self.sha1 = sha1;
        self
    }

    /// Whether the destination exists and matches the declared hashes
    pub fn is_valid_on_disk(&self) -> bool {
        if !self.dest.is_file() {
            return false;
        }
        if let Some(md5) = self.md5.as_deref().filter(|h| !h.is_empty()) {
            return verify_md5(&self.dest, md5).unwrap_or(false);
        }
        if let Some(sha1) = self.sha1.as_deref().filter(|h| !h.is_empty()) {
            return verify_sha1(&self.dest, sha1).unwrap_or(false);
        }
        true
    }
}

/// Coarse classification reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadErrorCode {
    /// File server unreachable
    Connect,
    /// Disk full
    NoSpace,
    Other,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Could not connect to {url}: {source}")]
    Connect { url: String, source: reqwest::Error },

    #[error("Request for {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Download failed for {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Hash mismatch for {path:?}")]
    HashMismatch { path: PathBuf },
}

impl DownloadError {
    pub fn code(&self) -> DownloadErrorCode {
        match self {
            DownloadError::Connect { .. } => DownloadErrorCode::Connect,
            DownloadError::Io { source, .. }
                if source.kind() == std::io::ErrorKind::StorageFull =>
            {
                DownloadErrorCode::NoSpace
            }
            _ => DownloadErrorCode::Other,
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> DownloadError + '_ {
    move |source| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Download a file to its destination and verify it
///
/// Returns the number of bytes written.
pub async fn download_file(
    client: &reqwest::Client,
    item: &DownloadItem,
) -> Result<u64, DownloadError> {
    let response = client.get(&item.url).send().await.map_err(|source| {
        if source.is_connect() || source.is_timeout() {
            DownloadError::Connect {
                url: item.url.clone(),
                source,
            }
        } else {
            DownloadError::Http {
                url: item.url.clone(),
                source,
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: item.url.clone(),
            status: response.status().as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(|source| DownloadError::Http {
        url: item.url.clone(),
        source,
    })?;

    if let Some(parent) = item.dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_err(parent))?;
    }
    tokio::fs::write(&item.dest, &bytes)
        .await
        .map_err(io_err(&item.dest))?;

    if !item.is_valid_on_disk() {
        let _ = tokio::fs::remove_file(&item.dest).await;
        return Err(DownloadError::HashMismatch {
            path: item.dest.clone(),
        });
    }

    Ok(bytes.len() as u64)
}

/// Download multiple files concurrently
///
/// `progress` receives the downloaded and total byte counts after each file.
pub async fn download_files<F>(
    client: &reqwest::Client,
    downloads: &[DownloadItem],
    concurrent: usize,
    progress: F,
) -> Result<(), DownloadError>
where
    F: Fn(u64, u64),
{
    let total: u64 = downloads.iter().map(|d| d.size).sum();
    let received = AtomicU64::new(0);

    stream::iter(downloads)
        .map(|item| {
            let received = &received;
            let progress = &progress;
            async move {
                let written = download_file(client, item).await?;
                // Prefer the declared size so the bar ends exactly at the total
                let counted = if item.size > 0 { item.size } else { written };
                let done = received.fetch_add(counted, Ordering::SeqCst) + counted;
                progress(done, total.max(done));
                Ok::<_, DownloadError>(())
            }
        })
        .buffer_unordered(concurrent.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_codes() {
        let full = DownloadError::Io {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::from(std::io::ErrorKind::StorageFull),
        };
        assert_eq!(full.code(), DownloadErrorCode::NoSpace);

        let denied = DownloadError::Io {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(denied.code(), DownloadErrorCode::Other);
    }

    #[test]
    fn test_is_valid_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("lib.jar");
        let item = DownloadItem::new("https://example.invalid/lib.jar", &dest, 5)
            .with_md5(Some("5d41402abc4b2a76b9719d911017c592".to_string()));

        assert!(!item.is_valid_on_disk());
        std::fs::write(&dest, b"hello").unwrap();
        assert!(item.is_valid_on_disk());
        std::fs::write(&dest, b"tampered").unwrap();
        assert!(!item.is_valid_on_disk());
    }

    #[tokio::test]
    async fn test_empty_batch_succeeds() {
        let client = reqwest::Client::new();
        download_files(&client, &[], 4, |_, _| panic!("no progress expected"))
            .await
            .unwrap();
    }
}
