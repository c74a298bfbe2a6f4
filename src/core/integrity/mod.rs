//! Mods folder integrity
//!
//! While the game runs, every change inside the server's mods folder is
//! checked against the distribution.

use crate::core::distro::{Layout, Server};
use crate::util::hash;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// Verdict on one changed path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Unknown jar, or a distro file whose hash no longer matches
    Tampered,
    /// Distro file still matching (or without a declared hash)
    Intact,
    /// Not a jar and not a distro file
    Ignored,
}

/// Distro files expected in a server's mods folder
#[derive(Debug, Clone, Default)]
pub struct ModManifest {
    files: HashMap<PathBuf, Option<String>>,
}

impl ModManifest {
    pub fn for_server(server: &Server, layout: &Layout) -> Self {
        let mods_dir = layout.mods_dir(&server.id);
        let files = server
            .flatten_modules()
            .into_iter()
            .map(|m| (m.local_path(layout, &server.id), m.artifact.md5.clone()))
            .filter(|(path, _)| path.starts_with(&mods_dir))
            .collect();
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn inspect(&self, path: &Path) -> Verdict {
        let Some(expected) = self.files.get(path) else {
            let is_jar = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"));
            return if is_jar {
                Verdict::Tampered
            } else {
                Verdict::Ignored
            };
        };

        let Some(expected) = expected else {
            return Verdict::Intact;
        };
        if !path.is_file() {
            return Verdict::Intact;
        }

        match hash::md5_file(path) {
            Ok(actual) if actual.eq_ignore_ascii_case(expected) => Verdict::Intact,
            Ok(actual) => {
                tracing::warn!(
                    target: "landing",
                    "Hash mismatch for {:?}: {} on disk, {} in distribution",
                    path,
                    actual,
                    expected
                );
                Verdict::Tampered
            }
            Err(e) => {
                tracing::warn!(target: "landing", "Could not hash {:?}: {}", path, e);
                Verdict::Intact
            }
        }
    }
}

/// Forward changed paths below `mods_dir`
///
/// The watcher stops when the returned handle is dropped. Linux watches the
/// top level only.
pub fn watch(mods_dir: &Path, tx: UnboundedSender<PathBuf>) -> notify::Result<RecommendedWatcher> {
    // `notify` runs callbacks in its own thread.
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
        }
        Err(e) => tracing::warn!(target: "landing", "Mods watcher error: {}", e),
    })?;

    let mode = if cfg!(target_os = "linux") {
        RecursiveMode::NonRecursive
    } else {
        RecursiveMode::Recursive
    };
    watcher.watch(mods_dir, mode)?;
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::distro::tests::sample;
    use std::time::Duration;

    fn manifest(dir: &Path) -> (ModManifest, Layout) {
        let layout = Layout {
            common_dir: dir.join("common"),
            instance_dir: dir.join("instances"),
        };
        let distro = sample();
        let server = distro.get_server("sow-main").unwrap();
        (ModManifest::for_server(server, &layout), layout)
    }

    #[test]
    fn test_manifest_only_covers_mods_folder() {
        let dir = tempfile::tempdir().unwrap();
        let (manifest, _) = manifest(dir.path());
        // OptiFine is the only module placed in the mods folder
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let (manifest, layout) = manifest(dir.path());
        let mods = layout.mods_dir("sow-main");
        std::fs::create_dir_all(&mods).unwrap();

        let optifine = mods.join("OptiFine.jar");
        // md5("bar")
        std::fs::write(&optifine, b"bar").unwrap();
        assert_eq!(manifest.inspect(&optifine), Verdict::Intact);

        std::fs::write(&optifine, b"patched").unwrap();
        assert_eq!(manifest.inspect(&optifine), Verdict::Tampered);

        // Removal of a known file is not a hash mismatch
        std::fs::remove_file(&optifine).unwrap();
        assert_eq!(manifest.inspect(&optifine), Verdict::Intact);

        assert_eq!(manifest.inspect(&mods.join("xray.jar")), Verdict::Tampered);
        assert_eq!(manifest.inspect(&mods.join("notes.txt")), Verdict::Ignored);
    }

    #[test]
    fn test_upper_case_md5_matches() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("OptiFine.jar");
        std::fs::write(&jar, b"bar").unwrap();
        let manifest = ModManifest {
            files: HashMap::from([(
                jar.clone(),
                Some("37B51D194A7513E45B56F6524F2D51F2".to_string()),
            )]),
        };

        assert_eq!(manifest.inspect(&jar), Verdict::Intact);
    }

    #[tokio::test]
    async fn test_watch_reports_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _watcher = watch(dir.path(), tx).unwrap();

        let jar = dir.path().join("injected.jar");
        std::fs::write(&jar, b"evil").unwrap();

        let path = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path.file_name(), jar.file_name());
    }
}
