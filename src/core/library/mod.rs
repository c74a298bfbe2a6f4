//! Library management
//!
//! Validate Minecraft libraries, resolve classpath entries and extract natives.

use crate::core::version::Library;
use crate::util::download::DownloadItem;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// The `libraries` directory of the common dir
pub struct LibraryStore {
    libraries_dir: PathBuf,
}

impl LibraryStore {
    pub fn new(libraries_dir: impl Into<PathBuf>) -> Self {
        Self {
            libraries_dir: libraries_dir.into(),
        }
    }

    /// Get the path to a library JAR
    pub fn library_path(&self, library: &Library) -> Option<PathBuf> {
        library.relative_path().map(|p| self.libraries_dir.join(p))
    }

    /// Get the path to a native library JAR
    pub fn native_path(&self, library: &Library) -> Option<PathBuf> {
        library
            .native_artifact()
            .map(|a| self.libraries_dir.join(&a.path))
    }

    /// Libraries and natives that are absent or fail their SHA-1
    pub fn missing_libraries(&self, libraries: &[Library]) -> Vec<DownloadItem> {
        let mut missing = Vec::new();

        for lib in libraries.iter().filter(|lib| lib.should_include()) {
            // Main artifact
            if let (Some(path), Some(url)) = (self.library_path(lib), lib.download_url()) {
                let (size, sha1) = lib
                    .artifact()
                    .map(|a| (a.size, a.sha1.clone()))
                    .unwrap_or_default();
                let item = DownloadItem::new(url, path, size)
                    .with_sha1(Some(sha1).filter(|s| !s.is_empty()));
                if !item.is_valid_on_disk() {
                    missing.push(item);
                }
            }

            // Native classifier
            if let Some(native) = lib.native_artifact() {
                let item = DownloadItem::new(
                    &native.url,
                    self.libraries_dir.join(&native.path),
                    native.size,
                )
                .with_sha1(Some(native.sha1.clone()).filter(|s| !s.is_empty()));
                if !item.is_valid_on_disk() {
                    missing.push(item);
                }
            }
        }

        missing
    }

    /// Classpath entries keyed by version-less maven id
    pub fn classpath_entries(&self, libraries: &[Library]) -> Vec<(String, PathBuf)> {
        libraries
            .iter()
            .filter(|lib| lib.should_include() && lib.natives.is_none())
            .filter_map(|lib| {
                let key = lib
                    .maven_id()
                    .map(|id| id.versionless_key())
                    .unwrap_or_else(|| lib.name.clone());
                self.library_path(lib).map(|p| (key, p))
            })
            .collect()
    }

    /// Extract native libraries to a directory
    pub fn extract_natives(&self, libraries: &[Library], natives_dir: &Path) -> Result<()> {
        // Clean and recreate natives directory
        if natives_dir.exists() {
            std::fs::remove_dir_all(natives_dir)?;
        }
        std::fs::create_dir_all(natives_dir)?;

        let mut count = 0;
        for lib in libraries.iter().filter(|l| l.should_include()) {
            if let Some(native_path) = self.native_path(lib) {
                if native_path.is_file() {
                    count += extract_native_jar(&native_path, natives_dir, lib)?;
                }
            }
        }

        tracing::debug!("Extracted {} native files to {:?}", count, natives_dir);
        Ok(())
    }
}

/// Extract a native JAR, flattening library files to the root
fn extract_native_jar(jar_path: &Path, natives_dir: &Path, lib: &Library) -> Result<usize> {
    let file = std::fs::File::open(jar_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let excludes = lib
        .extract
        .as_ref()
        .and_then(|e| e.exclude.as_deref())
        .unwrap_or(&[]);

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        if entry.is_dir()
            || name.starts_with("META-INF")
            || excludes.iter().any(|e| name.starts_with(e))
        {
            continue;
        }

        let is_native = [".dylib", ".dll", ".so", ".jnilib"]
            .iter()
            .any(|ext| name.ends_with(ext));
        if !is_native {
            continue;
        }

        let Some(file_name) = Path::new(&name).file_name() else {
            continue;
        };
        let mut outfile = std::fs::File::create(natives_dir.join(file_name))?;
        std::io::copy(&mut entry, &mut outfile)?;
        count += 1;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::current_os;
    use std::io::Write;

    fn library(json: &str) -> Library {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_classpath_entries_skip_natives() {
        let store = LibraryStore::new("/libs");
        let libs = vec![
            library(r#"{"name": "org.ow2.asm:asm:9.1"}"#),
            library(r#"{"name": "org.lwjgl:lwjgl-platform:2.9.4", "natives": {"linux": "natives-linux"}}"#),
        ];
        let entries = store.classpath_entries(&libs);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "org.ow2.asm:asm");
        assert_eq!(
            entries[0].1,
            PathBuf::from("/libs/org/ow2/asm/asm/9.1/asm-9.1.jar")
        );
    }

    #[test]
    fn test_missing_libraries() {
        let dir = tempfile::tempdir().unwrap();
        let store = LibraryStore::new(dir.path());
        let libs = vec![
            library(r#"{"name": "org.ow2.asm:asm:9.1"}"#),
            library(
                r#"{"name": "net.minecraftforge:forge:1.16.5-36.2.20:client",
                    "downloads": {"artifact": {"path": "net/minecraftforge/forge/client.jar", "url": ""}}}"#,
            ),
        ];

        let missing = store.missing_libraries(&libs);
        assert_eq!(missing.len(), 1);
        assert_eq!(
            missing[0].url,
            "https://libraries.minecraft.net/org/ow2/asm/asm/9.1/asm-9.1.jar"
        );

        let path = dir.path().join("org/ow2/asm/asm/9.1/asm-9.1.jar");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"jar").unwrap();
        assert!(store.missing_libraries(&libs).is_empty());
    }

    #[test]
    fn test_extract_natives() {
        let dir = tempfile::tempdir().unwrap();
        let store = LibraryStore::new(dir.path().join("libs"));

        let jar = dir.path().join("libs/lwjgl-natives.jar");
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        {
            let file = std::fs::File::create(&jar).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("linux/x64/liblwjgl.so", options).unwrap();
            zip.write_all(b"elf").unwrap();
            zip.start_file("META-INF/MANIFEST.MF", options).unwrap();
            zip.write_all(b"manifest").unwrap();
            zip.finish().unwrap();
        }

        let json = format!(
            r#"{{"name": "org.lwjgl:lwjgl-platform:2.9.4",
                "natives": {{"{os}": "natives-{os}"}},
                "downloads": {{"classifiers": {{"natives-{os}": {{"path": "lwjgl-natives.jar", "url": "", "sha1": "", "size": 3}}}}}}}}"#,
            os = current_os()
        );
        let natives_dir = dir.path().join("natives");
        store
            .extract_natives(&[library(&json)], &natives_dir)
            .unwrap();

        assert!(natives_dir.join("liblwjgl.so").is_file());
        assert!(!natives_dir.join("MANIFEST.MF").exists());
    }
}
