//! System scan for usable Java installations

use super::{java_executable_in, validate_binary, JavaMeta};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn java_binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "javaw.exe"
    } else {
        "java"
    }
}

/// Directories holding one JVM per subdirectory
fn platform_jvm_roots() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/Library/Java/JavaVirtualMachines"),
            PathBuf::from("/opt/homebrew/opt"),
            PathBuf::from("/usr/local/opt"),
        ]
    } else if cfg!(target_os = "linux") {
        vec![PathBuf::from("/usr/lib/jvm"), PathBuf::from("/opt/java")]
    } else {
        vec![
            PathBuf::from(r"C:\Program Files\Java"),
            PathBuf::from(r"C:\Program Files\Eclipse Adoptium"),
            PathBuf::from(r"C:\Program Files\AdoptOpenJDK"),
        ]
    }
}

fn executables_under(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .flat_map(|home| {
            [
                java_executable_in(&home),
                home.join("bin").join(java_binary_name()),
                home.join("jre").join("bin").join(java_binary_name()),
            ]
        })
        .filter(|p| p.is_file())
        .collect();
    found.sort();
    found
}

/// Every candidate binary, managed runtimes first, without duplicates
pub fn candidate_paths(runtime_dir: &Path) -> Vec<PathBuf> {
    let mut candidates = executables_under(runtime_dir);

    if let Some(home) = std::env::var_os("JAVA_HOME") {
        candidates.push(PathBuf::from(home).join("bin").join(java_binary_name()));
    }

    if let Some(path) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path) {
            let exe = dir.join(java_binary_name());
            if exe.is_file() {
                candidates.push(exe);
            }
        }
    }

    for root in platform_jvm_roots() {
        candidates.extend(executables_under(&root));
    }

    let mut seen = HashSet::new();
    candidates.retain(|p| {
        let key = std::fs::canonicalize(p).unwrap_or_else(|_| p.clone());
        seen.insert(key)
    });
    candidates
}

/// Pick the best candidate: highest version wins, earlier (managed) on ties
pub fn pick_best(metas: Vec<JavaMeta>) -> Option<JavaMeta> {
    let mut best: Option<JavaMeta> = None;
    for meta in metas.into_iter().filter(|m| m.valid) {
        let better = match &best {
            None => true,
            Some(current) => meta.version > current.version,
        };
        if better {
            best = Some(meta);
        }
    }
    best
}

/// Find the best valid Java for a Minecraft version
pub fn scan(runtime_dir: &Path, mc_version: &str) -> Option<JavaMeta> {
    let metas: Vec<JavaMeta> = candidate_paths(runtime_dir)
        .iter()
        .map(|path| {
            let meta = validate_binary(path, mc_version);
            tracing::debug!(
                "Java candidate {:?}: version {:?}, valid {}",
                path,
                meta.version,
                meta.valid
            );
            meta
        })
        .collect();
    pick_best(metas)
}
