// Java Runtime Guard
// Finds, validates and installs the Java runtime the game needs

mod scan;

pub use scan::{candidate_paths, scan};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Adoptium API base URL
const ADOPTIUM_API: &str = "https://api.adoptium.net/v3";

/// Java version requirements for Minecraft
#[derive(Debug, Clone, Copy)]
pub struct JavaRequirement {
    pub major_version: u32,
    pub mc_version_pattern: &'static str,
}

/// Known Java requirements for Minecraft versions
pub const JAVA_REQUIREMENTS: &[JavaRequirement] = &[
    // Minecraft 1.21+ requires Java 21
    JavaRequirement {
        major_version: 21,
        mc_version_pattern: "1.21",
    },
    // Minecraft 1.17-1.20 requires Java 17
    JavaRequirement {
        major_version: 17,
        mc_version_pattern: "1.20",
    },
    JavaRequirement {
        major_version: 17,
        mc_version_pattern: "1.19",
    },
    JavaRequirement {
        major_version: 17,
        mc_version_pattern: "1.18",
    },
    JavaRequirement {
        major_version: 17,
        mc_version_pattern: "1.17",
    },
];

/// Get the required Java major version for a Minecraft version
pub fn required_major(mc_version: &str) -> u32 {
    for req in JAVA_REQUIREMENTS {
        if mc_version.starts_with(req.mc_version_pattern) {
            return req.major_version;
        }
    }
    // Everything older runs on Java 8
    8
}

/// Parsed `java.version`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JavaVersion {
    pub major: u32,
    pub minor: u32,
    /// Update number (`_312` in `1.8.0_312`, patch otherwise)
    pub update: u32,
}

impl PartialOrd for JavaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JavaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.update).cmp(&(other.major, other.minor, other.update))
    }
}

impl std::fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.major == 8 {
            write!(f, "8u{}", self.update)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.update)
        }
    }
}

/// Parse version strings like `1.8.0_312`, `17.0.2`, `21` or `16.0.1+9`
pub fn parse_java_version(version: &str) -> Option<JavaVersion> {
    let version = version.trim().trim_matches('"');
    let version = version.split(['+', '-', ' ']).next()?;

    if let Some(legacy) = version.strip_prefix("1.") {
        // 1.8.0_312
        let (main, update) = match legacy.split_once('_') {
            Some((main, update)) => (main, update.parse().ok()?),
            None => (legacy, 0),
        };
        let mut parts = main.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
        return Some(JavaVersion {
            major,
            minor,
            update,
        });
    }

    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    let update = parts.next().map(str::parse).transpose().ok()?.unwrap_or(0);
    Some(JavaVersion {
        major,
        minor,
        update,
    })
}

/// Result of inspecting a Java binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaMeta {
    pub exec_path: PathBuf,
    pub version: Option<JavaVersion>,
    pub arch64: bool,
    pub valid: bool,
}

/// Whether a version satisfies the game's requirement
///
/// Java 8 games need exactly Java 8; newer games accept newer runtimes.
pub fn satisfies(version: &JavaVersion, required: u32) -> bool {
    if required == 8 {
        version.major == 8
    } else {
        version.major >= required
    }
}

/// Interpret the output of `java -XshowSettings:properties -version`
pub fn parse_properties(exec_path: &Path, output: &str, required: u32) -> JavaMeta {
    let mut version = None;
    let mut arch64 = false;

    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once(" = ") else {
            continue;
        };
        match key.trim() {
            "java.version" => version = parse_java_version(value),
            "sun.arch.data.model" => arch64 = value.trim() == "64",
            "os.arch" if !arch64 => {
                arch64 = matches!(value.trim(), "amd64" | "x86_64" | "aarch64")
            }
            _ => {}
        }
    }

    let valid = arch64 && version.as_ref().is_some_and(|v| satisfies(v, required));
    JavaMeta {
        exec_path: exec_path.to_path_buf(),
        version,
        arch64,
        valid,
    }
}

/// Run a Java binary and check it can launch the given Minecraft version
pub fn validate_binary(exec_path: &Path, mc_version: &str) -> JavaMeta {
    let required = required_major(mc_version);

    if !exec_path.is_file() {
        return JavaMeta {
            exec_path: exec_path.to_path_buf(),
            version: None,
            arch64: false,
            valid: false,
        };
    }

    match Command::new(exec_path)
        .args(["-XshowSettings:properties", "-version"])
        .output()
    {
        Ok(output) => {
            // Properties are printed on stderr
            let text = String::from_utf8_lossy(&output.stderr);
            parse_properties(exec_path, &text, required)
        }
        Err(e) => {
            tracing::debug!("Failed to run {:?}: {}", exec_path, e);
            JavaMeta {
                exec_path: exec_path.to_path_buf(),
                version: None,
                arch64: false,
                valid: false,
            }
        }
    }
}

/// Platform name used by the Adoptium API
fn adoptium_os() -> &'static str {
    if cfg!(target_os = "macos") {
        "mac"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "windows"
    }
}

fn adoptium_arch() -> &'static str {
    if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else {
        "x64"
    }
}

/// Assets API URL for the latest JRE of a major version
pub fn adoptium_assets_url(major: u32) -> String {
    format!(
        "{}/assets/latest/{}/hotspot?vendor=eclipse&os={}&architecture={}&image_type=jre",
        ADOPTIUM_API,
        major,
        adoptium_os(),
        adoptium_arch()
    )
}

#[derive(Debug, Deserialize)]
struct AdoptiumRelease {
    binary: AdoptiumBinary,
    release_name: String,
}

#[derive(Debug, Deserialize)]
struct AdoptiumBinary {
    package: AdoptiumPackage,
}

#[derive(Debug, Deserialize)]
struct AdoptiumPackage {
    link: String,
    name: String,
    size: u64,
}

/// A downloadable JRE archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JrePackage {
    pub url: String,
    pub file_name: String,
    pub size: u64,
    pub release_name: String,
}

/// Resolve the JRE archive to download for a major version
pub async fn adoptium_package(client: &reqwest::Client, major: u32) -> Result<JrePackage> {
    let response = client
        .get(adoptium_assets_url(major))
        .send()
        .await
        .context("Failed to query Adoptium")?;

    if !response.status().is_success() {
        anyhow::bail!("Adoptium API error: HTTP {}", response.status());
    }

    let releases: Vec<AdoptiumRelease> = response
        .json()
        .await
        .context("Failed to parse Adoptium response")?;
    let release = releases
        .into_iter()
        .next()
        .with_context(|| format!("No Java {} release available", major))?;

    Ok(JrePackage {
        url: release.binary.package.link,
        file_name: release.binary.package.name,
        size: release.binary.package.size,
        release_name: release.release_name,
    })
}

/// Path of the java executable inside a runtime home
pub fn java_executable_in(java_home: &Path) -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        java_home.join("bin").join("javaw.exe")
    }
    #[cfg(target_os = "macos")]
    {
        // macOS JRE has Contents/Home structure
        java_home
            .join("Contents")
            .join("Home")
            .join("bin")
            .join("java")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        java_home.join("bin").join("java")
    }
}

/// Extract a downloaded JRE archive into `runtime_dir`
///
/// Returns the java executable of the extracted runtime.
pub fn extract_archive(archive_path: &Path, runtime_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(runtime_dir)?;

    let top_level = if archive_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        extract_zip(archive_path, runtime_dir)?
    } else {
        extract_tar(archive_path, runtime_dir)?
    };

    let java_home = runtime_dir.join(top_level);
    let java_exe = java_executable_in(&java_home);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(&java_exe) {
            let mut perms = meta.permissions();
            perms.set_mode(perms.mode() | 0o755);
            let _ = std::fs::set_permissions(&java_exe, perms);
        }
    }

    // Clean up
    let _ = std::fs::remove_file(archive_path);

    if !java_exe.exists() {
        anyhow::bail!("Java installation failed: executable not found");
    }
    Ok(java_exe)
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<String> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut top_level = None;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        if top_level.is_none() {
            top_level = relative
                .components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned());
        }

        let path = dest.join(&relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&path)?;
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = std::fs::File::create(&path)?;
            std::io::copy(&mut entry, &mut outfile)?;
        }
    }

    top_level.context("Java archive is empty")
}

fn extract_tar(archive_path: &Path, dest: &Path) -> Result<String> {
    // List first to learn the top-level directory name
    let listing = Command::new("tar")
        .arg("-tzf")
        .arg(archive_path)
        .output()
        .context("Failed to list Java archive")?;
    if !listing.status.success() {
        anyhow::bail!(
            "Failed to read Java archive: {}",
            String::from_utf8_lossy(&listing.stderr)
        );
    }
    let top_level = String::from_utf8_lossy(&listing.stdout)
        .lines()
        .next()
        .and_then(|line| line.trim_start_matches("./").split('/').next())
        .map(str::to_string)
        .context("Java archive is empty")?;

    let output = Command::new("tar")
        .arg("-xzf")
        .arg(archive_path)
        .arg("-C")
        .arg(dest)
        .output()
        .context("Failed to extract Java archive")?;

    if !output.status.success() {
        anyhow::bail!(
            "Failed to extract Java: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(top_level)
}
