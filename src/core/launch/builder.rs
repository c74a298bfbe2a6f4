//! Game command line assembly

use crate::config::Config;
use crate::core::auth::AuthAccount;
use crate::core::distro::{Layout, MavenId, ModuleType, Server};
use crate::core::library::LibraryStore;
use crate::core::version::{self, ArgumentValue, VersionDetails};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::process::{Child, Command};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("placeholder pattern"));

pub const LAUNCHER_NAME: &str = "SoWLauncher";
pub const FORGE_MOD_LIST: &str = "forgeModList.json";
pub const FORGE_MOD_LIST_MODERN: &str = "forgeMods.list";

/// Platform classpath separator
pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") { ";" } else { ":" }
}

/// Builds and spawns the game process for one server
pub struct ProcessBuilder<'a> {
    server: &'a Server,
    version: &'a VersionDetails,
    forge: Option<&'a VersionDetails>,
    account: &'a AuthAccount,
    launcher_version: &'a str,
    config: &'a Config,
    layout: Layout,
    game_dir: PathBuf,
}

impl<'a> ProcessBuilder<'a> {
    pub fn new(
        server: &'a Server,
        version: &'a VersionDetails,
        forge: Option<&'a VersionDetails>,
        account: &'a AuthAccount,
        launcher_version: &'a str,
        config: &'a Config,
    ) -> Self {
        let layout = Layout::from_config(config);
        let game_dir = layout.server_dir(&server.id);
        Self {
            server,
            version,
            forge,
            account,
            launcher_version,
            config,
            layout,
            game_dir,
        }
    }

    pub fn game_dir(&self) -> &Path {
        &self.game_dir
    }

    pub fn natives_dir(&self) -> PathBuf {
        self.game_dir.join("natives")
    }

    fn assets_dir(&self) -> PathBuf {
        self.layout.common_dir.join("assets")
    }

    /// Modern (1.13+) versions describe arguments as JSON arrays
    fn is_modern(&self) -> bool {
        self.version.arguments.is_some()
    }

    fn main_class(&self) -> &str {
        self.forge
            .map(|f| f.main_class.as_str())
            .unwrap_or(&self.version.main_class)
    }

    /// Classpath entries in launch order
    ///
    /// Version libraries come first and distro library modules replace entries
    /// with the same version-less id. The client jar is always last.
    pub fn classpath_entries(&self) -> Vec<PathBuf> {
        let store = LibraryStore::new(self.layout.libraries_dir());
        let mut entries: Vec<(String, PathBuf)> = Vec::new();

        let mut put = |key: String, path: PathBuf| {
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = path,
                None => entries.push((key, path)),
            }
        };

        for (key, path) in store.classpath_entries(&self.version.libraries) {
            put(key, path);
        }
        if let Some(forge) = self.forge {
            for (key, path) in store.classpath_entries(&forge.libraries) {
                put(key, path);
            }
        }
        for module in self
            .server
            .flatten_modules()
            .into_iter()
            .filter(|m| m.module_type.is_library())
        {
            let key = module
                .maven()
                .map(|id| id.versionless_key())
                .unwrap_or_else(|| module.id.clone());
            put(key, module.local_path(&self.layout, &self.server.id));
        }

        let mut classpath: Vec<PathBuf> = entries.into_iter().map(|(_, path)| path).collect();
        classpath.push(version::client_jar_path(
            &self.layout.versions_dir(),
            &self.version.id,
        ));
        classpath
    }

    pub fn classpath(&self) -> String {
        self.classpath_entries()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(classpath_separator())
    }

    fn features(&self) -> HashMap<String, bool> {
        HashMap::from([
            ("is_demo_user".to_string(), false),
            (
                "has_custom_resolution".to_string(),
                !self.config.game.fullscreen,
            ),
        ])
    }

    fn placeholders(&self, classpath: &str) -> HashMap<&'static str, String> {
        let path = |p: PathBuf| p.to_string_lossy().into_owned();
        HashMap::from([
            ("auth_player_name", self.account.display_name.clone()),
            ("auth_uuid", self.account.uuid.clone()),
            ("auth_access_token", self.account.access_token.clone()),
            ("user_type", self.account.account_type.user_type().to_string()),
            ("user_properties", "{}".to_string()),
            ("version_name", self.version.id.clone()),
            (
                "version_type",
                self.version
                    .version_type
                    .clone()
                    .unwrap_or_else(|| "release".to_string()),
            ),
            ("game_directory", path(self.game_dir.clone())),
            ("assets_root", path(self.assets_dir())),
            ("assets_index_name", self.version.asset_id().to_string()),
            (
                "resolution_width",
                self.config.game.resolution_width.to_string(),
            ),
            (
                "resolution_height",
                self.config.game.resolution_height.to_string(),
            ),
            ("natives_directory", path(self.natives_dir())),
            ("library_directory", path(self.layout.libraries_dir())),
            ("launcher_name", LAUNCHER_NAME.to_string()),
            ("launcher_version", self.launcher_version.to_string()),
            ("classpath", classpath.to_string()),
            ("classpath_separator", classpath_separator().to_string()),
        ])
    }

    fn memory_args(&self, args: &mut Vec<String>) {
        if cfg!(target_os = "macos") {
            args.push(format!("-Xdock:name={}", LAUNCHER_NAME));
        }
        args.push(format!("-Xmx{}", self.config.java.max_memory));
        args.push(format!("-Xms{}", self.config.java.min_memory));
        args.extend(self.config.java.extra_args.iter().cloned());
    }

    fn logging_arg(&self) -> Option<String> {
        let logging = self.version.client_logging()?;
        let file = self
            .assets_dir()
            .join("log_configs")
            .join(&logging.file.id);
        file.is_file().then(|| {
            logging
                .argument
                .replace("${path}", &file.to_string_lossy())
        })
    }

    fn jvm_args(&self) -> Vec<String> {
        let features = self.features();
        let mut args = Vec::new();

        if self.is_modern() {
            let declared = self
                .version
                .arguments
                .iter()
                .chain(self.forge.and_then(|f| f.arguments.as_ref()))
                .flat_map(|a| a.jvm.iter());
            args.extend(resolve_all(declared, &features));
            if args.is_empty() {
                args.extend(
                    ["-Djava.library.path=${natives_directory}", "-cp", "${classpath}"]
                        .map(String::from),
                );
            }
        } else {
            args.extend(["-cp", "${classpath}"].map(String::from));
        }

        self.memory_args(&mut args);
        if !self.is_modern() {
            args.push("-Djava.library.path=${natives_directory}".to_string());
        }
        args.extend(self.logging_arg());
        args
    }

    fn game_args(&self) -> Vec<String> {
        let mut args: Vec<String> = if self.is_modern() {
            let declared = self
                .version
                .arguments
                .iter()
                .chain(self.forge.and_then(|f| f.arguments.as_ref()))
                .flat_map(|a| a.game.iter());
            resolve_all(declared, &self.features())
        } else {
            self.forge
                .and_then(|f| f.minecraft_arguments.as_deref())
                .or(self.version.minecraft_arguments.as_deref())
                .unwrap_or_default()
                .split_whitespace()
                .map(String::from)
                .collect()
        };

        if self.config.game.fullscreen {
            args.extend(["--fullscreen", "true"].map(String::from));
        } else if !self.is_modern() {
            args.extend(
                [
                    "--width",
                    "${resolution_width}",
                    "--height",
                    "${resolution_height}",
                ]
                .map(String::from),
            );
        }

        if self.server.autoconnect {
            let (host, port) = self.server.host_port();
            tracing::info!(target: "launch_suite", "Autoconnecting to {}:{}", host, port);
            args.extend(["--server".to_string(), host, "--port".to_string(), port.to_string()]);
        }

        args.extend(self.mod_list_args());
        args
    }

    /// Forge mods loaded from the shared mod store
    fn store_mod_ids(&self) -> Vec<String> {
        self.server
            .flatten_modules()
            .into_iter()
            .filter(|m| m.module_type == ModuleType::ForgeMod && m.artifact.path.is_none())
            .map(|m| extensionless_id(&m.id))
            .collect()
    }

    fn mod_list_path(&self) -> PathBuf {
        let file = if self.is_modern() {
            FORGE_MOD_LIST_MODERN
        } else {
            FORGE_MOD_LIST
        };
        self.game_dir.join(file)
    }

    fn mod_list_args(&self) -> Vec<String> {
        if self.forge.is_none() || self.store_mod_ids().is_empty() {
            return Vec::new();
        }
        let list = self.mod_list_path().to_string_lossy().into_owned();
        if self.is_modern() {
            vec![
                "--fml.mavenRoots".to_string(),
                self.layout.modstore_dir().to_string_lossy().into_owned(),
                "--fml.modLists".to_string(),
                list,
            ]
        } else {
            vec!["--modListFile".to_string(), format!("absolute:{}", list)]
        }
    }

    /// Write the mod list Forge reads the store mods from
    pub fn write_mod_list(&self) -> Result<()> {
        let ids = self.store_mod_ids();
        if self.forge.is_none() || ids.is_empty() {
            return Ok(());
        }

        let content = if self.is_modern() {
            ids.join("\n")
        } else {
            let list = serde_json::json!({
                "repositoryRoot": format!("absolute:{}", self.layout.modstore_dir().to_string_lossy()),
                "modRef": ids,
            });
            serde_json::to_string_pretty(&list)?
        };

        let path = self.mod_list_path();
        std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))
    }

    /// Full argument list: JVM arguments, main class, game arguments
    pub fn build_args(&self) -> Vec<String> {
        let classpath = self.classpath();
        let values = self.placeholders(&classpath);

        let mut args = substitute(self.jvm_args(), &values);
        args.push(self.main_class().to_string());
        args.extend(substitute(self.game_args(), &values));
        args
    }

    /// Extract natives, write the mod list and start the game
    pub fn spawn(&self) -> Result<Child> {
        let java = self
            .config
            .java
            .executable
            .as_ref()
            .context("No Java executable configured")?;

        std::fs::create_dir_all(&self.game_dir)?;
        let store = LibraryStore::new(self.layout.libraries_dir());
        let natives = self.natives_dir();
        store.extract_natives(&self.version.libraries, &natives)?;
        self.write_mod_list()?;

        let args = self.build_args();
        tracing::info!(
            target: "launch_suite",
            "Launch Arguments: {}",
            format_args_for_logs(&args, &self.account.access_token)
        );

        let mut command = Command::new(java);
        command
            .args(&args)
            .current_dir(&self.game_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        configure_native_library_env(&mut command, &natives);

        command.spawn().context("Failed to start the game process")
    }
}

fn resolve_all<'v>(
    declared: impl Iterator<Item = &'v ArgumentValue>,
    features: &HashMap<String, bool>,
) -> Vec<String> {
    declared.flat_map(|arg| arg.resolve(features)).collect()
}

/// `group:artifact:version[:classifier]` without the `@extension`
fn extensionless_id(id: &str) -> String {
    match MavenId::parse(id) {
        Some(m) => match m.classifier {
            Some(c) => format!("{}:{}:{}:{}", m.group, m.artifact, m.version, c),
            None => format!("{}:{}:{}", m.group, m.artifact, m.version),
        },
        None => id.split('@').next().unwrap_or(id).to_string(),
    }
}

/// Replace `${name}` placeholders
///
/// Arguments with an unknown placeholder are dropped along with the option
/// that precedes them.
pub fn substitute(args: Vec<String>, values: &HashMap<&'static str, String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(args.len());

    for arg in args {
        let unresolved = PLACEHOLDER
            .captures_iter(&arg)
            .any(|c| !values.contains_key(&c[1]));
        if unresolved {
            tracing::debug!(target: "launch_suite", "Dropping unresolved argument {}", arg);
            drop_dangling_option(&mut out);
            continue;
        }

        let resolved = PLACEHOLDER.replace_all(&arg, |c: &regex::Captures| {
            values.get(&c[1]).cloned().unwrap_or_default()
        });
        out.push(resolved.into_owned());
    }

    out
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        args.pop();
    }
}

fn configure_native_library_env(command: &mut Command, natives_dir: &Path) {
    let var = if cfg!(target_os = "windows") {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    };
    let separator = if cfg!(target_os = "windows") { ";" } else { ":" };
    let natives = natives_dir.to_string_lossy();

    let value = match std::env::var(var) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", natives, separator, existing)
        }
        _ => natives.into_owned(),
    };
    command.env(var, value);
}

/// Arguments joined for the log with the access token masked
pub fn format_args_for_logs(args: &[String], access_token: &str) -> String {
    args.iter()
        .map(|arg| {
            if !access_token.is_empty() && arg.contains(access_token) {
                "**********".to_string()
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::offline_account;
    use crate::core::distro::tests::sample;

    const LEGACY_VERSION: &str = r#"{
        "id": "1.12.2",
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main",
        "minecraftArguments": "--username ${auth_player_name} --version ${version_name} --gameDir ${game_directory} --assetsDir ${assets_root} --assetIndex ${assets_index_name} --uuid ${auth_uuid} --accessToken ${auth_access_token} --userType ${user_type} --clientId ${clientid}",
        "assetIndex": {"id": "1.12", "sha1": "abc", "size": 1, "url": "https://x/1.12.json"},
        "libraries": [
            {"name": "org.ow2.asm:asm:5.0.3"},
            {"name": "com.mojang:realms:1.10.22"}
        ]
    }"#;

    const MODERN_VERSION: &str = r#"{
        "id": "1.16.5",
        "mainClass": "net.minecraft.client.main.Main",
        "arguments": {
            "game": [
                "--username", "${auth_player_name}",
                "--gameDir", "${game_directory}",
                {"rules": [{"action": "allow", "features": {"is_demo_user": true}}], "value": "--demo"},
                {"rules": [{"action": "allow", "features": {"has_custom_resolution": true}}],
                 "value": ["--width", "${resolution_width}", "--height", "${resolution_height}"]}
            ],
            "jvm": [
                "-Djava.library.path=${natives_directory}",
                "-Dminecraft.launcher.brand=${launcher_name}",
                "-cp", "${classpath}"
            ]
        },
        "libraries": [
            {"name": "org.ow2.asm:asm:7.2"},
            {"name": "com.mojang:brigadier:1.0.17"}
        ]
    }"#;

    const FORGE_VERSION: &str = r#"{
        "id": "1.16.5-forge-36.2.20",
        "mainClass": "cpw.mods.modlauncher.Launcher",
        "arguments": {
            "game": ["--launchTarget", "fmlclient", "--fml.forgeVersion", "36.2.20"]
        },
        "libraries": [
            {"name": "cpw.mods:modlauncher:8.0.9",
             "downloads": {"artifact": {"path": "cpw/mods/modlauncher/8.0.9/modlauncher-8.0.9.jar", "url": "https://maven.example/modlauncher.jar"}}}
        ]
    }"#;

    fn details(json: &str) -> VersionDetails {
        serde_json::from_str(json).unwrap()
    }

    fn config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.launcher_dir = dir.to_path_buf();
        config
    }

    fn position(args: &[String], value: &str) -> usize {
        args.iter().position(|a| a == value).unwrap()
    }

    #[test]
    fn test_substitute_drops_unresolved_with_flag() {
        let values = HashMap::from([("auth_player_name", "Steve".to_string())]);
        let args = ["--username", "${auth_player_name}", "--clientId", "${clientid}", "--demo"]
            .map(String::from)
            .to_vec();
        assert_eq!(
            substitute(args, &values),
            vec!["--username", "Steve", "--demo"]
        );
    }

    #[test]
    fn test_legacy_args() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let distro = sample();
        let server = distro.get_server("sow-test").unwrap();
        let version = details(LEGACY_VERSION);
        let account = offline_account("Steve");

        let builder = ProcessBuilder::new(server, &version, None, &account, "1.0.0", &config);
        let args = builder.build_args();

        assert_eq!(args[0], "-cp");
        assert!(args.contains(&"-Xmx4G".to_string()));
        let main = position(&args, "net.minecraft.client.main.Main");
        assert!(args[main - 1].starts_with("-Djava.library.path="));
        assert!(args[main - 1].ends_with("natives"));

        assert_eq!(args[position(&args, "--username") + 1], "Steve");
        assert_eq!(args[position(&args, "--assetIndex") + 1], "1.12");
        assert_eq!(args[position(&args, "--userType") + 1], "legacy");
        assert_eq!(args[position(&args, "--width") + 1], "1280");
        // Unknown placeholder removed together with its flag
        assert!(!args.iter().any(|a| a == "--clientId" || a.contains("${")));
        // Not an autoconnect server
        assert!(!args.contains(&"--server".to_string()));
    }

    #[test]
    fn test_modern_args_with_forge() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.game.fullscreen = true;
        let distro = sample();
        let server = distro.get_server("sow-main").unwrap();
        let version = details(MODERN_VERSION);
        let forge = details(FORGE_VERSION);
        let account = offline_account("Alex");

        let builder =
            ProcessBuilder::new(server, &version, Some(&forge), &account, "1.0.0", &config);
        let args = builder.build_args();

        assert!(args.contains(&"-Dminecraft.launcher.brand=SoWLauncher".to_string()));
        let main = position(&args, "cpw.mods.modlauncher.Launcher");
        assert!(main > position(&args, "-cp"));
        assert!(main < position(&args, "--username"));
        assert!(position(&args, "--launchTarget") > position(&args, "--gameDir"));

        // Fullscreen disables the custom resolution feature
        assert!(!args.contains(&"--width".to_string()));
        assert_eq!(args[position(&args, "--fullscreen") + 1], "true");
        assert!(!args.contains(&"--demo".to_string()));

        assert_eq!(args[position(&args, "--server") + 1], "play.songs-of-war.com");
        assert_eq!(args[position(&args, "--port") + 1], "25570");

        let roots = position(&args, "--fml.mavenRoots");
        assert!(args[roots + 1].ends_with("modstore"));
        assert!(args[position(&args, "--fml.modLists") + 1].ends_with(FORGE_MOD_LIST_MODERN));
    }

    #[test]
    fn test_classpath_distro_wins_and_client_last() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let distro = sample();
        let server = distro.get_server("sow-main").unwrap();
        let version = details(MODERN_VERSION);
        let forge = details(FORGE_VERSION);
        let account = offline_account("Alex");

        let builder =
            ProcessBuilder::new(server, &version, Some(&forge), &account, "1.0.0", &config);
        let entries = builder.classpath_entries();
        let libraries = config.common_dir().join("libraries");

        // asm 7.2 replaced in place by the distro's 9.1
        assert_eq!(entries[0], libraries.join("org/ow2/asm/asm/9.1/asm-9.1.jar"));
        assert!(entries.contains(&libraries.join("cpw/mods/modlauncher/8.0.9/modlauncher-8.0.9.jar")));
        assert!(!entries.iter().any(|p| p.ends_with("asm-7.2.jar")));
        assert_eq!(
            entries.last().unwrap(),
            &config.common_dir().join("versions/1.16.5/1.16.5.jar")
        );
        // Mods never land on the classpath
        assert!(!entries.iter().any(|p| p.to_string_lossy().contains("modstore")));
    }

    #[test]
    fn test_write_mod_list() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let distro = sample();
        let server = distro.get_server("sow-main").unwrap();
        let account = offline_account("Alex");

        // Legacy Forge reads a JSON list
        let version = details(LEGACY_VERSION);
        let mut forge = details(FORGE_VERSION);
        forge.arguments = None;
        let builder =
            ProcessBuilder::new(server, &version, Some(&forge), &account, "1.0.0", &config);
        std::fs::create_dir_all(builder.game_dir()).unwrap();
        builder.write_mod_list().unwrap();

        let written: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(builder.game_dir().join(FORGE_MOD_LIST)).unwrap(),
        )
        .unwrap();
        assert_eq!(written["modRef"], serde_json::json!(["com.sow:sowcore:1.2.0"]));
        assert!(written["repositoryRoot"].as_str().unwrap().starts_with("absolute:"));

        let args = builder.build_args();
        assert!(args[position(&args, "--modListFile") + 1].starts_with("absolute:"));
    }

    #[test]
    fn test_no_mod_list_without_forge() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let distro = sample();
        let server = distro.get_server("sow-main").unwrap();
        let version = details(MODERN_VERSION);
        let account = offline_account("Alex");

        let builder = ProcessBuilder::new(server, &version, None, &account, "1.0.0", &config);
        builder.write_mod_list().unwrap();
        assert!(!builder.game_dir().join(FORGE_MOD_LIST_MODERN).exists());
        assert!(!builder.build_args().contains(&"--fml.modLists".to_string()));
    }

    #[test]
    fn test_format_args_masks_token() {
        let args = ["--accessToken", "secret-token", "--username", "Steve"].map(String::from);
        assert_eq!(
            format_args_for_logs(&args, "secret-token"),
            "--accessToken ********** --username Steve"
        );
        assert_eq!(format_args_for_logs(&args, ""), args.join(" "));
    }
}
