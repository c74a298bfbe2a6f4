//! Instance preparation right before the game starts

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const DEFAULT_OPTIONS: &str = include_str!("../../../assets/defaults/options.txt");
const DEFAULT_OPTIFINE_OPTIONS: &str = include_str!("../../../assets/defaults/optionsof.txt");

pub const OPTIONS_FILE: &str = "options.txt";
pub const OPTIFINE_OPTIONS_FILE: &str = "optionsof.txt";

/// Delete everything in the mods folder that is neither protected nor a distro file
///
/// Returns the removed paths.
pub fn purge_forbidden_mods(
    mods_dir: &Path,
    protected: &[String],
    distro_paths: &HashSet<PathBuf>,
) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    let Ok(entries) = std::fs::read_dir(mods_dir) else {
        return Ok(removed);
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if protected.iter().any(|p| *p == name) || distro_paths.contains(&path) {
            continue;
        }

        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        }
        .with_context(|| format!("Failed to remove {:?}", path))?;

        tracing::info!(target: "launch_suite", "Removed forbidden mod {}", name);
        removed.push(path);
    }

    Ok(removed)
}

/// How options.txt ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsOutcome {
    /// Existing (or imported) options with the server overrides applied
    Validated,
    /// Launcher defaults written
    Defaults,
}

fn resource_packs_line(packs: &[String]) -> String {
    let list = packs
        .iter()
        .map(|p| format!("\"{}\"", p.replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",");
    format!("resourcePacks:[{}]", list)
}

/// Apply the server's overrides to options.txt
///
/// `None` unless every overridden key was present.
pub fn override_options(content: &str, packs: &[String]) -> Option<String> {
    let (mut packs_on, mut music_off, mut fullscreen_off) = (false, false, false);

    let lines: Vec<String> = content
        .split('\n')
        .map(|line| {
            if line.starts_with("resourcePacks:") {
                packs_on = true;
                resource_packs_line(packs)
            } else if line.starts_with("soundCategory_music:") {
                music_off = true;
                "soundCategory_music:0.0".to_string()
            } else if line.starts_with("fullscreen:") {
                fullscreen_off = true;
                "fullscreen:false".to_string()
            } else {
                line.to_string()
            }
        })
        .collect();

    (packs_on && music_off && fullscreen_off).then(|| lines.join("\n"))
}

/// Hide capes in optionsof.txt; `None` when the key is missing
pub fn override_optifine_options(content: &str) -> Option<String> {
    let mut capes_off = false;
    let lines: Vec<&str> = content
        .split('\n')
        .map(|line| {
            if line.starts_with("ofShowCapes:") {
                capes_off = true;
                "ofShowCapes:false"
            } else {
                line
            }
        })
        .collect();

    capes_off.then(|| lines.join("\n"))
}

fn write_defaults(game_dir: &Path, packs: &[String]) -> Result<()> {
    let options = override_options(DEFAULT_OPTIONS, packs).unwrap_or_else(|| DEFAULT_OPTIONS.to_string());
    std::fs::write(game_dir.join(OPTIONS_FILE), options)?;
    std::fs::write(game_dir.join(OPTIFINE_OPTIONS_FILE), DEFAULT_OPTIFINE_OPTIONS)?;
    Ok(())
}

/// Make sure the instance has options with the server overrides applied
///
/// Missing options are imported from the vanilla game directory when possible.
pub fn ensure_options(
    game_dir: &Path,
    minecraft_dir: &Path,
    packs: &[String],
) -> Result<OptionsOutcome> {
    std::fs::create_dir_all(game_dir)?;
    let options_path = game_dir.join(OPTIONS_FILE);
    let optifine_path = game_dir.join(OPTIFINE_OPTIONS_FILE);

    if !options_path.is_file() || !optifine_path.is_file() {
        tracing::info!(target: "launch_suite", "Could not find options in instance directory.");

        let vanilla = minecraft_dir.join(OPTIONS_FILE);
        if vanilla.is_file() {
            tracing::info!(target: "launch_suite", "Importing {:?}", vanilla);
            std::fs::copy(&vanilla, &options_path)?;
            if !optifine_path.is_file() {
                let vanilla_of = minecraft_dir.join(OPTIFINE_OPTIONS_FILE);
                if vanilla_of.is_file() {
                    std::fs::copy(&vanilla_of, &optifine_path)?;
                } else {
                    std::fs::write(&optifine_path, DEFAULT_OPTIFINE_OPTIONS)?;
                }
            }
        } else {
            tracing::info!(
                target: "launch_suite",
                "Couldn't find options.txt in Minecraft or launcher instance. Launcher defaults used."
            );
            write_defaults(game_dir, packs)?;
            return Ok(OptionsOutcome::Defaults);
        }
    }

    tracing::info!(target: "launch_suite", "Validating options...");
    let options = override_options(&std::fs::read_to_string(&options_path)?, packs);
    let optifine = override_optifine_options(&std::fs::read_to_string(&optifine_path)?);

    match (options, optifine) {
        (Some(options), Some(optifine)) => {
            std::fs::write(&options_path, options)?;
            std::fs::write(&optifine_path, optifine)?;
            tracing::info!(target: "launch_suite", "Options validated.");
            Ok(OptionsOutcome::Validated)
        }
        _ => {
            write_defaults(game_dir, packs)?;
            tracing::info!(target: "launch_suite", "Couldn't validate options. Launcher defaults used.");
            Ok(OptionsOutcome::Defaults)
        }
    }
}

/// Copy shader packs the instance does not have yet from the vanilla game directory
///
/// Returns the number of packs copied.
pub fn mirror_shaders(game_dir: &Path, minecraft_dir: &Path) -> usize {
    let target = game_dir.join("shaderpacks");
    let source = minecraft_dir.join("shaderpacks");
    if !target.is_dir() || !source.is_dir() {
        return 0;
    }

    let Ok(entries) = std::fs::read_dir(&source) else {
        return 0;
    };

    let mut copied = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let dest = target.join(entry.file_name());
        if dest.exists() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match std::fs::copy(entry.path(), &dest) {
            Ok(_) => {
                tracing::info!(target: "launch_suite", "Copied shader {} to launcher instance.", name);
                copied += 1;
            }
            Err(e) => {
                tracing::warn!(target: "launch_suite", "Failed to copy shader {} to launcher instance: {}", name, e)
            }
        }
    }
    copied
}
