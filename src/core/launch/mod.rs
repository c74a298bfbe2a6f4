//! Launch module
//!
//! Prepare the instance, start Minecraft with proper arguments and follow
//! what it prints.

mod builder;
mod monitor;
mod prepare;

pub use builder::{
    FORGE_MOD_LIST, FORGE_MOD_LIST_MODERN, LAUNCHER_NAME, ProcessBuilder, classpath_separator,
    format_args_for_logs, substitute,
};
pub use monitor::{
    GameOutcome, GameSignal, MIN_LINGER, OutputClassifier, RunFlags, linger_remaining,
};
pub use prepare::{
    OPTIFINE_OPTIONS_FILE, OPTIONS_FILE, OptionsOutcome, ensure_options, mirror_shaders,
    override_optifine_options, override_options, purge_forbidden_mods,
};
