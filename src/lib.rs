//! SoWLauncher library root
//!
//! Launcher for the Songs of War Minecraft server.

pub mod config;
pub mod core;
pub mod util;

pub use config::Config;
