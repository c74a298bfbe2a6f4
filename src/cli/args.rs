//! CLI argument definitions
//!
//! Uses clap derive macros for argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SoWLauncher - Songs of War Minecraft launcher
#[derive(Parser, Debug)]
#[command(name = "sowlauncher")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate files and play on the selected server
    Launch {
        /// Only validate and download files, do not start the game
        #[arg(long)]
        no_login: bool,
    },

    /// Servers from the distribution index
    Servers {
        #[command(subcommand)]
        action: ServerAction,
    },

    /// Manage accounts
    Accounts {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Find or check a Java installation
    Java {
        #[command(subcommand)]
        action: JavaAction,
    },

    /// Player count of the selected server and Mojang service status
    Status,

    /// Latest news
    News {
        /// Mark the latest article as read
        #[arg(long)]
        dismiss: bool,
    },

    /// Background worker used by the launcher itself
    #[command(hide = true)]
    Worker {
        #[command(subcommand)]
        class: WorkerClass,
    },
}

#[derive(Subcommand, Debug)]
pub enum ServerAction {
    /// List servers
    List,
    /// Select the server to play on
    Select { id: String },
}

#[derive(Subcommand, Debug)]
pub enum AccountAction {
    /// List accounts
    List,
    /// Select an account
    Select { uuid: String },
    /// Remove an account
    Remove { uuid: String },
    /// Add an offline account
    Offline { name: String },
}

#[derive(Subcommand, Debug)]
pub enum JavaAction {
    /// Search this machine for a compatible Java
    Scan {
        /// Store the result as the configured executable
        #[arg(long)]
        save: bool,
    },
    /// Check a Java executable against the selected server
    Validate { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum WorkerClass {
    JavaGuard {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    AssetGuard {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_launch() {
        let args = Args::try_parse_from(["sowlauncher", "-v", "launch", "--no-login"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Commands::Launch { no_login: true }));
    }

    #[test]
    fn test_parse_worker() {
        let args = Args::try_parse_from([
            "sowlauncher",
            "worker",
            "asset-guard",
            "/data/common",
            "/usr/bin/java",
        ])
        .unwrap();
        let Commands::Worker {
            class: WorkerClass::AssetGuard { args },
        } = args.command
        else {
            panic!("expected the asset worker");
        };
        assert_eq!(args, vec!["/data/common", "/usr/bin/java"]);
    }

    #[test]
    fn test_parse_accounts() {
        let args = Args::try_parse_from(["sowlauncher", "accounts", "offline", "Steve"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Accounts {
                action: AccountAction::Offline { ref name }
            } if name == "Steve"
        ));
    }
}
