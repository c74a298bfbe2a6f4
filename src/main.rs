//! SoWLauncher - Songs of War Minecraft launcher
//!
//! Entry point for the CLI and the worker processes.

mod cli;
mod config;
mod core;
mod util;

use clap::Parser;
use cli::{Args, Commands};
use std::fs::File;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let worker = matches!(args.command, Commands::Worker { .. });
    init_logging(args.verbose, worker);

    cli::run(args.command).await
}

fn init_logging(verbose: bool, worker: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Worker stdout carries the IPC messages
    if worker {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return;
    }

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let file_layer = open_log_file().map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_filter(console_level))
        .with(file_layer)
        .init();
}

/// `latest.log`, uploaded by error reports
fn open_log_file() -> Option<File> {
    let dir = config::launcher_dir();
    let path = dir.join("latest.log");
    let opened = std::fs::create_dir_all(&dir).and_then(|_| File::create(&path));
    match opened {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Cannot write {}: {}", path.display(), e);
            None
        }
    }
}
