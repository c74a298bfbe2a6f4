//! CLI module
//!
//! Command-line interface for SoWLauncher.

mod args;

pub use args::{AccountAction, Args, Commands, JavaAction, ServerAction, WorkerClass};

use crate::config::{self, Config};
use crate::core::assetexec::{GuardClass, run_worker};
use crate::core::auth::{self, AccountType};
use crate::core::distro::{self, DistroManager, Distribution};
use crate::core::java;
use crate::core::landing::{ConsoleView, Landing};
use crate::core::news;
use crate::core::status;
use crate::util::http_client;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

const PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Dispatch a parsed command
pub async fn run(command: Commands) -> Result<()> {
    if let Commands::Worker { class } = command {
        return worker(class).await;
    }

    let mut config = config::load()?;
    match command {
        Commands::Launch { no_login } => launch(config, !no_login).await,
        Commands::Servers { action } => match action {
            ServerAction::List => list_servers(&mut config).await,
            ServerAction::Select { id } => select_server(&mut config, &id).await,
        },
        Commands::Accounts { action } => match action {
            AccountAction::List => list_accounts(&config),
            AccountAction::Select { uuid } => select_account(&mut config, &uuid),
            AccountAction::Remove { uuid } => remove_account(&mut config, &uuid),
            AccountAction::Offline { name } => add_offline_account(&mut config, &name),
        },
        Commands::Java { action } => match action {
            JavaAction::Scan { save } => scan_java(&mut config, save).await,
            JavaAction::Validate { path } => validate_java(&mut config, &path).await,
        },
        Commands::Status => show_status(&mut config).await,
        Commands::News { dismiss } => show_news(&mut config, dismiss).await,
        Commands::Worker { .. } => Ok(()),
    }
}

async fn worker(class: WorkerClass) -> Result<()> {
    match class {
        WorkerClass::JavaGuard { args } => run_worker(GuardClass::JavaGuard, args).await,
        WorkerClass::AssetGuard { args } => run_worker(GuardClass::AssetGuard, args).await,
    }
}

/// Press the launch button
async fn launch(config: Config, login: bool) -> Result<()> {
    let view = ConsoleView::new(config.java.compatibility_mode);
    let mut landing = Landing::new(config, view)?;

    println!("🚀 Launching SoWLauncher {}", crate::core::landing::LAUNCHER_VERSION);
    println!(
        "   Account: {}",
        auth::account_label(auth::selected_account(&landing.config().accounts))
    );
    landing.launch_button(login).await
}

/// Load the distribution index and make sure a server is selected
async fn distribution(config: &mut Config) -> Result<Distribution> {
    let client = http_client(config.network.timeout_seconds)?;
    let mut manager = DistroManager::new(config.launcher_dir.clone(), client);
    let distro = manager
        .refresh(&config.network.distribution_url, config.general.dev_mode)
        .await?
        .clone();

    if distro::ensure_selected_server(config, &distro) {
        config::save(config)?;
    }
    Ok(distro)
}

async fn list_servers(config: &mut Config) -> Result<()> {
    let distro = distribution(config).await?;

    println!("🌍 Servers ({}):", distro.servers.len());
    for server in &distro.servers {
        let selected = if config.launch.selected_server.as_deref() == Some(&server.id) {
            " ✓ selected"
        } else {
            ""
        };
        println!(
            "   {} - {} (Minecraft {}, modpack {}){}",
            server.id, server.name, server.minecraft_version, server.version, selected
        );
        if !server.description.is_empty() {
            println!("     {}", server.description);
        }
    }
    Ok(())
}

async fn select_server(config: &mut Config, id: &str) -> Result<()> {
    let distro = distribution(config).await?;
    let server = distro
        .get_server(id)
        .with_context(|| format!("Server '{}' not found", id))?;

    config.launch.selected_server = Some(server.id.clone());
    config::save(config)?;
    println!("✅ Selected server: {}", server.name);
    Ok(())
}

fn list_accounts(config: &Config) -> Result<()> {
    let accounts = &config.accounts.entries;
    if accounts.is_empty() {
        println!("👤 No accounts linked.");
        println!("   Use 'sowlauncher accounts offline <name>' to add an offline account.");
        return Ok(());
    }

    println!("👤 Accounts ({}):", accounts.len());
    for account in accounts.values() {
        let active = if config.accounts.selected.as_deref() == Some(&account.uuid) {
            " ✓ active"
        } else {
            ""
        };
        let acc_type = match account.account_type {
            AccountType::Microsoft => "🔐 Microsoft",
            AccountType::Mojang => "🔐 Mojang",
            AccountType::Offline => "👤 Offline",
        };
        println!(
            "   {} {} ({}){}",
            acc_type, account.display_name, account.uuid, active
        );
    }
    Ok(())
}

fn select_account(config: &mut Config, uuid: &str) -> Result<()> {
    let name = auth::set_selected(&mut config.accounts, uuid)?
        .display_name
        .clone();
    config::save(config)?;
    println!("✅ Selected account: {}", name);
    Ok(())
}

fn remove_account(config: &mut Config, uuid: &str) -> Result<()> {
    let removed = auth::remove_account(&mut config.accounts, uuid)?;
    config::save(config)?;
    println!("✅ Removed account: {}", removed.display_name);
    println!(
        "   Selected: {}",
        auth::account_label(auth::selected_account(&config.accounts))
    );
    Ok(())
}

fn add_offline_account(config: &mut Config, name: &str) -> Result<()> {
    let account = auth::offline_account(name);
    let uuid = account.uuid.clone();
    auth::add_account(&mut config.accounts, account);
    config::save(config)?;

    println!("✅ Added offline account: {}", name);
    println!("   UUID: {}", uuid);
    println!("   Note: Offline accounts cannot join the Songs of War servers.");
    Ok(())
}

async fn scan_java(config: &mut Config, save: bool) -> Result<()> {
    let distro = distribution(config).await?;
    let mc_version = distro::selected_server(config, &distro)?
        .minecraft_version
        .clone();
    let runtime_dir = config.runtime_dir();

    println!(
        "☕ Looking for Java {} (Minecraft {})...",
        java::required_major(&mc_version),
        mc_version
    );
    let version = mc_version.clone();
    let found = tokio::task::spawn_blocking(move || java::scan(&runtime_dir, &version)).await?;

    let Some(meta) = found else {
        println!("❌ No compatible Java installation found.");
        println!("   Run 'sowlauncher launch' to install one.");
        return Ok(());
    };

    let version = meta.version.map(|v| v.to_string()).unwrap_or_default();
    println!("✅ Found Java {} at {}", version, meta.exec_path.display());
    if save {
        config.java.executable = Some(meta.exec_path);
        config::save(config)?;
        println!("   Saved as the launcher's Java.");
    }
    Ok(())
}

async fn validate_java(config: &mut Config, path: &Path) -> Result<()> {
    let distro = distribution(config).await?;
    let mc_version = distro::selected_server(config, &distro)?
        .minecraft_version
        .clone();

    let exe = path.to_path_buf();
    let meta = tokio::task::spawn_blocking(move || java::validate_binary(&exe, &mc_version)).await?;

    match (meta.valid, meta.version) {
        (true, Some(version)) => println!("✅ Java {} (64-bit) is compatible", version),
        (false, Some(version)) => println!(
            "❌ Java {}{} is not compatible",
            version,
            if meta.arch64 { "" } else { " (32-bit)" }
        ),
        (_, None) => println!("❌ {} is not a working Java executable", path.display()),
    }
    Ok(())
}

async fn show_status(config: &mut Config) -> Result<()> {
    let distro = distribution(config).await?;
    let server = distro::selected_server(config, &distro)?;
    let (host, port) = server.host_port();

    let server_status = status::server_status(&host, port, PING_TIMEOUT).await;
    println!("🌍 {} ({}:{})", server.name, host, port);
    println!("   {}", status::player_label(&server_status));

    let client = http_client(config.network.timeout_seconds)?;
    let services = status::fetch_services(&client, &config.network.status_url).await;
    println!();
    println!("📡 Mojang services: {}", status::overall_status(&services));
    for service in &services {
        let essential = if service.essential { " (essential)" } else { "" };
        println!(
            "   {:<7} {}{}",
            service.status.to_string(),
            service.name,
            essential
        );
    }
    Ok(())
}

async fn show_news(config: &mut Config, dismiss: bool) -> Result<()> {
    let distro = distribution(config).await?;
    let Some(feed) = distro.rss.as_deref().filter(|url| !url.is_empty()) else {
        println!("📰 No news feed configured.");
        return Ok(());
    };

    let client = http_client(config.network.timeout_seconds)?;
    let articles = match news::load_news(&client, feed).await {
        Ok(articles) => articles,
        Err(e) => {
            tracing::warn!(target: "landing", "Error loading news: {:#}", e);
            println!("📰 Failed to Load News");
            println!("   We couldn't connect to the server. Check your connection and try again.");
            return Ok(());
        }
    };

    let check = news::evaluate(&config.news, &articles);
    if let Some(cache) = check.cache {
        config.news = cache;
    }

    let Some(latest) = articles.first() else {
        config::save(config)?;
        println!("📰 No news.");
        return Ok(());
    };

    let marker = if check.alert { " 🔔 new" } else { "" };
    println!("📰 {}{}", latest.title, marker);
    println!("   {} by {} - {}", latest.date, latest.author, latest.comments);
    println!("   {}", latest.link);
    if articles.len() > 1 {
        println!("   ({} more articles)", articles.len() - 1);
    }

    if dismiss {
        config.news.dismissed = true;
        println!("   Marked as read.");
    }
    config::save(config)?;
    Ok(())
}
