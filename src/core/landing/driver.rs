//! Launch drivers
//!
//! Async glue between the view, the worker processes and the game.

use super::dispatch::{DotTicker, LaunchSuite, ScanStep, SuiteStep, SystemScan};
use super::view::LaunchView;
use crate::config::{self, Config};
use crate::core::assetexec::{
    AssetExec, Function, GuardClass, ProtocolError, RelayTarget, WorkerEvent, WorkerRequest,
};
use crate::core::auth::{self, HttpValidator, ValidationOutcome};
use crate::core::distro::{self, DistroManager, Layout, Server};
use crate::core::integrity::{self, ModManifest, Verdict};
use crate::core::java;
use crate::core::launch::{
    self, GameOutcome, GameSignal, OutputClassifier, ProcessBuilder, RunFlags, linger_remaining,
};
use crate::core::report;
use crate::core::version::VersionDetails;
use crate::util::http_client;
use anyhow::Result;
use std::collections::HashSet;
use notify::RecommendedWatcher;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::Child;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, Interval, interval, sleep_until, timeout};

pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

const LAUNCH_ERROR_TITLE: &str = "Error During Launch";
const DISTRO_ERROR_TITLE: &str = "Fatal Error";
const DISTRO_ERROR_DESC: &str = "Could not load a copy of the distribution index.";
const MAINTENANCE_TITLE: &str = "Server in maintenance";
const MAINTENANCE_DESC: &str =
    "Our data server is currently in maintenance. Likely because of an update, please try again later.";
const NO_ACCOUNT: &str = "You must be logged into an account.";

/// Time given to the game's pipes after it exited
const OUTPUT_DRAIN: Duration = Duration::from_secs(2);

enum Pumped {
    Event(WorkerEvent),
    Tick,
    Closed,
}

/// Next worker event, or a ticker frame while `ticking`
async fn next_event(aex: &mut AssetExec, ticker: &mut Interval, ticking: bool) -> Pumped {
    loop {
        let received = tokio::select! {
            received = aex.recv() => received,
            _ = ticker.tick(), if ticking => return Pumped::Tick,
        };
        match received {
            Ok(Some(event)) => return Pumped::Event(event),
            Ok(None) => return Pumped::Closed,
            Err(ProtocolError::Decode { line, source }) => {
                tracing::warn!(target: "landing", "Skipping worker line {:?}: {}", line, source);
            }
            Err(e) => {
                tracing::error!(target: "landing", "Lost the worker: {}", e);
                return Pumped::Closed;
            }
        }
    }
}

async fn next_line<R: AsyncBufRead + Unpin>(lines: &mut Option<Lines<R>>) -> Option<String> {
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

/// Signals collected from a running game
struct GameSession {
    classifier: OutputClassifier,
    started: Instant,
    loaded: bool,
    /// When the progress area may be hidden
    linger: Option<Instant>,
    flags: RunFlags,
}

impl GameSession {
    fn new(server_joined_pattern: &str) -> Self {
        Self {
            classifier: OutputClassifier::new(server_joined_pattern),
            started: Instant::now(),
            loaded: false,
            linger: None,
            flags: RunFlags::default(),
        }
    }

    fn on_line(&mut self, line: &str) {
        let Some(signal) = self.classifier.classify_line(line) else {
            return;
        };
        match signal {
            GameSignal::LaunchComplete => {
                if !self.loaded {
                    self.loaded = true;
                    self.linger = Some(Instant::now() + linger_remaining(self.started.elapsed()));
                }
            }
            GameSignal::JoinedServer => tracing::info!(target: "landing", "Joined the server"),
            GameSignal::MainMenu => tracing::info!(target: "landing", "Game reached the main menu"),
            GameSignal::MissingLaunchWrapper => {
                tracing::error!(
                    target: "launch_suite",
                    "Game launch failed, LaunchWrapper was not downloaded properly."
                );
                self.flags.record(signal);
            }
            GameSignal::OutOfMemory | GameSignal::OpenGlUnavailable => {
                tracing::error!(target: "launch_suite", "Game reported {:?}", signal);
                self.flags.record(signal);
            }
        }
    }
}

enum GameTick {
    Stdout(Option<String>),
    Stderr(Option<String>),
    Edit(Option<PathBuf>),
    Linger,
    Exit(ExitStatus),
}

/// The landing screen's launch flow
pub struct Landing<V: LaunchView> {
    config: Config,
    client: reqwest::Client,
    distro: DistroManager,
    view: V,
    game_running: bool,
}

impl<V: LaunchView> Landing<V> {
    pub fn new(config: Config, view: V) -> Result<Self> {
        let client = http_client(config.network.timeout_seconds)?;
        let distro = DistroManager::new(config.launcher_dir.clone(), client.clone());
        Ok(Self {
            config,
            client,
            distro,
            view,
            game_running: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// The launch button: validate the configured Java, scan when there is none
    pub async fn launch_button(&mut self, login: bool) -> Result<()> {
        tracing::info!(target: "landing", "Launching game..");
        let Some(server) = self.load_server(false).await? else {
            return Ok(());
        };
        let mc_version = server.minecraft_version;

        let Some(exe) = self.config.java.executable.clone() else {
            return self.system_scan(&mc_version, true, login).await;
        };

        self.view.set_launch_details("Please wait..");
        self.view.toggle_launch_area(true);
        self.view.set_launch_percentage(0.0, 100.0, None);

        let version = mc_version.clone();
        let meta = tokio::task::spawn_blocking(move || java::validate_binary(&exe, &version)).await?;
        if meta.valid {
            self.dl_async(login).await
        } else {
            tracing::warn!(target: "landing", "Configured Java {:?} is not usable", meta.exec_path);
            self.system_scan(&mc_version, true, login).await
        }
    }

    /// Look for a compatible Java, offering to install one
    pub async fn system_scan(&mut self, mc_version: &str, launch_after: bool, login: bool) -> Result<()> {
        loop {
            self.view.set_launch_details("Please wait..");
            self.view.toggle_launch_area(true);
            self.view.set_launch_percentage(0.0, 100.0, None);

            let mut aex = AssetExec::fork(
                GuardClass::JavaGuard,
                &[mc_version.to_string()],
                &self.config.launcher_dir,
                RelayTarget::SysAex,
            )?;
            let mut scan = SystemScan::new(
                self.config.java.compatibility_mode,
                self.config.data_dir(),
                self.config.common_dir(),
                java::required_major(mc_version),
            );

            self.view.set_launch_details("Checking system info..");
            aex.send(&scan.start()).await?;

            let mut ticker = interval(DotTicker::INTERVAL);
            let step = loop {
                match next_event(&mut aex, &mut ticker, scan.ticking()).await {
                    Pumped::Tick => scan.tick(&mut self.view),
                    Pumped::Closed => {
                        tracing::warn!(target: "landing", "Java worker exited before finishing");
                        self.view.toggle_launch_area(false);
                        break ScanStep::Abort;
                    }
                    Pumped::Event(event) => match scan.handle(&mut self.view, event) {
                        ScanStep::Continue => {}
                        ScanStep::Send(requests) => {
                            for request in &requests {
                                aex.send(request).await?;
                            }
                        }
                        step => break step,
                    },
                }
            };

            aex.disconnect().await;
            let status = aex.wait().await?;
            if !status.success() {
                tracing::warn!(target: "landing", "Java worker exited with {}", status);
            }

            match step {
                ScanStep::Rescan => continue,
                ScanStep::Found(exe) => {
                    tracing::info!(target: "landing", "Using Java {:?}", exe);
                    self.config.java.executable = Some(exe);
                    config::save(&self.config)?;
                    if launch_after {
                        return self.dl_async(login).await;
                    }
                    self.view.toggle_launch_area(false);
                    return Ok(());
                }
                _ => return Ok(()),
            }
        }
    }

    /// Validate and download everything, then start the game when `login` is set
    pub async fn dl_async(&mut self, login: bool) -> Result<()> {
        self.view.set_launch_details("Validating Token...");
        self.view.toggle_launch_area(true);
        if !self.validate_account().await? {
            return Ok(());
        }

        if login && auth::selected_account(&self.config.accounts).is_none() {
            tracing::error!(target: "landing", "{}", NO_ACCOUNT);
            self.view.show_launch_failure("Not logged in", NO_ACCOUNT);
            self.view.toggle_launch_area(false);
            return Ok(());
        }

        if self.game_running {
            self.view.set_launch_enabled(false);
            self.view.toggle_launch_area(false);
            return Ok(());
        }

        self.view.set_launch_details("Please wait..");
        self.view.toggle_launch_area(true);
        self.view.set_launch_percentage(0.0, 100.0, None);

        let java = self
            .config
            .java
            .executable
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let args = [self.config.common_dir().to_string_lossy().into_owned(), java];
        let mut aex = match AssetExec::fork(
            GuardClass::AssetGuard,
            &args,
            &self.config.launcher_dir,
            RelayTarget::Aex,
        ) {
            Ok(aex) => aex,
            Err(e) => {
                tracing::error!(target: "launch_suite", "Error during launch: {:#}", e);
                self.report(LAUNCH_ERROR_TITLE, "").await;
                return Ok(());
            }
        };

        self.view.set_launch_details("Loading server information..");
        let Some(server) = self.load_server(true).await? else {
            aex.disconnect().await;
            aex.wait().await?;
            return Ok(());
        };

        aex.send(&WorkerRequest::execute(Function::ValidateEverything {
            server_id: server.id.clone(),
            dev_mode: self.config.general.dev_mode,
        }))
        .await?;

        let mut suite = LaunchSuite::new();
        let mut ticker = interval(DotTicker::INTERVAL);
        let end = loop {
            match next_event(&mut aex, &mut ticker, suite.ticking()).await {
                Pumped::Tick => suite.tick(&mut self.view),
                Pumped::Closed => break None,
                Pumped::Event(event) => match suite.handle(&mut self.view, event) {
                    SuiteStep::Continue => {}
                    step => break Some(step),
                },
            }
        };

        aex.disconnect().await;
        let status = aex.wait().await?;

        match end {
            Some(SuiteStep::Validated { version, forge }) => {
                if login {
                    self.launch_game(&server, &version, forge.as_deref()).await?;
                } else {
                    self.view.set_launch_details("Files validated");
                    self.view.toggle_launch_area(false);
                }
            }
            Some(SuiteStep::Report { title }) => self.report(title, "").await,
            Some(_) => self.view.toggle_launch_area(false),
            None => {
                tracing::error!(
                    target: "launch_suite",
                    "AssetExec exited with code {}, assuming error.",
                    status.code().unwrap_or(-1)
                );
                self.report(LAUNCH_ERROR_TITLE, "").await;
            }
        }

        self.view.set_launch_enabled(true);
        Ok(())
    }

    /// False when the selected account had to be dropped
    async fn validate_account(&mut self) -> Result<bool> {
        let validator = HttpValidator::new(self.client.clone());
        match auth::validate_selected(&mut self.config.accounts, &validator).await {
            ValidationOutcome::Invalid {
                display_name,
                remaining,
            } => {
                config::save(&self.config)?;
                let another = if remaining > 0 {
                    "select another account or "
                } else {
                    ""
                };
                self.view.show_launch_failure(
                    "Failed to Refresh Login",
                    &format!(
                        "We were unable to refresh the login for {}. Please {}login again.",
                        display_name, another
                    ),
                );
                self.view.toggle_launch_area(false);
                Ok(false)
            }
            ValidationOutcome::Unverified => {
                tracing::warn!(target: "landing", "Could not reach the auth service, keeping the account");
                Ok(true)
            }
            ValidationOutcome::Valid | ValidationOutcome::NoAccount => Ok(true),
        }
    }

    /// The selected server, pulling the index first when asked or when none is loaded
    async fn load_server(&mut self, refresh: bool) -> Result<Option<Server>> {
        if refresh || self.distro.distribution().is_none() {
            if let Err(e) = self
                .distro
                .refresh(&self.config.network.distribution_url, self.config.general.dev_mode)
                .await
            {
                tracing::error!(target: "landing", "{}", e);
                self.view.show_launch_failure(DISTRO_ERROR_TITLE, DISTRO_ERROR_DESC);
                self.view.toggle_launch_area(false);
                return Ok(None);
            }
        }
        let Some(distribution) = self.distro.distribution() else {
            return Ok(None);
        };

        if distro::ensure_selected_server(&mut self.config, distribution) {
            config::save(&self.config)?;
        }
        match distro::selected_server(&self.config, distribution) {
            Ok(server) => Ok(Some(server.clone())),
            Err(e) => {
                tracing::error!(target: "landing", "{:#}", e);
                self.view.show_launch_failure(DISTRO_ERROR_TITLE, &e.to_string());
                self.view.toggle_launch_area(false);
                Ok(None)
            }
        }
    }

    /// Upload the log and tell the player how to get help
    async fn report(&mut self, title: &str, lead: &str) {
        self.view.set_launch_details("Please wait...");
        let outcome = report::report_log(
            &self.client,
            &self.config.network.report_url,
            &self.config.log_path(),
        )
        .await;
        self.view
            .show_launch_failure(title, &report::report_failure_text(lead, &outcome));
        self.view.toggle_launch_area(false);
    }

    /// Prepare the instance, start the game and follow it until it exits
    async fn launch_game(
        &mut self,
        server: &Server,
        version: &VersionDetails,
        forge: Option<&VersionDetails>,
    ) -> Result<()> {
        let Some(account) = auth::selected_account(&self.config.accounts).cloned() else {
            tracing::error!(target: "landing", "{}", NO_ACCOUNT);
            self.view.toggle_launch_area(false);
            return Ok(());
        };

        self.view.set_launch_details("Launching game..");
        match report::in_maintenance(&self.client, &self.config.network.maintenance_url).await {
            Ok(true) => {
                self.view.show_launch_failure(MAINTENANCE_TITLE, MAINTENANCE_DESC);
                self.view.toggle_launch_area(false);
                return Ok(());
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(target: "landing", "Could not check the maintenance status: {:#}", e)
            }
        }

        let layout = Layout::from_config(&self.config);
        let mods_dir = layout.mods_dir(&server.id);
        if let Err(e) = self.prepare_instance(server, &layout).await {
            tracing::error!(target: "launch_suite", "Error during launch: {:#}", e);
            self.report(LAUNCH_ERROR_TITLE, "").await;
            return Ok(());
        }

        self.view.set_launch_details("Done. Enjoy the server!");
        self.view.set_launch_enabled(false);

        let manifest = ModManifest::for_server(server, &layout);
        let (tx, edits) = tokio::sync::mpsc::unbounded_channel();
        let Some(watcher) = self.start_watch(&mods_dir, tx).await else {
            return Ok(());
        };

        let spawned =
            ProcessBuilder::new(server, version, forge, &account, LAUNCHER_VERSION, &self.config)
                .spawn();
        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(target: "launch_suite", "Error during launch: {:#}", e);
                self.report(LAUNCH_ERROR_TITLE, "").await;
                return Ok(());
            }
        };

        self.game_running = true;
        let outcome = self.follow_game(child, &manifest, edits).await;
        self.game_running = false;
        drop(watcher);

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(target: "launch_suite", "Lost the game process: {:#}", e);
                self.report(LAUNCH_ERROR_TITLE, "").await;
                return Ok(());
            }
        };
        self.view.toggle_launch_area(false);
        if let Some((title, desc)) = outcome.failure() {
            if outcome.needs_report() {
                self.report(title, desc).await;
            } else {
                self.view.show_launch_failure(title, desc);
            }
        }
        Ok(())
    }

    /// The game never starts unwatched
    async fn start_watch(
        &mut self,
        mods_dir: &Path,
        tx: UnboundedSender<PathBuf>,
    ) -> Option<RecommendedWatcher> {
        match integrity::watch(mods_dir, tx) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::error!(target: "landing", "Cannot watch {:?}: {}", mods_dir, e);
                self.report(LAUNCH_ERROR_TITLE, "").await;
                None
            }
        }
    }

    /// Clean the mods folder and set up options and shaders
    async fn prepare_instance(&self, server: &Server, layout: &Layout) -> Result<()> {
        let game_dir = layout.server_dir(&server.id);
        let mods_dir = layout.mods_dir(&server.id);
        tokio::fs::create_dir_all(&mods_dir).await?;

        let distro_paths: HashSet<PathBuf> = server
            .flatten_modules()
            .into_iter()
            .map(|m| m.local_path(layout, &server.id))
            .collect();
        launch::purge_forbidden_mods(&mods_dir, &self.config.launch.protected_mods, &distro_paths)?;

        let minecraft_dir = self.config.minecraft_dir();
        match launch::ensure_options(&game_dir, &minecraft_dir, &self.config.launch.resource_packs) {
            Ok(outcome) => tracing::info!(target: "launch_suite", "Options: {:?}", outcome),
            Err(e) => tracing::warn!(target: "launch_suite", "Could not prepare options: {:#}", e),
        }
        if self.config.launch.shader_mirroring {
            let copied = launch::mirror_shaders(&game_dir, &minecraft_dir);
            tracing::info!(target: "launch_suite", "Mirrored {} shader packs", copied);
        }
        Ok(())
    }

    async fn follow_game(
        &mut self,
        mut child: Child,
        manifest: &ModManifest,
        mut edits: UnboundedReceiver<PathBuf>,
    ) -> Result<GameOutcome> {
        let mut watching = true;
        let mut session = GameSession::new(&self.config.launch.server_joined_pattern);
        let mut stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
        let mut stderr = child.stderr.take().map(|s| BufReader::new(s).lines());

        let status = loop {
            let tick = tokio::select! {
                line = next_line(&mut stdout), if stdout.is_some() => GameTick::Stdout(line),
                line = next_line(&mut stderr), if stderr.is_some() => GameTick::Stderr(line),
                edit = edits.recv(), if watching => GameTick::Edit(edit),
                _ = sleep_until(session.linger.unwrap_or(session.started)), if session.linger.is_some() => GameTick::Linger,
                status = child.wait() => GameTick::Exit(status?),
            };

            match tick {
                GameTick::Stdout(Some(line)) => {
                    tracing::info!(target: "minecraft", "{}", line);
                    session.on_line(&line);
                }
                GameTick::Stderr(Some(line)) => {
                    tracing::warn!(target: "minecraft", "{}", line);
                    session.on_line(&line);
                }
                GameTick::Stdout(None) => stdout = None,
                GameTick::Stderr(None) => stderr = None,
                GameTick::Edit(Some(path)) => {
                    tracing::info!(target: "landing", "File edit: {:?}", path);
                    if manifest.inspect(&path) == Verdict::Tampered && !session.flags.tampered {
                        tracing::error!(target: "landing", "Mods folder changed while the game was running, stopping it");
                        session.flags.tampered = true;
                        if let Err(e) = child.start_kill() {
                            tracing::warn!(target: "landing", "Failed to kill the game: {}", e);
                        }
                    }
                }
                GameTick::Edit(None) => watching = false,
                GameTick::Linger => {
                    session.linger = None;
                    self.view.toggle_launch_area(false);
                }
                GameTick::Exit(status) => break status,
            }
        };

        let drain = async {
            if let Some(lines) = stdout.as_mut() {
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::info!(target: "minecraft", "{}", line);
                    session.on_line(&line);
                }
            }
            if let Some(lines) = stderr.as_mut() {
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(target: "minecraft", "{}", line);
                    session.on_line(&line);
                }
            }
        };
        let _ = timeout(OUTPUT_DRAIN, drain).await;

        let outcome = GameOutcome::classify(status, session.flags);
        tracing::info!(target: "landing", "Game exited with {} ({:?})", status, outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::landing::view::tests::{Call, RecordingView};

    fn landing(dir: &std::path::Path) -> Landing<RecordingView> {
        let mut config = Config {
            launcher_dir: dir.to_path_buf(),
            ..Config::default()
        };
        config.network.distribution_url = String::new();
        config.network.maintenance_url = String::new();
        Landing::new(config, RecordingView::new()).unwrap()
    }

    fn version() -> VersionDetails {
        serde_json::from_str(r#"{"id":"1.16.5","mainClass":"net.minecraft.client.main.Main"}"#)
            .unwrap()
    }

    #[cfg(unix)]
    fn long_running_game() -> Child {
        tokio::process::Command::new("sleep")
            .arg("30")
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap()
    }

    #[tokio::test]
    async fn test_launch_without_distribution_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut landing = landing(dir.path());

        landing.launch_button(true).await.unwrap();

        let (title, desc) = landing.view().failure().unwrap();
        assert_eq!(title, DISTRO_ERROR_TITLE);
        assert_eq!(desc, DISTRO_ERROR_DESC);
        assert_eq!(landing.view().calls.last(), Some(&Call::Toggle(false)));
    }

    #[tokio::test]
    async fn test_dl_async_requires_account() {
        let dir = tempfile::tempdir().unwrap();
        let mut landing = landing(dir.path());

        landing.dl_async(true).await.unwrap();

        assert_eq!(landing.view().details(), vec!["Validating Token..."]);
        assert_eq!(landing.view().failure().map(|f| f.1), Some(NO_ACCOUNT));
    }

    #[tokio::test]
    async fn test_load_server_selects_main_server() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("distribution.json"),
            crate::core::distro::tests::SAMPLE,
        )
        .unwrap();
        let mut landing = landing(dir.path());

        let server = landing.load_server(false).await.unwrap().unwrap();
        assert_eq!(server.id, "sow-main");
        assert_eq!(
            landing.config().launch.selected_server.as_deref(),
            Some("sow-main")
        );
        // Selection persisted
        let saved = config::load_from(dir.path()).unwrap();
        assert_eq!(saved.launch.selected_server.as_deref(), Some("sow-main"));
    }

    #[test]
    fn test_session_linger_starts_once() {
        let mut session = GameSession::new("has entered Ardonia");
        session.on_line("[12:00:01] [main/INFO]: ModLauncher 8.0.9 starting: java version 1.8");
        let first = session.linger.unwrap();
        assert!(first > session.started);
        assert!(first <= session.started + launch::MIN_LINGER);

        session.on_line("[12:00:02] [main/INFO]: MinecraftForge v14.23.5.2855 Initialized");
        assert_eq!(session.linger, Some(first));

        session.on_line("Exception in thread \"main\" java.lang.OutOfMemoryError: Java heap space");
        assert!(session.flags.out_of_memory);
    }

    #[tokio::test]
    async fn test_prepare_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut landing = landing(dir.path());
        auth::add_account(
            &mut landing.config.accounts,
            auth::offline_account("Alex"),
        );

        let distro = crate::core::distro::tests::sample();
        let server = distro.get_server("sow-main").unwrap().clone();
        // A file where the instance folder should be
        let server_dir = Layout::from_config(landing.config()).server_dir(&server.id);
        std::fs::create_dir_all(server_dir.parent().unwrap()).unwrap();
        std::fs::write(&server_dir, b"not a folder").unwrap();

        landing.launch_game(&server, &version(), None).await.unwrap();

        assert_eq!(landing.view().failure().map(|f| f.0), Some(LAUNCH_ERROR_TITLE));
        assert!(!landing.view().details().contains(&"Done. Enjoy the server!"));
        assert!(!landing.game_running);
    }

    #[tokio::test]
    async fn test_unwatchable_mods_folder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut landing = landing(dir.path());
        let (tx, _edits) = tokio::sync::mpsc::unbounded_channel();

        let watcher = landing.start_watch(&dir.path().join("missing"), tx).await;

        assert!(watcher.is_none());
        assert_eq!(landing.view().failure().map(|f| f.0), Some(LAUNCH_ERROR_TITLE));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unknown_jar_stops_game() {
        let dir = tempfile::tempdir().unwrap();
        let mut landing = landing(dir.path());
        let (tx, edits) = tokio::sync::mpsc::unbounded_channel();
        tx.send(dir.path().join("mods").join("evil.jar")).unwrap();

        let started = std::time::Instant::now();
        let outcome = landing
            .follow_game(long_running_game(), &ModManifest::default(), edits)
            .await
            .unwrap();

        assert_eq!(outcome, GameOutcome::Tampered);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_modified_mod_stops_game() {
        let dir = tempfile::tempdir().unwrap();
        let mut landing = landing(dir.path());
        let layout = Layout {
            common_dir: dir.path().join("common"),
            instance_dir: dir.path().join("instances"),
        };
        let distro = crate::core::distro::tests::sample();
        let manifest = ModManifest::for_server(distro.get_server("sow-main").unwrap(), &layout);

        let optifine = layout.mods_dir("sow-main").join("OptiFine.jar");
        std::fs::create_dir_all(optifine.parent().unwrap()).unwrap();
        // md5("bar") is the declared hash
        std::fs::write(&optifine, b"patched").unwrap();

        let (tx, edits) = tokio::sync::mpsc::unbounded_channel();
        tx.send(optifine).unwrap();

        let outcome = landing
            .follow_game(long_running_game(), &manifest, edits)
            .await
            .unwrap();
        assert_eq!(outcome, GameOutcome::Tampered);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_intact_mod_keeps_game_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut landing = landing(dir.path());
        let layout = Layout {
            common_dir: dir.path().join("common"),
            instance_dir: dir.path().join("instances"),
        };
        let distro = crate::core::distro::tests::sample();
        let manifest = ModManifest::for_server(distro.get_server("sow-main").unwrap(), &layout);

        let optifine = layout.mods_dir("sow-main").join("OptiFine.jar");
        std::fs::create_dir_all(optifine.parent().unwrap()).unwrap();
        std::fs::write(&optifine, b"bar").unwrap();

        let (tx, edits) = tokio::sync::mpsc::unbounded_channel();
        tx.send(optifine).unwrap();

        let game = tokio::process::Command::new("sleep")
            .arg("1")
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();
        let outcome = landing.follow_game(game, &manifest, edits).await.unwrap();
        assert_ne!(outcome, GameOutcome::Tampered);
    }
}
