//! Worker side: executes requests and streams events back to the host

use super::protocol::{
    decode_request, encode, percent, CompleteKind, ErrorKind, Function, GuardClass, ProgressKind,
    QueueSpec, ValidateStage, ValidationResult, WorkerError, WorkerEvent, WorkerRequest,
};
use crate::config::{self, runtime_dir_in, Config};
use crate::core::asset::AssetStore;
use crate::core::distro::{self, Distribution, Layout, ModuleType, Server};
use crate::core::java;
use crate::core::library::LibraryStore;
use crate::core::version::{self, VersionDetails};
use crate::util::download::{download_files, DownloadErrorCode, DownloadItem};
use crate::util::download_client;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Queue holding the JRE archive
pub const JAVA_QUEUE: &str = "java";

/// State of one worker process
pub struct Worker {
    config: Config,
    client: reqwest::Client,
    class: GuardClass,
    args: Vec<String>,
    queues: BTreeMap<String, Vec<DownloadItem>>,
    events: UnboundedSender<WorkerEvent>,
}

impl Worker {
    pub fn new(
        config: Config,
        client: reqwest::Client,
        class: GuardClass,
        args: Vec<String>,
        events: UnboundedSender<WorkerEvent>,
    ) -> Self {
        Self {
            config,
            client,
            class,
            args,
            queues: BTreeMap::new(),
            events,
        }
    }

    fn emit(&self, event: WorkerEvent) {
        // The writer only stops once the host is gone
        let _ = self.events.send(event);
    }

    fn emit_error(&self, data: ErrorKind, code: DownloadErrorCode, message: String) {
        tracing::error!("{}", message);
        self.emit(WorkerEvent::Error {
            data,
            error: WorkerError { code, message },
        });
    }

    /// Handle one request; false once the host disconnected
    pub async fn handle(&mut self, request: WorkerRequest) -> bool {
        match request {
            WorkerRequest::ChangeContext { class, args } => {
                tracing::info!("Switching context to {:?}", class);
                self.class = class;
                self.args = args;
                true
            }
            WorkerRequest::Execute { function } => {
                self.execute(function).await;
                true
            }
            WorkerRequest::Disconnect => false,
        }
    }

    async fn execute(&mut self, function: Function) {
        match (self.class, function) {
            (GuardClass::JavaGuard, Function::ValidateJava { data_dir }) => {
                let result = self.validate_java(&data_dir).await;
                self.emit(WorkerEvent::ValidateJava { result });
            }
            (GuardClass::AssetGuard, Function::EnqueueOpenJdk { data_dir, major }) => {
                let result = self.enqueue_open_jdk(&data_dir, major).await;
                self.emit(WorkerEvent::EnqueueOpenJdk { result });
            }
            (GuardClass::AssetGuard, Function::ProcessDlQueues { queues }) => {
                self.process_dl_queues(&queues).await;
            }
            (
                GuardClass::AssetGuard,
                Function::ValidateEverything {
                    server_id,
                    dev_mode,
                },
            ) => {
                if let Some(result) = self.validate_everything(&server_id, dev_mode).await {
                    self.emit(WorkerEvent::ValidateEverything { result });
                }
            }
            (class, function) => self.emit_error(
                ErrorKind::Execute,
                DownloadErrorCode::Other,
                format!("{:?} cannot execute {:?}", class, function),
            ),
        }
    }

    /// Scan for a Java able to run the context's Minecraft version
    async fn validate_java(&self, data_dir: &Path) -> Option<PathBuf> {
        let mc_version = self.args.first().cloned().unwrap_or_default();
        let runtime_dir = runtime_dir_in(data_dir);

        let found = tokio::task::spawn_blocking(move || java::scan(&runtime_dir, &mc_version))
            .await
            .ok()
            .flatten();

        match &found {
            Some(meta) => tracing::info!(
                "Found Java {:?} at {:?}",
                meta.version.map(|v| v.to_string()),
                meta.exec_path
            ),
            None => tracing::info!("No compatible Java installation found"),
        }
        found.map(|meta| meta.exec_path)
    }

    async fn enqueue_open_jdk(&mut self, data_dir: &Path, major: u32) -> bool {
        match java::adoptium_package(&self.client, major).await {
            Ok(package) => {
                tracing::info!("Queued {} for download", package.release_name);
                let dest = runtime_dir_in(data_dir).join(&package.file_name);
                self.queues
                    .entry(JAVA_QUEUE.to_string())
                    .or_default()
                    .push(DownloadItem::new(package.url, dest, package.size));
                true
            }
            Err(e) => {
                tracing::error!("Failed to resolve a Java {} package: {:#}", major, e);
                false
            }
        }
    }

    async fn process_dl_queues(&mut self, queues: &[QueueSpec]) {
        for spec in queues {
            let items = self.queues.remove(&spec.id).unwrap_or_default();
            if !self.download_queue(&items, spec.limit).await {
                return;
            }
            if spec.id == JAVA_QUEUE {
                self.install_java(&items).await;
            }
        }
    }

    /// Download a queue, reporting progress; false after an `error download`
    async fn download_queue(&self, items: &[DownloadItem], limit: usize) -> bool {
        let events = self.events.clone();
        let result = download_files(&self.client, items, limit, |done, total| {
            let _ = events.send(WorkerEvent::progress(ProgressKind::Download, done, total));
        })
        .await;

        match result {
            Ok(()) => {
                self.emit(WorkerEvent::Complete {
                    data: CompleteKind::Download,
                    args: Vec::new(),
                });
                true
            }
            Err(e) => {
                self.emit_error(ErrorKind::Download, e.code(), e.to_string());
                false
            }
        }
    }

    async fn install_java(&self, items: &[DownloadItem]) {
        let Some(archive) = items.first().map(|item| item.dest.clone()) else {
            self.emit_error(
                ErrorKind::Execute,
                DownloadErrorCode::Other,
                "No Java download was queued".to_string(),
            );
            return;
        };

        self.emit(WorkerEvent::progress(ProgressKind::Extract, 0, 1));
        let runtime_dir = archive
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.runtime_dir());
        let extracted =
            tokio::task::spawn_blocking(move || java::extract_archive(&archive, &runtime_dir))
                .await
                .context("Extraction task failed")
                .and_then(|r| r);

        match extracted {
            Ok(exe) => {
                tracing::info!("Java installed at {:?}", exe);
                self.emit(WorkerEvent::Complete {
                    data: CompleteKind::Java,
                    args: vec![exe.to_string_lossy().into_owned()],
                });
            }
            Err(e) => self.emit_error(
                ErrorKind::Execute,
                DownloadErrorCode::Other,
                format!("Failed to extract Java: {:#}", e),
            ),
        }
    }

    /// Validate and repair every file of a server
    ///
    /// `None` means a download failed and an `error download` was sent instead.
    async fn validate_everything(
        &mut self,
        server_id: &str,
        dev_mode: bool,
    ) -> Option<ValidationResult> {
        match self.try_validate_everything(server_id, dev_mode).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Validation failed: {:#}", e);
                Some(ValidationResult::failed(format!("{:#}", e)))
            }
        }
    }

    async fn try_validate_everything(
        &mut self,
        server_id: &str,
        dev_mode: bool,
    ) -> Result<Option<ValidationResult>> {
        let layout = Layout::from_config(&self.config);
        let distro = self.load_distribution(dev_mode)?;
        let server = distro
            .get_server(server_id)
            .with_context(|| format!("Server {} is not in the distribution index", server_id))?;

        let mut queue = distribution_files(server, &layout);
        self.emit(WorkerEvent::Validate {
            data: ValidateStage::Distribution,
        });

        let version_data =
            version::load_details(&self.client, &layout.versions_dir(), &server.minecraft_version)
                .await?;
        self.emit(WorkerEvent::Validate {
            data: ValidateStage::Version,
        });

        queue.extend(self.asset_files(&version_data, &layout).await?);
        self.emit(WorkerEvent::Validate {
            data: ValidateStage::Assets,
        });

        let libraries = LibraryStore::new(layout.libraries_dir());
        queue.extend(libraries.missing_libraries(&version_data.libraries));
        self.emit(WorkerEvent::Validate {
            data: ValidateStage::Libraries,
        });

        queue.extend(misc_files(&version_data, &layout));
        self.emit(WorkerEvent::Validate {
            data: ValidateStage::Files,
        });

        tracing::info!("{} files need downloading", queue.len());
        let limit = self.config.network.concurrent_downloads as usize;
        if !self.download_queue(&queue, limit).await {
            return Ok(None);
        }

        let forge_data = load_forge_data(server, &layout)?;
        Ok(Some(ValidationResult {
            version_data: Some(version_data),
            forge_data,
            error: None,
        }))
    }

    fn load_distribution(&self, dev_mode: bool) -> Result<Distribution> {
        let file = if dev_mode {
            distro::DEV_DISTRO_FILE
        } else {
            distro::DISTRO_FILE
        };
        Ok(distro::read_local(&self.config.launcher_dir.join(file))?)
    }

    async fn asset_files(
        &self,
        version_data: &VersionDetails,
        layout: &Layout,
    ) -> Result<Vec<DownloadItem>> {
        let Some(info) = version_data.asset_index.as_ref() else {
            return Ok(Vec::new());
        };

        let store = AssetStore::new(layout.common_dir.join("assets"));
        let index = store.load_index(&self.client, info).await?;

        let events = self.events.clone();
        let missing = tokio::task::spawn_blocking(move || {
            let mut last_percent = None;
            store.missing_objects(&index, |checked, total| {
                let (checked, total) = (checked as u64, total as u64);
                // One event per percent step
                let step = percent(checked, total);
                if last_percent != Some(step) {
                    last_percent = Some(step);
                    let _ = events.send(WorkerEvent::progress(ProgressKind::Assets, checked, total));
                }
            })
        })
        .await
        .context("Asset validation task failed")?;

        Ok(missing)
    }
}

/// Distribution modules whose file is missing or fails its MD5
pub fn distribution_files(server: &Server, layout: &Layout) -> Vec<DownloadItem> {
    server
        .flatten_modules()
        .into_iter()
        .map(|module| {
            DownloadItem::new(
                &module.artifact.url,
                module.local_path(layout, &server.id),
                module.artifact.size,
            )
            .with_md5(module.artifact.md5.clone())
        })
        .filter(|item| !item.is_valid_on_disk())
        .collect()
}

/// Client jar and log configuration
pub fn misc_files(version_data: &VersionDetails, layout: &Layout) -> Vec<DownloadItem> {
    let mut files = Vec::new();

    if let Some(client) = version_data.client_download() {
        files.push(
            DownloadItem::new(
                &client.url,
                version::client_jar_path(&layout.versions_dir(), &version_data.id),
                client.size,
            )
            .with_sha1(Some(client.sha1.clone())),
        );
    }

    if let Some(logging) = version_data.client_logging() {
        let file = &logging.file;
        files.push(
            DownloadItem::new(
                &file.url,
                layout
                    .common_dir
                    .join("assets")
                    .join("log_configs")
                    .join(&file.id),
                file.size,
            )
            .with_sha1(Some(file.sha1.clone())),
        );
    }

    files.retain(|item| !item.is_valid_on_disk());
    files
}

/// Read the Forge version manifest shipped as a sub-module of the Forge module
pub fn load_forge_data(server: &Server, layout: &Layout) -> Result<Option<VersionDetails>> {
    let Some(forge) = server.forge_module() else {
        return Ok(None);
    };
    let manifest = forge
        .sub_modules
        .iter()
        .find(|m| m.module_type == ModuleType::VersionManifest)
        .context("Forge module has no version manifest")?;

    let details = version::read_details(&manifest.local_path(layout, &server.id))?;
    Ok(Some(details))
}

async fn write_events<W>(mut rx: UnboundedReceiver<WorkerEvent>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = rx.recv().await {
        let mut line = encode(&event)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Serve requests from `reader` until disconnect or end of input
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    mut worker: Worker,
    rx: UnboundedReceiver<WorkerEvent>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let requests = async move {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let request = match decode_request(line.trim()) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!("Ignoring request: {}", e);
                    continue;
                }
            };
            if !worker.handle(request).await {
                break;
            }
        }
        // Dropping the worker closes the event channel
        drop(worker);
        Ok::<_, anyhow::Error>(())
    };

    let (served, written) = tokio::join!(requests, write_events(rx, writer));
    served?;
    written
}

/// Entry point of the hidden `worker` subcommand
pub async fn run_worker(class: GuardClass, args: Vec<String>) -> Result<()> {
    let config = config::load()?;
    let client = download_client(config.network.timeout_seconds)?;
    tracing::info!("Worker started in {:?} context", class);

    let (tx, rx) = mpsc::unbounded_channel();
    let worker = Worker::new(config, client, class, args, tx);
    serve(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        worker,
        rx,
    )
    .await
}
