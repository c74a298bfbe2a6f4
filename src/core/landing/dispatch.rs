//! Turning worker events into what the player sees
//!
//! Both dispatchers are synchronous: the drivers feed them events and act on
//! the returned step.

use super::view::{JavaPrompt, LaunchView, RequiredPrompt};
use crate::core::assetexec::{
    CompleteKind, ErrorKind, Function, GuardClass, ProgressKind, QueueSpec, ValidateStage,
    WorkerError, WorkerEvent, WorkerRequest, JAVA_QUEUE,
};
use crate::core::version::VersionDetails;
use crate::util::download::DownloadErrorCode;
use crate::util::round_mb;
use std::path::PathBuf;
use std::time::Duration;

pub const DOWNLOAD_ERROR_TITLE: &str = "Download Error";
pub const JAVA_DOWNLOAD_FAILED_TITLE: &str = "Unexpected Issue:<br>Java Download Failed";
pub const JAVA_DOWNLOAD_FAILED_DESC: &str = "Unfortunately we've encountered an issue while attempting to install Java. You will need to manually install a copy.";

/// Animated `Extracting...` label
#[derive(Debug, Clone)]
pub struct DotTicker {
    base: &'static str,
    dots: usize,
}

impl DotTicker {
    pub const INTERVAL: Duration = Duration::from_millis(750);

    pub fn new(base: &'static str) -> Self {
        Self { base, dots: 0 }
    }

    pub fn label(&self) -> String {
        format!("{}{}", self.base, ".".repeat(self.dots))
    }

    /// Advance one frame: `""`, `.`, `..`, `...`, then back
    pub fn tick(&mut self) -> String {
        self.dots = if self.dots >= 3 { 0 } else { self.dots + 1 };
        self.label()
    }
}

fn download_details(value: u64, total: u64) -> String {
    format!("Downloading ({}/{} MB)", round_mb(value), round_mb(total))
}

/// Message for a failed download
pub fn download_error_message(error: &WorkerError) -> String {
    match error.code {
        DownloadErrorCode::Connect => "Could not connect to the file server. Ensure that you are connected to the internet and try again.".to_string(),
        DownloadErrorCode::NoSpace => "You are out of disk space.".to_string(),
        DownloadErrorCode::Other => format!(
            "\nWe were not able to download some files. Error info: {}",
            error.message
        ),
    }
}

/// What the Java scan driver should do next
#[derive(Debug, Clone, PartialEq)]
pub enum ScanStep {
    Continue,
    /// Forward these requests to the worker
    Send(Vec<WorkerRequest>),
    /// A usable Java was found or installed
    Found(PathBuf),
    /// Run the scan again
    Rescan,
    /// Stop and disconnect
    Abort,
}

/// Handles events of the JavaGuard worker
pub struct SystemScan {
    compatibility_mode: bool,
    data_dir: PathBuf,
    common_dir: PathBuf,
    major: u32,
    ticker: Option<DotTicker>,
}

impl SystemScan {
    pub fn new(compatibility_mode: bool, data_dir: PathBuf, common_dir: PathBuf, major: u32) -> Self {
        Self {
            compatibility_mode,
            data_dir,
            common_dir,
            major,
            ticker: None,
        }
    }

    /// First request sent once the worker is up
    pub fn start(&self) -> WorkerRequest {
        WorkerRequest::execute(Function::ValidateJava {
            data_dir: self.data_dir.clone(),
        })
    }

    pub fn ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn tick(&mut self, view: &mut impl LaunchView) {
        if let Some(ticker) = self.ticker.as_mut() {
            view.set_launch_details(&ticker.tick());
        }
    }

    pub fn handle(&mut self, view: &mut impl LaunchView, event: WorkerEvent) -> ScanStep {
        match event {
            WorkerEvent::ValidateJava { result: Some(path) } => {
                tracing::info!(target: "landing", "Found Java at {:?}", path);
                ScanStep::Found(path)
            }
            WorkerEvent::ValidateJava { result: None } => self.no_java(view),
            WorkerEvent::EnqueueOpenJdk { result: true } => {
                view.set_launch_details("Downloading Java..");
                ScanStep::Send(vec![WorkerRequest::execute(Function::ProcessDlQueues {
                    queues: vec![QueueSpec::new(JAVA_QUEUE, 1)],
                })])
            }
            WorkerEvent::EnqueueOpenJdk { result: false } => {
                self.download_failed(view);
                ScanStep::Abort
            }
            WorkerEvent::Progress {
                data: ProgressKind::Download,
                value,
                total,
                percent,
            } => {
                view.set_launch_details(&download_details(value, total));
                view.set_download_percentage(percent);
                ScanStep::Continue
            }
            WorkerEvent::Complete {
                data: CompleteKind::Download,
                ..
            } => {
                let ticker = DotTicker::new("Extracting");
                view.set_launch_details(&ticker.label());
                self.ticker = Some(ticker);
                ScanStep::Continue
            }
            WorkerEvent::Complete {
                data: CompleteKind::Java,
                args,
            } => {
                self.ticker = None;
                match args.into_iter().next() {
                    Some(exe) => {
                        view.set_launch_details("Java Installed!");
                        ScanStep::Found(PathBuf::from(exe))
                    }
                    None => {
                        tracing::error!(target: "landing", "Java install finished without an executable");
                        self.download_failed(view);
                        ScanStep::Abort
                    }
                }
            }
            WorkerEvent::Error { data, error } => {
                tracing::error!(target: "landing", "Java worker {:?} error: {}", data, error.message);
                self.ticker = None;
                self.download_failed(view);
                ScanStep::Abort
            }
            other => {
                tracing::debug!(target: "landing", "Ignoring {:?} during the Java scan", other);
                ScanStep::Continue
            }
        }
    }

    fn no_java(&mut self, view: &mut impl LaunchView) -> ScanStep {
        match view.prompt_java_install(!self.compatibility_mode) {
            JavaPrompt::Install => {
                view.set_launch_details("Preparing Java Download..");
                ScanStep::Send(vec![
                    WorkerRequest::ChangeContext {
                        class: GuardClass::AssetGuard,
                        args: vec![self.common_dir.to_string_lossy().into_owned()],
                    },
                    WorkerRequest::execute(Function::EnqueueOpenJdk {
                        data_dir: self.data_dir.clone(),
                        major: self.major,
                    }),
                ])
            }
            JavaPrompt::Manual | JavaPrompt::Dismiss => match view.prompt_java_required() {
                RequiredPrompt::Understand => {
                    view.toggle_launch_area(false);
                    ScanStep::Abort
                }
                RequiredPrompt::GoBack => ScanStep::Rescan,
            },
        }
    }

    fn download_failed(&self, view: &mut impl LaunchView) {
        view.show_launch_failure(JAVA_DOWNLOAD_FAILED_TITLE, JAVA_DOWNLOAD_FAILED_DESC);
        view.toggle_launch_area(false);
    }
}

/// What the asset validation driver should do next
#[derive(Debug, Clone)]
pub enum SuiteStep {
    Continue,
    /// A failure was shown; disconnect
    Abort,
    /// Upload an error report, then disconnect
    Report { title: &'static str },
    /// Everything is on disk
    Validated {
        version: Box<VersionDetails>,
        forge: Option<Box<VersionDetails>>,
    },
}

/// Percentage and details for a validation milestone
pub fn stage_progress(stage: ValidateStage) -> (u32, &'static str) {
    match stage {
        ValidateStage::Distribution => (20, "Loading version information.."),
        ValidateStage::Version => (40, "Validating asset integrity.."),
        ValidateStage::Assets => (60, "Validating library integrity.."),
        ValidateStage::Libraries => (80, "Validating miscellaneous file integrity.."),
        ValidateStage::DlForge => (35, "Downloading Forge.."),
        ValidateStage::DlForgeLibs => (40, "Downloading libraries.."),
        ValidateStage::BuildingForge => (50, "Building Forge.."),
        ValidateStage::BuildingForge2 => (60, "Building forge.."),
        ValidateStage::ForgeRemap => (80, "Remapping forge.."),
        ValidateStage::ForgePatch => (80, "Patching Forge.."),
        ValidateStage::Files => (100, "Downloading files.."),
    }
}

/// Handles events of the AssetGuard worker during a launch
#[derive(Default)]
pub struct LaunchSuite {
    ticker: Option<DotTicker>,
}

impl LaunchSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn tick(&mut self, view: &mut impl LaunchView) {
        if let Some(ticker) = self.ticker.as_mut() {
            view.set_launch_details(&ticker.tick());
        }
    }

    pub fn handle(&mut self, view: &mut impl LaunchView, event: WorkerEvent) -> SuiteStep {
        match event {
            WorkerEvent::Validate { data } => {
                let (percent, details) = stage_progress(data);
                tracing::info!(target: "launch_suite", "Validation stage {:?} done", data);
                view.set_launch_percentage(percent as f64, 100.0, None);
                view.set_launch_details(details);
                SuiteStep::Continue
            }
            WorkerEvent::Progress {
                data: ProgressKind::Assets,
                value,
                total,
                ..
            } => {
                let part = if total == 0 {
                    20.0
                } else {
                    value as f64 / total as f64 * 20.0
                };
                let percent = 40.0 + part;
                view.set_launch_percentage(percent, 100.0, Some(percent as u32));
                SuiteStep::Continue
            }
            WorkerEvent::Progress {
                data: ProgressKind::Download,
                value,
                total,
                percent,
            } => {
                view.set_launch_details(&download_details(value, total));
                view.set_download_percentage(percent);
                SuiteStep::Continue
            }
            WorkerEvent::Progress {
                data: ProgressKind::Extract,
                ..
            } => {
                if self.ticker.is_none() {
                    let ticker = DotTicker::new("Extracting libraries");
                    view.set_launch_details(&ticker.label());
                    self.ticker = Some(ticker);
                }
                SuiteStep::Continue
            }
            WorkerEvent::Complete {
                data: CompleteKind::Download,
                ..
            } => {
                self.ticker = None;
                view.set_launch_details("Preparing to launch..");
                SuiteStep::Continue
            }
            WorkerEvent::Error {
                data: ErrorKind::Download,
                error,
            } => {
                tracing::error!(target: "launch_suite", "Error while downloading: {}", error.message);
                self.ticker = None;
                view.show_launch_failure(DOWNLOAD_ERROR_TITLE, &download_error_message(&error));
                SuiteStep::Abort
            }
            WorkerEvent::Error {
                data: ErrorKind::Execute,
                error,
            } => {
                tracing::error!(target: "launch_suite", "Worker failed: {}", error.message);
                self.ticker = None;
                SuiteStep::Report {
                    title: "Error During Launch",
                }
            }
            WorkerEvent::ValidateEverything { result } => {
                self.ticker = None;
                match (result.version_data, result.error) {
                    (Some(version), None) => SuiteStep::Validated {
                        version: Box::new(version),
                        forge: result.forge_data.map(Box::new),
                    },
                    (_, error) => {
                        tracing::error!(target: "launch_suite", "Error during validation: {:?}", error);
                        SuiteStep::Report {
                            title: "Error During Launch",
                        }
                    }
                }
            }
            other => {
                tracing::debug!(target: "launch_suite", "Ignoring {:?}", other);
                SuiteStep::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assetexec::ValidationResult;
    use crate::core::landing::view::tests::{Call, RecordingView};

    fn scan() -> SystemScan {
        SystemScan::new(false, PathBuf::from("/data"), PathBuf::from("/data/common"), 8)
    }

    #[test]
    fn test_dot_ticker_cycle() {
        let mut ticker = DotTicker::new("Extracting");
        assert_eq!(ticker.label(), "Extracting");
        assert_eq!(ticker.tick(), "Extracting.");
        assert_eq!(ticker.tick(), "Extracting..");
        assert_eq!(ticker.tick(), "Extracting...");
        assert_eq!(ticker.tick(), "Extracting");
    }

    #[test]
    fn test_scan_found_java() {
        let mut view = RecordingView::new();
        let step = scan().handle(
            &mut view,
            WorkerEvent::ValidateJava {
                result: Some(PathBuf::from("/usr/bin/java")),
            },
        );
        assert_eq!(step, ScanStep::Found(PathBuf::from("/usr/bin/java")));
        assert!(view.calls.is_empty());
    }

    #[test]
    fn test_scan_install_requests_download() {
        let mut view = RecordingView::new();
        let mut scan = scan();

        let step = scan.handle(&mut view, WorkerEvent::ValidateJava { result: None });
        let ScanStep::Send(requests) = step else {
            panic!("expected requests, got {:?}", step);
        };
        assert_eq!(
            requests[0],
            WorkerRequest::ChangeContext {
                class: GuardClass::AssetGuard,
                args: vec!["/data/common".to_string()],
            }
        );
        assert_eq!(
            requests[1],
            WorkerRequest::execute(Function::EnqueueOpenJdk {
                data_dir: PathBuf::from("/data"),
                major: 8,
            })
        );
        assert_eq!(view.calls[0], Call::JavaPrompt(true));
        assert_eq!(view.last_details(), Some("Preparing Java Download.."));

        let step = scan.handle(&mut view, WorkerEvent::EnqueueOpenJdk { result: true });
        assert_eq!(
            step,
            ScanStep::Send(vec![WorkerRequest::execute(Function::ProcessDlQueues {
                queues: vec![QueueSpec::new("java", 1)],
            })])
        );
    }

    #[test]
    fn test_scan_compatibility_mode_hides_manual_install() {
        let mut view = RecordingView::new();
        let mut scan = SystemScan::new(true, PathBuf::from("/d"), PathBuf::from("/d/c"), 8);
        scan.handle(&mut view, WorkerEvent::ValidateJava { result: None });
        assert_eq!(view.calls[0], Call::JavaPrompt(false));
    }

    #[test]
    fn test_scan_dismiss_then_go_back() {
        let mut view = RecordingView::new();
        view.java_answer = JavaPrompt::Dismiss;
        view.required_answer = RequiredPrompt::GoBack;
        let step = scan().handle(&mut view, WorkerEvent::ValidateJava { result: None });
        assert_eq!(step, ScanStep::Rescan);

        view.required_answer = RequiredPrompt::Understand;
        let step = scan().handle(&mut view, WorkerEvent::ValidateJava { result: None });
        assert_eq!(step, ScanStep::Abort);
        assert_eq!(view.calls.last(), Some(&Call::Toggle(false)));
    }

    #[test]
    fn test_scan_enqueue_failure() {
        let mut view = RecordingView::new();
        let step = scan().handle(&mut view, WorkerEvent::EnqueueOpenJdk { result: false });
        assert_eq!(step, ScanStep::Abort);
        assert_eq!(view.failure().map(|f| f.0), Some(JAVA_DOWNLOAD_FAILED_TITLE));
    }

    #[test]
    fn test_scan_download_and_install() {
        let mut view = RecordingView::new();
        let mut scan = scan();

        scan.handle(
            &mut view,
            WorkerEvent::progress(ProgressKind::Download, 12_400_000, 40_000_000),
        );
        assert_eq!(view.last_details(), Some("Downloading (12/40 MB)"));
        assert_eq!(view.calls.last(), Some(&Call::Download(31)));

        // The worker's own percentage is shown as is
        scan.handle(
            &mut view,
            WorkerEvent::Progress {
                data: ProgressKind::Download,
                value: 1,
                total: 4,
                percent: 77,
            },
        );
        assert_eq!(view.calls.last(), Some(&Call::Download(77)));

        scan.handle(
            &mut view,
            WorkerEvent::Complete {
                data: CompleteKind::Download,
                args: vec![],
            },
        );
        assert!(scan.ticking());
        assert_eq!(view.last_details(), Some("Extracting"));
        scan.tick(&mut view);
        assert_eq!(view.last_details(), Some("Extracting."));

        let step = scan.handle(
            &mut view,
            WorkerEvent::Complete {
                data: CompleteKind::Java,
                args: vec!["/data/runtime/jdk8/bin/java".to_string()],
            },
        );
        assert!(!scan.ticking());
        assert_eq!(view.last_details(), Some("Java Installed!"));
        assert_eq!(step, ScanStep::Found(PathBuf::from("/data/runtime/jdk8/bin/java")));
    }

    #[test]
    fn test_suite_stages() {
        let mut view = RecordingView::new();
        let mut suite = LaunchSuite::new();

        suite.handle(
            &mut view,
            WorkerEvent::Validate {
                data: ValidateStage::Distribution,
            },
        );
        assert_eq!(view.calls[0], Call::Percentage(20.0, None));
        assert_eq!(view.last_details(), Some("Loading version information.."));

        suite.handle(&mut view, WorkerEvent::progress(ProgressKind::Assets, 50, 100));
        assert_eq!(view.calls.last(), Some(&Call::Percentage(50.0, Some(50))));

        assert_eq!(stage_progress(ValidateStage::Files), (100, "Downloading files.."));
        assert_eq!(stage_progress(ValidateStage::DlForge).0, 35);
    }

    #[test]
    fn test_suite_extract_and_complete() {
        let mut view = RecordingView::new();
        let mut suite = LaunchSuite::new();

        suite.handle(&mut view, WorkerEvent::progress(ProgressKind::Extract, 1, 4));
        suite.handle(&mut view, WorkerEvent::progress(ProgressKind::Extract, 2, 4));
        assert_eq!(view.details(), vec!["Extracting libraries"]);
        assert!(suite.ticking());

        suite.handle(
            &mut view,
            WorkerEvent::Complete {
                data: CompleteKind::Download,
                args: vec![],
            },
        );
        assert!(!suite.ticking());
        assert_eq!(view.last_details(), Some("Preparing to launch.."));
    }

    #[test]
    fn test_suite_download_errors() {
        let cases = [
            (DownloadErrorCode::Connect, "Could not connect"),
            (DownloadErrorCode::NoSpace, "You are out of disk space."),
            (DownloadErrorCode::Other, "Error info: boom"),
        ];
        for (code, expected) in cases {
            let mut view = RecordingView::new();
            let step = LaunchSuite::new().handle(
                &mut view,
                WorkerEvent::Error {
                    data: ErrorKind::Download,
                    error: WorkerError {
                        code,
                        message: "boom".to_string(),
                    },
                },
            );
            assert!(matches!(step, SuiteStep::Abort));
            let (title, desc) = view.failure().unwrap();
            assert_eq!(title, DOWNLOAD_ERROR_TITLE);
            assert!(desc.contains(expected), "{}", desc);
        }
    }

    #[test]
    fn test_suite_validation_result() {
        let mut view = RecordingView::new();
        let step = LaunchSuite::new().handle(
            &mut view,
            WorkerEvent::ValidateEverything {
                result: ValidationResult::failed("no version"),
            },
        );
        assert!(matches!(
            step,
            SuiteStep::Report {
                title: "Error During Launch"
            }
        ));

        let result = ValidationResult {
            version_data: Some(
                serde_json::from_str(r#"{"id":"1.12.2","mainClass":"net.minecraft.client.main.Main"}"#)
                    .unwrap(),
            ),
            ..ValidationResult::default()
        };
        let step = LaunchSuite::new().handle(&mut view, WorkerEvent::ValidateEverything { result });
        assert!(matches!(step, SuiteStep::Validated { forge: None, .. }));
    }
}
