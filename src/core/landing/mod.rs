//! Landing module
//!
//! The launch flow behind the landing screen's play button: Java discovery,
//! file validation through the worker processes, then the game itself.

mod dispatch;
mod driver;
mod view;

pub use dispatch::{
    DOWNLOAD_ERROR_TITLE, DotTicker, JAVA_DOWNLOAD_FAILED_DESC, JAVA_DOWNLOAD_FAILED_TITLE,
    LaunchSuite, ScanStep, SuiteStep, SystemScan, download_error_message, stage_progress,
};
pub use driver::{LAUNCHER_VERSION, Landing};
pub use view::{
    ConsoleView, JAVA_REQUIRED_DESC, JAVA_REQUIRED_TITLE, JavaPrompt, LaunchView, NO_JAVA_TITLE,
    RequiredPrompt, no_java_message,
};
