//! Worker wire protocol
//!
//! One JSON object per line. Requests travel over the worker's stdin,
//! events come back over its stdout.

use crate::core::version::VersionDetails;
use crate::util::download::DownloadErrorCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Malformed worker message {line:?}: {source}")]
    Decode {
        line: String,
        source: serde_json::Error,
    },

    #[error("Worker channel error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker channel is closed")]
    Closed,
}

/// Context a worker executes in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardClass {
    /// Java discovery
    JavaGuard,
    /// Downloads and file validation
    AssetGuard,
}

impl GuardClass {
    /// Name of the hidden CLI subcommand
    pub fn cli_name(self) -> &'static str {
        match self {
            GuardClass::JavaGuard => "java-guard",
            GuardClass::AssetGuard => "asset-guard",
        }
    }
}

/// A named download queue and how many files it fetches at once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSpec {
    pub id: String,
    pub limit: usize,
}

impl QueueSpec {
    pub fn new(id: impl Into<String>, limit: usize) -> Self {
        Self {
            id: id.into(),
            limit,
        }
    }
}

/// Work the host asks the worker to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args", rename_all = "camelCase")]
pub enum Function {
    #[serde(rename_all = "camelCase")]
    ValidateJava { data_dir: PathBuf },
    /// Queue a JRE of the given major version for download
    #[serde(rename_all = "camelCase")]
    EnqueueOpenJdk { data_dir: PathBuf, major: u32 },
    ProcessDlQueues { queues: Vec<QueueSpec> },
    #[serde(rename_all = "camelCase")]
    ValidateEverything { server_id: String, dev_mode: bool },
}

/// Host → worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "camelCase")]
pub enum WorkerRequest {
    ChangeContext { class: GuardClass, args: Vec<String> },
    Execute { function: Function },
    Disconnect,
}

impl WorkerRequest {
    pub fn execute(function: Function) -> Self {
        WorkerRequest::Execute { function }
    }
}

/// Validation milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidateStage {
    Distribution,
    Version,
    Assets,
    Libraries,
    Files,
    DlForge,
    DlForgeLibs,
    BuildingForge,
    BuildingForge2,
    ForgeRemap,
    ForgePatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    Assets,
    Download,
    Extract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompleteKind {
    Download,
    Java,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Download,
    Execute,
}

/// Error payload of an `error` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerError {
    pub code: DownloadErrorCode,
    pub message: String,
}

/// Outcome of `validateEverything`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    #[serde(default)]
    pub version_data: Option<VersionDetails>,
    #[serde(default)]
    pub forge_data: Option<VersionDetails>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Worker → host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "context", rename_all = "camelCase")]
pub enum WorkerEvent {
    Validate {
        data: ValidateStage,
    },
    Progress {
        data: ProgressKind,
        value: u64,
        total: u64,
        percent: u32,
    },
    Complete {
        data: CompleteKind,
        #[serde(default)]
        args: Vec<String>,
    },
    Error {
        data: ErrorKind,
        error: WorkerError,
    },
    ValidateJava {
        result: Option<PathBuf>,
    },
    EnqueueOpenJdk {
        result: bool,
    },
    ValidateEverything {
        result: ValidationResult,
    },
}

impl WorkerEvent {
    pub fn progress(data: ProgressKind, value: u64, total: u64) -> Self {
        WorkerEvent::Progress {
            data,
            value,
            total,
            percent: percent(value, total),
        }
    }
}

/// Integer percentage, 100 when there is nothing to do
pub fn percent(value: u64, total: u64) -> u32 {
    if total == 0 {
        100
    } else {
        (value.min(total) * 100 / total) as u32
    }
}

/// Serialize a message as one line (without the newline)
pub fn encode<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(ProtocolError::Encode)
}

pub fn decode_event(line: &str) -> Result<WorkerEvent, ProtocolError> {
    serde_json::from_str(line).map_err(|source| ProtocolError::Decode {
        line: line.to_string(),
        source,
    })
}

pub fn decode_request(line: &str) -> Result<WorkerRequest, ProtocolError> {
    serde_json::from_str(line).map_err(|source| ProtocolError::Decode {
        line: line.to_string(),
        source,
    })
}
