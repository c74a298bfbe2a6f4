//! AssetExec
//!
//! Download and validation work runs in a child process that talks to the
//! launcher over newline-delimited JSON.

mod host;
pub mod protocol;
mod worker;

pub use host::{AssetExec, RelayTarget};
pub use protocol::{
    CompleteKind, ErrorKind, Function, GuardClass, ProgressKind, ProtocolError, QueueSpec,
    ValidateStage, ValidationResult, WorkerError, WorkerEvent, WorkerRequest,
};
pub use worker::{run_worker, JAVA_QUEUE};
