//! Host side of the worker: spawn, talk to and reap an AssetExec process

use super::protocol::{decode_event, encode, GuardClass, ProtocolError, WorkerEvent, WorkerRequest};
use crate::config::LAUNCHER_DIR_ENV;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

/// Logger that receives the worker's stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayTarget {
    /// Asset validation worker
    Aex,
    /// Java scan worker
    SysAex,
}

fn relay_line(target: RelayTarget, line: &str) {
    match target {
        RelayTarget::Aex => tracing::info!(target: "aex", "{}", line),
        RelayTarget::SysAex => tracing::info!(target: "sysaex", "{}", line),
    }
}

/// A running worker process
pub struct AssetExec {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    relay: Option<JoinHandle<()>>,
}

impl AssetExec {
    /// Re-execute the current binary as `worker <class> [args..]`
    pub fn fork(
        class: GuardClass,
        args: &[String],
        launcher_dir: &Path,
        target: RelayTarget,
    ) -> Result<Self> {
        let exe = std::env::current_exe().context("Cannot locate the launcher executable")?;

        let mut command = Command::new(exe);
        command
            .arg("worker")
            .arg(class.cli_name())
            .args(args)
            .env(LAUNCHER_DIR_ENV, launcher_dir);
        Self::spawn(command, target)
    }

    /// Spawn an arbitrary command speaking the worker protocol
    pub fn spawn(mut command: Command, target: RelayTarget) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to start worker process")?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .context("Worker stdout is not piped")?;
        let stderr = child.stderr.take();

        let relay = stderr.map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    relay_line(target, &line);
                }
            })
        });

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            relay,
        })
    }

    /// Send one request
    pub async fn send(&mut self, request: &WorkerRequest) -> Result<(), ProtocolError> {
        let stdin = self.stdin.as_mut().ok_or(ProtocolError::Closed)?;
        let mut line = encode(request)?;
        line.push('\n');
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Next event, or `None` once the worker closed its stdout
    pub async fn recv(&mut self) -> Result<Option<WorkerEvent>, ProtocolError> {
        loop {
            match self.stdout.next_line().await? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return decode_event(line.trim()).map(Some),
            }
        }
    }

    /// Ask the worker to exit and close its input
    pub async fn disconnect(&mut self) {
        if self.stdin.is_some() {
            if let Err(e) = self.send(&WorkerRequest::Disconnect).await {
                tracing::debug!("Worker already gone: {}", e);
            }
        }
        self.stdin = None;
    }

    pub async fn kill(&mut self) -> Result<()> {
        self.child.kill().await.context("Failed to kill worker")
    }

    /// Wait for the process to exit and drain its stderr
    pub async fn wait(mut self) -> Result<ExitStatus> {
        self.stdin = None;
        let status = self.child.wait().await.context("Failed to wait for worker")?;
        if let Some(relay) = self.relay.take() {
            let _ = relay.await;
        }
        Ok(status)
    }
}
