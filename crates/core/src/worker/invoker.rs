//! Worker process spawning.
//!
//! The executable and script path come from configuration only. The
//! serialized payload is the single untrusted value and is passed as one
//! argv entry; no shell is involved.
//!
//! On Unix each worker leads its own process group so that anything it
//! forks can be killed together with it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::error::BridgeError;
use crate::features::FeaturePayload;

/// Fixed invocation of the external prediction program.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    executable: PathBuf,
    script: PathBuf,
    timeout: Duration,
}

impl WorkerCommand {
    /// Build a command running `executable script <json>` with a wall-clock
    /// bound of `timeout` per invocation.
    pub fn new(
        executable: impl Into<PathBuf>,
        script: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            executable: executable.into(),
            script: script.into(),
            timeout,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Spawn one worker for `payload` without waiting for it.
    ///
    /// The returned handle owns the child; dropping it kills the process.
    pub fn invoke(&self, payload: &FeaturePayload) -> Result<WorkerProcess, BridgeError> {
        let json = payload.to_json_text().map_err(|e| {
            BridgeError::Validation(format!("payload could not be serialized: {e}"))
        })?;

        let mut cmd = Command::new(&self.executable);
        cmd.arg(&self.script)
            .arg(json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| BridgeError::Spawn {
            executable: self.executable.display().to_string(),
            source,
        })?;

        let started = Instant::now();
        tracing::debug!(
            pid = ?child.id(),
            executable = %self.executable.display(),
            script = %self.script.display(),
            features = payload.len(),
            "Spawned prediction worker",
        );

        Ok(WorkerProcess {
            child,
            started,
            deadline: started + self.timeout,
        })
    }
}

/// Exclusive handle to one running worker.
#[derive(Debug)]
pub struct WorkerProcess {
    pub(crate) child: Child,
    pub(crate) started: Instant,
    pub(crate) deadline: Instant,
}

impl WorkerProcess {
    /// OS process id, or `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

/// Send SIGKILL to every process in the worker's group.
///
/// `pgid` is the worker's pid, captured at spawn. Returns `Ok` when the group
/// is already gone.
#[cfg(unix)]
pub(crate) fn kill_process_group(pgid: u32) -> std::io::Result<()> {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return Err(std::io::Error::other(format!("pid {pgid} out of range")));
    };
    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid
    // addresses the process group.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
pub(crate) fn kill_process_group(_pgid: u32) -> std::io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
