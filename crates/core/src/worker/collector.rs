//! Concurrent draining of worker output.
//!
//! stdout, stderr and the wait for exit run as three futures joined under
//! the worker's deadline. Reading the streams one after the other would
//! deadlock as soon as the worker fills the pipe buffer of the stream not
//! currently being read.
//!
//! The worker's process group is killed whenever collection ends early
//! (deadline, cancellation) and when the worker exits while something it
//! left behind keeps its pipes open.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Notify;
use tokio::time::Instant;

use super::decoder::{self, PredictionResult};
use super::exit::WorkerExit;
use super::invoker::{kill_process_group, WorkerProcess};
use crate::error::BridgeError;

/// Size of each read from a worker pipe.
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// How long the pipes may stay open after the worker itself has exited.
const ORPHAN_GRACE: Duration = Duration::from_millis(100);

/// Everything a worker produced before it terminated.
#[derive(Debug, Clone)]
pub struct CollectedOutput {
    pub exit: WorkerExit,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Wall-clock time from spawn to exit in milliseconds.
    pub duration_ms: u64,
}

impl CollectedOutput {
    /// Interpret the collected output. See [`decoder::decode`].
    pub fn decode(&self) -> Result<PredictionResult, BridgeError> {
        decoder::decode(self.exit, &self.stdout, &self.stderr)
    }
}

/// Bytes read from one pipe, and the error that cut reading short, if any.
#[derive(Debug, Default)]
struct Drained {
    bytes: Vec<u8>,
    error: Option<io::Error>,
}

/// Kills the worker's process group when dropped while armed.
///
/// `kill_on_drop` on the child only reaches the worker itself; this covers
/// whatever it spawned when the collecting future is cancelled.
struct GroupGuard {
    pgid: Option<u32>,
}

impl GroupGuard {
    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            if let Err(e) = kill_process_group(pgid) {
                tracing::warn!(pgid, error = %e, "Failed to kill abandoned worker group");
            }
        }
    }
}

/// Drain `process` to completion or until its deadline passes.
///
/// stderr chunks are logged as they arrive but never fail the request on
/// their own. On deadline expiry the process group is killed and the worker
/// reaped, whatever was collected so far is dropped, and
/// [`BridgeError::Timeout`] is returned.
pub async fn collect(process: WorkerProcess) -> Result<CollectedOutput, BridgeError> {
    let WorkerProcess {
        mut child,
        started,
        deadline,
    } = process;
    // Captured now: `id()` returns `None` once the child has been reaped.
    let pid = child.id();
    let mut guard = GroupGuard { pgid: pid };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let streams_done = Notify::new();

    let outcome = tokio::time::timeout_at(deadline, async {
        let streams = async {
            let drained = tokio::join!(
                drain_stream(stdout, |_| {}),
                drain_stream(stderr, |chunk| {
                    tracing::warn!(
                        pid = ?pid,
                        stderr = %String::from_utf8_lossy(chunk).trim_end(),
                        "Worker stderr",
                    );
                }),
            );
            streams_done.notify_one();
            drained
        };
        let waited = async {
            let status = child.wait().await;
            tokio::select! {
                () = streams_done.notified() => {}
                () = tokio::time::sleep(ORPHAN_GRACE) => {
                    tracing::warn!(
                        pid = ?pid,
                        "Worker exited but its pipes are still open, killing its group",
                    );
                    kill_group(pid);
                }
            }
            status
        };
        let ((stdout, stderr), status) = tokio::join!(streams, waited);
        (stdout, stderr, status)
    })
    .await;

    let elapsed_ms = millis_since(started);

    match outcome {
        Ok((stdout, stderr, Ok(status))) => {
            guard.disarm();
            let exit = WorkerExit::from(status);
            tracing::debug!(pid = ?pid, %exit, elapsed_ms, "Prediction worker finished");
            into_output(exit, stdout, stderr, elapsed_ms)
        }
        Ok((_, stderr, Err(e))) => {
            tracing::error!(pid = ?pid, error = %e, "Failed to wait for prediction worker");
            kill_group(pid);
            if let Err(e) = child.start_kill() {
                tracing::warn!(pid = ?pid, error = %e, "Failed to kill unwaitable worker");
            }
            guard.disarm();
            Err(BridgeError::WorkerFailure {
                status: WorkerExit::Unknown,
                stderr: with_note(&stderr.bytes, &format!("failed to wait for worker: {e}")),
            })
        }
        Err(_elapsed) => {
            tracing::warn!(pid = ?pid, elapsed_ms, "Prediction worker timed out, killing it");
            kill_group(pid);
            if let Err(e) = child.start_kill() {
                tracing::warn!(pid = ?pid, error = %e, "Failed to kill timed out worker");
            }
            // Reap so the process does not linger as a zombie.
            if let Err(e) = child.wait().await {
                tracing::warn!(pid = ?pid, error = %e, "Failed to reap timed out worker");
            }
            guard.disarm();
            Err(BridgeError::Timeout { elapsed_ms })
        }
    }
}

/// Assemble the result of a worker that was waited for.
///
/// Output cut short by a read error is never decoded: a truncated stdout
/// could still parse as a valid document.
fn into_output(
    exit: WorkerExit,
    stdout: Drained,
    stderr: Drained,
    duration_ms: u64,
) -> Result<CollectedOutput, BridgeError> {
    let failures: Vec<String> = [("stdout", &stdout.error), ("stderr", &stderr.error)]
        .into_iter()
        .filter_map(|(name, error)| {
            error
                .as_ref()
                .map(|e| format!("failed to read worker {name}: {e}"))
        })
        .collect();

    if !failures.is_empty() {
        return Err(BridgeError::WorkerFailure {
            status: exit,
            stderr: with_note(&stderr.bytes, &failures.join("\n")),
        });
    }

    Ok(CollectedOutput {
        exit,
        stdout: stdout.bytes,
        stderr: stderr.bytes,
        duration_ms,
    })
}

/// Worker stderr followed by a line of our own.
fn with_note(stderr: &[u8], note: &str) -> String {
    let mut detail = String::from_utf8_lossy(stderr).into_owned();
    if !detail.is_empty() && !detail.ends_with('\n') {
        detail.push('\n');
    }
    detail.push_str(note);
    detail
}

fn kill_group(pid: Option<u32>) {
    if let Some(pgid) = pid {
        if let Err(e) = kill_process_group(pgid) {
            tracing::warn!(pgid, error = %e, "Failed to kill worker process group");
        }
    }
}

/// Read `stream` to EOF, handing every chunk to `on_chunk` as it arrives.
async fn drain_stream<R, F>(stream: Option<R>, mut on_chunk: F) -> Drained
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]),
{
    let mut drained = Drained::default();
    let Some(mut stream) = stream else {
        return drained;
    };

    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                on_chunk(&chunk[..n]);
                drained.bytes.extend_from_slice(&chunk[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read worker output stream");
                drained.error = Some(e);
                break;
            }
        }
    }
    drained
}

fn millis_since(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
