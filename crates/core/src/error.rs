use crate::worker::exit::WorkerExit;

/// Every way a single prediction request can fail.
///
/// All variants are terminal for their request; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The inbound body was not an acceptable feature payload.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The worker executable could not be started.
    #[error("Failed to spawn worker '{executable}': {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker ran but exited non-zero, was killed, or could not be reaped.
    #[error("Worker {status}: {stderr}")]
    WorkerFailure { status: WorkerExit, stderr: String },

    /// The worker exited 0 but stdout was not exactly one JSON document.
    #[error("Worker output is not a single JSON document: {reason}")]
    Decode { reason: String, stdout: String },

    /// The worker exceeded its deadline and was killed.
    #[error("Worker timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

impl BridgeError {
    /// Category string reported to HTTP callers in the `error` field.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Invalid request body",
            Self::Spawn { .. } => "Failed to start prediction worker",
            Self::WorkerFailure { .. } => "Python error",
            Self::Decode { .. } => "Error parsing prediction result",
            Self::Timeout { .. } => "Prediction timed out",
        }
    }

    /// Diagnostic text reported to HTTP callers in the `detail` field.
    ///
    /// Worker failures report the captured stderr verbatim and decode
    /// failures report the raw stdout verbatim.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Spawn { executable, source } => format!("{executable}: {source}"),
            Self::WorkerFailure { status, stderr } => {
                if stderr.trim().is_empty() {
                    format!("worker {status} without writing to stderr")
                } else {
                    stderr.clone()
                }
            }
            Self::Decode { stdout, .. } => stdout.clone(),
            Self::Timeout { elapsed_ms } => {
                format!("worker did not finish within {elapsed_ms}ms and was killed")
            }
        }
    }

    /// Whether the failure was caused by the caller rather than the worker.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
