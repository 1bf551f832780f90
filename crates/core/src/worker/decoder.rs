//! Interpretation of a terminated worker's output.

use serde_json::value::RawValue;

use super::exit::WorkerExit;
use crate::error::BridgeError;

/// Decoded worker answer: the exact JSON text of the document the worker
/// printed, key order and number digits untouched.
pub type PredictionResult = Box<RawValue>;

/// Turn a worker's exit status and captured streams into a prediction.
///
/// A failed exit wins over anything on stdout, even valid JSON. Otherwise
/// stdout must hold exactly one JSON document; surrounding whitespace is
/// allowed, trailing data is not. The document is validated but never
/// re-serialized, and it is not schema-checked.
pub fn decode(
    exit: WorkerExit,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<PredictionResult, BridgeError> {
    if !exit.success() {
        return Err(BridgeError::WorkerFailure {
            status: exit,
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        });
    }

    serde_json::from_slice(stdout).map_err(|e| BridgeError::Decode {
        reason: e.to_string(),
        stdout: String::from_utf8_lossy(stdout).into_owned(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
