//! Per-request orchestration of one worker invocation.
//!
//! Lifecycle of a request:
//! 1. Parse the raw body and validate it into a [`FeaturePayload`].
//! 2. Spawn a fresh worker with the payload as its sole argument.
//! 3. Drain stdout/stderr and wait for exit under the worker deadline.
//! 4. Decode the exit status and stdout into a prediction.
//!
//! Nothing is retried: the worker's side effects are unknown, so a failed
//! invocation is reported, never silently re-run.

use pricebridge_core::error::BridgeError;
use pricebridge_core::features::FeaturePayload;
use pricebridge_core::worker::collector;
use pricebridge_core::worker::decoder::PredictionResult;
use pricebridge_core::worker::invoker::WorkerCommand;
use serde_json::Value;

/// Bridges HTTP requests to one-shot worker processes.
#[derive(Debug, Clone)]
pub struct PredictionBridge {
    command: WorkerCommand,
}

impl PredictionBridge {
    pub fn new(command: WorkerCommand) -> Self {
        Self { command }
    }

    /// Handle one raw request body end to end.
    ///
    /// Malformed JSON or a non-object body fails with
    /// [`BridgeError::Validation`] before any process is spawned.
    pub async fn handle(&self, raw_body: &[u8]) -> Result<PredictionResult, BridgeError> {
        let body: Value = serde_json::from_slice(raw_body).map_err(|e| {
            BridgeError::Validation(format!("request body is not valid JSON: {e}"))
        })?;
        let payload = FeaturePayload::from_json(&body)?;
        self.predict(&payload).await
    }

    /// Run one worker for an already validated payload.
    pub async fn predict(&self, payload: &FeaturePayload) -> Result<PredictionResult, BridgeError> {
        let process = self.command.invoke(payload)?;
        let pid = process.id();

        let output = collector::collect(process).await?;
        let result = output.decode();

        match &result {
            Ok(_) => tracing::info!(
                pid = ?pid,
                duration_ms = output.duration_ms,
                "Prediction succeeded",
            ),
            Err(e) => tracing::warn!(
                pid = ?pid,
                duration_ms = output.duration_ms,
                error = %e,
                "Prediction worker output rejected",
            ),
        }

        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
