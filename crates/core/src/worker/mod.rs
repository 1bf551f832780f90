//! Worker process lifecycle.
//!
//! One worker process is spawned per request and never reused:
//!
//! 1. [`invoker`] spawns `<executable> <script> <json>` with piped output.
//! 2. [`collector`] drains stdout and stderr concurrently with the wait for
//!    exit, under the per-request deadline.
//! 3. [`decoder`] turns the exit status and collected bytes into a prediction
//!    or a [`BridgeError`](crate::error::BridgeError).

pub mod collector;
pub mod decoder;
pub mod exit;
pub mod invoker;
