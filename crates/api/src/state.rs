use std::sync::Arc;

use crate::bridge::PredictionBridge;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Per-request worker bridge.
    pub bridge: Arc<PredictionBridge>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let bridge = PredictionBridge::new(config.worker.command());
        Self {
            config: Arc::new(config),
            bridge: Arc::new(bridge),
        }
    }
}
