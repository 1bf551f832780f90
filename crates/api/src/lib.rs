//! Prediction bridge API server library.
//!
//! Exposes the building blocks (config, state, error mapping, bridge service,
//! routes) so integration tests and the binary entrypoint share them.

pub mod bridge;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
