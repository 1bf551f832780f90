//! Prediction bridge service.
//!
//! The [`PredictionBridge`] ties the core worker pieces together into a
//! single entry point used by the `/predict` handler.

pub mod service;

pub use service::PredictionBridge;
