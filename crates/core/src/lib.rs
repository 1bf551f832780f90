//! Domain logic for the prediction bridge.
//!
//! Everything in this crate is HTTP-agnostic: the validated feature payload,
//! the worker process lifecycle (spawn, drain, decode) and the error taxonomy
//! shared with the API layer.

pub mod error;
pub mod features;
pub mod worker;
