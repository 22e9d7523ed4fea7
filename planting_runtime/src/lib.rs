#![forbid(unsafe_code)]

//! Planting Runtime
//!
//! Wraps the planting engine with scenario loading, ledger persistence,
//! replay, snapshots, session management, drift detection and progress
//! reporting.
//!
//! No planning logic lives here. Every transition and invariant is
//! delegated to the engine.

pub mod error;
pub mod proto_types;
pub mod proto_bridge;
pub mod ledger_store;
pub mod snapshot;
pub mod scenario;
pub mod replay;
pub mod session;
pub mod drift;
pub mod progress;

pub use error::RuntimeError;
