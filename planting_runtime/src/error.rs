//! Runtime errors. Engine errors pass through unchanged.

use planting_engine::PlanError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Stored bytes decoded but do not describe a valid record.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("scenario error: {0}")]
    Scenario(String),

    #[error("ledger sequence violation: expected day {expected}, got {got}")]
    SequenceViolation { expected: u32, got: u32 },

    #[error("replay mismatch at day {day}: {detail}")]
    ReplayMismatch { day: u32, detail: String },

    #[error("snapshot hash mismatch: stored {stored}, computed {computed}")]
    SnapshotHashMismatch { stored: String, computed: String },
}
