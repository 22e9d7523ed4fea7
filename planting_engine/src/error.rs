/// Planting Engine — Fatal Errors
///
/// Every variant aborts the run. Expected day-level conditions
/// (no provider, no destination) are recorded as skips instead,
/// and a stalled run is a `RunOutcome`, not an error.

use crate::domain::{DestinationId, SpeciesId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Invalid or missing static parameters. Raised before day 0.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Warehouse or vehicle capacity would be exceeded. Always a defect.
    #[error("capacity violation on day {day}: {detail}")]
    CapacityViolation { day: u32, detail: String },

    /// More available stock was requested than the pipeline holds.
    #[error("insufficient inventory for species {species}: requested {requested}, available {available}")]
    InsufficientInventory {
        species: SpeciesId,
        requested: u64,
        available: u64,
    },

    /// A planting would drive destination demand below zero.
    #[error("demand underflow at destination {destination}, species {species}: requested {requested}, outstanding {outstanding}")]
    DemandUnderflow {
        destination: DestinationId,
        species: SpeciesId,
        requested: u64,
        outstanding: u64,
    },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("arithmetic overflow: {0}")]
    Overflow(String),
}
