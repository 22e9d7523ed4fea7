#![forbid(unsafe_code)]

/// Engine v1. Any change to daily behaviour or canonical encoding bumps this.
pub const ENGINE_VERSION: u32 = 1;

pub mod arithmetic;
pub mod error;
pub mod domain;
pub mod config;
pub mod calendar;
pub mod pipeline;
pub mod events;
pub mod state;
pub mod procurement;
pub mod trips;
pub mod transitions;
pub mod invariants;
pub mod hashing;
pub mod costs;
pub mod engine;

pub use config::PlanConfig;
pub use engine::{run_plan, PlanningEngine, RunReport, Termination};
pub use error::PlanError;
pub use events::{DailyState, RunOutcome, StallReport};
pub use state::PlanState;
