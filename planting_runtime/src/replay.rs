//! Replay orchestrator — rebuild plan state from a stored ledger.
//!
//! Delegates all domain logic to the engine. The ledger is never trusted:
//! each day is re-simulated and must reproduce the stored record exactly.

use planting_engine::events::DailyState;
use planting_engine::hashing::{day_hash, ledger_hash};
use planting_engine::{PlanConfig, PlanState, PlanningEngine, RunReport};

use crate::error::RuntimeError;

/// A full run plus the hash of its ledger.
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub report: RunReport,
    pub ledger_hash: String,
}

/// Run the scenario from day 0 to termination.
pub fn replay_scenario(config: &PlanConfig) -> Result<ReplayResult, RuntimeError> {
    let report = PlanningEngine::new(config.clone())?.run()?;
    let ledger_hash = ledger_hash(&report.ledger)?;
    Ok(ReplayResult {
        report,
        ledger_hash,
    })
}

/// Re-simulate `stored.len()` days and return the engine positioned after them.
pub fn rebuild_engine(
    config: &PlanConfig,
    stored: &[DailyState],
) -> Result<PlanningEngine, RuntimeError> {
    rebuild_engine_observed(config, stored, |_| Ok(()))
}

/// As `rebuild_engine`, calling `observe` on the initial state and after every day.
///
/// 1. Create a fresh engine from the config
/// 2. Step once per stored record
/// 3. Compare each produced record with the stored one
pub fn rebuild_engine_observed<F>(
    config: &PlanConfig,
    stored: &[DailyState],
    mut observe: F,
) -> Result<PlanningEngine, RuntimeError>
where
    F: FnMut(&PlanState) -> Result<(), RuntimeError>,
{
    let mut engine = PlanningEngine::new(config.clone())?;
    observe(engine.state())?;
    for expected in stored {
        if engine.check_termination().is_some() {
            return Err(RuntimeError::ReplayMismatch {
                day: expected.day,
                detail: "stored ledger continues past termination".to_string(),
            });
        }
        let produced = engine.step()?;
        if produced != expected {
            return Err(RuntimeError::ReplayMismatch {
                day: expected.day,
                detail: format!(
                    "stored record hash {}, replayed {}",
                    day_hash(expected)?,
                    day_hash(produced)?
                ),
            });
        }
        observe(engine.state())?;
    }
    Ok(engine)
}

/// Rebuild the state after the stored days.
pub fn rebuild_state(config: &PlanConfig, stored: &[DailyState]) -> Result<PlanState, RuntimeError> {
    Ok(rebuild_engine(config, stored)?.state().clone())
}

/// Verify a stored ledger against a fresh run and return its hash.
pub fn verify_ledger(config: &PlanConfig, stored: &[DailyState]) -> Result<String, RuntimeError> {
    rebuild_engine(config, stored)?;
    Ok(ledger_hash(stored)?)
}
