//! Drift detection — determinism verification and ledger comparison.
//!
//! All numeric values are fixed-point i64 or plain counts.
//! No float arithmetic anywhere.

use planting_engine::events::DailyState;
use planting_engine::PlanConfig;

use crate::error::RuntimeError;
use crate::replay;

/// Run the scenario twice and require identical ledger hashes.
/// Returns the shared hash.
pub fn verify_determinism(config: &PlanConfig) -> Result<String, RuntimeError> {
    let first = replay::replay_scenario(config)?;
    let second = replay::replay_scenario(config)?;
    if first.ledger_hash != second.ledger_hash {
        let report = compare_ledgers(&first.report.ledger, &second.report.ledger);
        return Err(RuntimeError::ReplayMismatch {
            day: report.first_divergent_day.unwrap_or(0),
            detail: format!(
                "two runs produced different ledgers: {} vs {}",
                first.ledger_hash, second.ledger_hash
            ),
        });
    }
    Ok(first.ledger_hash)
}

/// Side-by-side totals of one ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub days: u32,
    pub orders: u32,
    pub trips: u32,
    pub planted: u64,
    pub total_cost: i64,
    pub outstanding_demand: u64,
}

impl LedgerTotals {
    pub fn of(ledger: &[DailyState]) -> Self {
        let last = ledger.last();
        Self {
            days: ledger.len() as u32,
            orders: ledger.iter().filter(|d| d.order.is_some()).count() as u32,
            trips: ledger.iter().map(|d| d.trips.len() as u32).sum(),
            planted: ledger.iter().map(|d| d.planted_quantity()).sum(),
            total_cost: last.map_or(0, |d| d.total_cost),
            outstanding_demand: last.map_or(0, |d| d.outstanding_demand),
        }
    }
}

/// Structured comparison of two ledgers, `b` relative to `a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    pub a: LedgerTotals,
    pub b: LedgerTotals,
    /// First day whose records differ, or where one ledger ends early.
    pub first_divergent_day: Option<u32>,
    pub day_delta: i64,
    pub trip_delta: i64,
    pub total_cost_delta: i64,
    pub outstanding_delta: i64,
}

impl DriftReport {
    pub fn is_identical(&self) -> bool {
        self.first_divergent_day.is_none()
    }
}

pub fn compare_ledgers(a: &[DailyState], b: &[DailyState]) -> DriftReport {
    let first_divergent_day = a
        .iter()
        .zip(b.iter())
        .find(|(x, y)| x != y)
        .map(|(x, _)| x.day)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len()) as u32));

    let ta = LedgerTotals::of(a);
    let tb = LedgerTotals::of(b);
    DriftReport {
        a: ta,
        b: tb,
        first_divergent_day,
        day_delta: i64::from(tb.days) - i64::from(ta.days),
        trip_delta: i64::from(tb.trips) - i64::from(ta.trips),
        total_cost_delta: tb.total_cost - ta.total_cost,
        outstanding_delta: tb.outstanding_demand as i64 - ta.outstanding_demand as i64,
    }
}
