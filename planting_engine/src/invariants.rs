/// Planting Engine — Invariant Checks
///
/// Hard-fail validation. Each check returns `Err` on its first breach.
/// `validate_day` runs after every simulated day; `validate_state` checks a
/// standalone state (snapshot restore) without a previous day to compare to.

use crate::config::PlanConfig;
use crate::error::PlanError;
use crate::events::DailyState;
use crate::state::PlanState;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Check one committed day against the state it started from.
pub fn validate_day(
    prev: &PlanState,
    next: &PlanState,
    record: &DailyState,
    config: &PlanConfig,
) -> Result<(), PlanError> {
    validate_state(next, config)?;
    check_day_sequence(prev, next, record)?;
    check_trip_limits(record, config)?;
    check_plantings_match_trips(record)?;
    check_demand_monotonic(prev, next)?;
    Ok(())
}

/// Checks that need only a state and its configuration.
pub fn validate_state(state: &PlanState, config: &PlanConfig) -> Result<(), PlanError> {
    check_occupancy(state, config)?;
    state.pipeline.check_conservation()?;
    check_planted_matches_demand(state, config)?;
    check_pending_orders(state)?;
    Ok(())
}

/// Collect every breach instead of stopping at the first. Used for diagnostics.
pub fn collect_violations(state: &PlanState, config: &PlanConfig) -> Vec<String> {
    let checks: [fn(&PlanState, &PlanConfig) -> Result<(), PlanError>; 4] = [
        check_occupancy,
        |s, _| s.pipeline.check_conservation(),
        check_planted_matches_demand,
        |s, _| check_pending_orders(s),
    ];
    checks
        .iter()
        .filter_map(|check| check(state, config).err())
        .map(|e| e.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Individual checks (private)
// ---------------------------------------------------------------------------

fn violation(tag: &str, detail: String) -> PlanError {
    PlanError::InvariantViolation(format!("[INVARIANT:{}] {}", tag, detail))
}

fn check_occupancy(state: &PlanState, config: &PlanConfig) -> Result<(), PlanError> {
    let occupancy = state.pipeline.total();
    if occupancy > config.warehouse_capacity {
        return Err(violation(
            "warehouse_capacity",
            format!("occupancy {} exceeds capacity {}", occupancy, config.warehouse_capacity),
        ));
    }
    Ok(())
}

/// Planted so far equals initial demand minus outstanding, per species.
fn check_planted_matches_demand(state: &PlanState, config: &PlanConfig) -> Result<(), PlanError> {
    let outstanding = state.demand.species_totals();
    for (species, initial) in config.initial_species_demand() {
        let left = outstanding.get(&species).copied().unwrap_or(0);
        let planted = state.pipeline.cumulative_planted(species);
        if left > initial || planted != initial - left {
            return Err(violation(
                "planted_matches_demand",
                format!(
                    "species {}: initial={} outstanding={} planted={}",
                    species, initial, left, planted
                ),
            ));
        }
    }
    Ok(())
}

fn check_pending_orders(state: &PlanState) -> Result<(), PlanError> {
    for order in &state.pending_orders {
        if order.arrival_day < state.day {
            return Err(violation(
                "pending_orders",
                format!(
                    "order from {} due on day {} still pending on day {}",
                    order.provider, order.arrival_day, state.day
                ),
            ));
        }
    }
    Ok(())
}

fn check_day_sequence(prev: &PlanState, next: &PlanState, record: &DailyState) -> Result<(), PlanError> {
    if record.day != prev.day || next.day != prev.day + 1 {
        return Err(violation(
            "day_sequence",
            format!(
                "record day {} from state day {} to {}",
                record.day, prev.day, next.day
            ),
        ));
    }
    if record.total_cost != next.cost.total() || record.outstanding_demand != next.demand.total() {
        return Err(violation(
            "ledger_totals",
            format!("day {} record totals disagree with state", record.day),
        ));
    }
    Ok(())
}

fn check_trip_limits(record: &DailyState, config: &PlanConfig) -> Result<(), PlanError> {
    if !record.workday && !record.trips.is_empty() {
        return Err(violation(
            "weekend_trips",
            format!("day {} is not a workday but has {} trips", record.day, record.trips.len()),
        ));
    }
    let mut hours = 0i64;
    for trip in &record.trips {
        if trip.quantity() > config.vehicle_capacity {
            return Err(violation(
                "vehicle_capacity",
                format!(
                    "day {} trip {} carries {} over {}",
                    record.day,
                    trip.sequence,
                    trip.quantity(),
                    config.vehicle_capacity
                ),
            ));
        }
        hours += trip.total_hours();
    }
    if hours > config.labor_hours_per_workday || hours != record.labor_hours_used {
        return Err(violation(
            "labor_budget",
            format!(
                "day {} trips use {} micro-hours, recorded {}, budget {}",
                record.day, hours, record.labor_hours_used, config.labor_hours_per_workday
            ),
        ));
    }
    Ok(())
}

fn check_plantings_match_trips(record: &DailyState) -> Result<(), PlanError> {
    let loaded: u64 = record.trips.iter().map(|t| t.quantity()).sum();
    if loaded != record.planted_quantity() {
        return Err(violation(
            "plantings_match_trips",
            format!(
                "day {} loaded {} but planted {}",
                record.day,
                loaded,
                record.planted_quantity()
            ),
        ));
    }
    Ok(())
}

fn check_demand_monotonic(prev: &PlanState, next: &PlanState) -> Result<(), PlanError> {
    for (&destination, row) in &prev.demand.cells {
        for (&species, &before) in row {
            let after = next.demand.get(destination, species);
            if after > before {
                return Err(violation(
                    "demand_monotonic",
                    format!(
                        "destination {} species {} rose from {} to {}",
                        destination, species, before, after
                    ),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_initial_state;

    #[test]
    fn test_initial_state_is_valid() {
        let cfg = PlanConfig::default();
        assert_eq!(validate_state(&create_initial_state(&cfg), &cfg), Ok(()));
    }

    #[test]
    fn test_detects_overfull_warehouse() {
        let cfg = PlanConfig {
            warehouse_capacity: 10,
            ..PlanConfig::default()
        };
        let mut state = create_initial_state(&cfg);
        state.pipeline.receive(1, 11, 0);
        let err = validate_state(&state, &cfg).unwrap_err();
        assert!(err.to_string().contains("warehouse_capacity"));
    }

    #[test]
    fn test_collects_every_violation() {
        let cfg = PlanConfig {
            warehouse_capacity: 10,
            ..PlanConfig::default()
        };
        let mut state = create_initial_state(&cfg);
        state.pipeline.receive(1, 11, 0);
        state.day = 5;
        state.pending_orders.push(crate::domain::Order {
            provider: "late".to_string(),
            lines: Vec::new(),
            day_placed: 0,
            arrival_day: 1,
            purchase_cost: 0,
            transport_cost: 0,
        });
        assert_eq!(collect_violations(&state, &cfg).len(), 2);
    }
}
