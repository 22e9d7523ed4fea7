/// Planting Engine — Daily Transition
///
/// `(previous state, context) -> (next state, ledger record)`.
/// The previous state is never mutated; a clone is advanced instead.
///
/// Fixed order within a day:
///   1. ordering
///   2. pipeline advance, then arrivals
///   3. allocation (workdays only)
///   4. planting
///   5. bookkeeping

use crate::arithmetic::{checked_add, scaled_by_quantity};
use crate::calendar::WorkCalendar;
use crate::config::PlanConfig;
use crate::domain::{CostBreakdown, Order, PlantingRecord};
use crate::error::PlanError;
use crate::events::{AllocationSkip, DailyState};
use crate::procurement::{ProcurementDecision, ProcurementPlanner, ProjectedInventory};
use crate::state::PlanState;
use crate::trips::{plan_trips, TripPlan};

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Validated configuration plus everything derived from it once per run.
#[derive(Debug, Clone)]
pub struct PlanContext {
    config: PlanConfig,
    calendar: WorkCalendar,
    procurement: ProcurementPlanner,
}

impl PlanContext {
    /// Validate `config` and derive the calendar, rotation and sourcing.
    pub fn new(config: PlanConfig) -> Result<Self, PlanError> {
        config.validate()?;
        Ok(Self {
            calendar: WorkCalendar::new(config.start_date),
            procurement: ProcurementPlanner::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn procurement(&self) -> &ProcurementPlanner {
        &self.procurement
    }
}

// ---------------------------------------------------------------------------
// Day step
// ---------------------------------------------------------------------------

/// Simulate `state.day` and return the following state with its ledger record.
pub fn step_day(state: &PlanState, ctx: &PlanContext) -> Result<(PlanState, DailyState), PlanError> {
    let config = ctx.config();
    let mut next = state.clone();
    let day = next.day;
    let mut day_cost = CostBreakdown::default();

    // -- 1. ordering --
    let provider_turn = ctx
        .procurement()
        .cycle()
        .provider_for(day)
        .unwrap_or_default()
        .to_string();
    let projected = ProjectedInventory::from_parts(&next.pipeline, &next.pending_orders);
    let (order, procurement_skip) =
        match ctx
            .procurement()
            .plan_order(day, config, &projected, &next.demand)?
        {
            ProcurementDecision::Place(order) => {
                let occupancy = projected.occupancy + order.quantity();
                if occupancy > config.warehouse_capacity {
                    return Err(PlanError::CapacityViolation {
                        day,
                        detail: format!(
                            "order of {} would raise projected occupancy to {} over capacity {}",
                            order.quantity(),
                            occupancy,
                            config.warehouse_capacity
                        ),
                    });
                }
                day_cost.purchase = checked_add(day_cost.purchase, order.purchase_cost)?;
                day_cost.nursery_transport =
                    checked_add(day_cost.nursery_transport, order.transport_cost)?;
                tracing::debug!(
                    day,
                    provider = %order.provider,
                    quantity = order.quantity(),
                    arrival_day = order.arrival_day,
                    "order placed"
                );
                next.pending_orders.push(order.clone());
                (Some(order), None)
            }
            ProcurementDecision::Skip(skip) => {
                tracing::trace!(day, reason = skip.kind(), "no order");
                (None, Some(skip))
            }
        };

    // -- 2. pipeline advance, then arrivals --
    next.pipeline.advance_day();
    let (arrivals, pending): (Vec<Order>, Vec<Order>) = next
        .pending_orders
        .drain(..)
        .partition(|o| o.arrival_day <= day);
    next.pending_orders = pending;
    for order in &arrivals {
        for line in &order.lines {
            next.pipeline.receive(line.species, line.quantity, day);
        }
        tracing::debug!(day, provider = %order.provider, quantity = order.quantity(), "order arrived");
    }
    let occupancy = next.pipeline.total();
    if occupancy > config.warehouse_capacity {
        return Err(PlanError::CapacityViolation {
            day,
            detail: format!(
                "warehouse holds {} over capacity {}",
                occupancy, config.warehouse_capacity
            ),
        });
    }

    // -- 3. allocation --
    let workday = ctx.calendar().is_workday(day);
    let trip_plan = if workday {
        plan_trips(
            day,
            &next.pipeline.available_by_species(),
            &next.demand,
            config.labor_hours_per_workday,
            config,
        )?
    } else {
        TripPlan {
            skip: Some(AllocationSkip::NonWorkday),
            ..TripPlan::default()
        }
    };
    if let Some(skip) = &trip_plan.skip {
        tracing::trace!(day, reason = skip.kind(), "no trips");
    }

    // -- 4. planting --
    let mut plantings = Vec::new();
    for trip in &trip_plan.trips {
        if trip.quantity() > config.vehicle_capacity {
            return Err(PlanError::CapacityViolation {
                day,
                detail: format!(
                    "trip {} carries {} over vehicle capacity {}",
                    trip.sequence,
                    trip.quantity(),
                    config.vehicle_capacity
                ),
            });
        }
        for load in &trip.loads {
            next.pipeline.reserve_for_planting(load.species, load.quantity)?;
            next.demand.reduce(trip.destination, load.species, load.quantity)?;
            let cost = scaled_by_quantity(config.planting_cost_per_unit, load.quantity)?;
            day_cost.planting = checked_add(day_cost.planting, cost)?;
            plantings.push(PlantingRecord {
                day,
                trip: trip.sequence,
                destination: trip.destination,
                species: load.species,
                quantity: load.quantity,
                cost,
            });
        }
    }

    // -- 5. bookkeeping --
    next.cost.accumulate(&day_cost)?;
    let outstanding = next.demand.total();
    next.progress.observe(day, outstanding);
    next.day = day + 1;

    let record = DailyState {
        day,
        date: ctx.calendar().date_for(day),
        workday,
        provider_turn,
        order,
        procurement_skip,
        arrivals,
        trips: trip_plan.trips,
        plantings,
        allocation_skip: trip_plan.skip,
        excluded_destinations: trip_plan.excluded,
        labor_hours_used: trip_plan.hours_used,
        inventory: next.pipeline.snapshot(),
        day_cost,
        total_cost: next.cost.total(),
        outstanding_demand: outstanding,
    };
    Ok((next, record))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::arithmetic::{HOUR_SCALE, MONEY_SCALE};
    use crate::domain::{DemandMatrix, Provider, Species, TravelMatrix};
    use crate::state::create_initial_state;

    fn context(demand: u64) -> PlanContext {
        PlanContext::new(PlanConfig {
            species: vec![Species {
                id: 1,
                name: "agave".to_string(),
                treatment_hours: HOUR_SCALE,
                treatment_hours_per_unit: 0,
                mix_weight: 1,
            }],
            providers: vec![Provider {
                id: "moctezuma".to_string(),
                unit_costs: BTreeMap::from([(1, 26 * MONEY_SCALE)]),
                max_order_quantity: None,
            }],
            demand: DemandMatrix::new().with_cell(1, 1, demand),
            travel: TravelMatrix {
                sites: vec![18, 1],
                hours: vec![vec![0, HOUR_SCALE / 2], vec![HOUR_SCALE / 2, 0]],
            },
            ..PlanConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_step_does_not_mutate_input() {
        let ctx = context(500);
        let s0 = create_initial_state(ctx.config());
        let before = s0.clone();
        let (s1, _) = step_day(&s0, &ctx).unwrap();
        assert_eq!(s0, before);
        assert_eq!(s1.day, 1);
    }

    #[test]
    fn test_order_arrives_next_day_and_ripens_on_day_four() {
        let ctx = context(500);
        let mut state = create_initial_state(ctx.config());
        let mut records = Vec::new();
        for _ in 0..5 {
            let (next, record) = step_day(&state, &ctx).unwrap();
            records.push(record);
            state = next;
        }
        let order = records[0].order.as_ref().unwrap();
        assert_eq!(order.quantity(), 500);
        assert_eq!(order.arrival_day, 1);
        assert_eq!(records[1].arrivals.len(), 1);
        assert_eq!(records[1].inventory.species[&1].stages, vec![500, 0, 0]);
        for r in &records[..4] {
            assert!(r.trips.is_empty());
        }
        assert_eq!(records[4].planted_quantity(), 500);
        assert_eq!(records[4].outstanding_demand, 0);
    }

    #[test]
    fn test_costs_booked_at_order_and_planting() {
        let ctx = context(500);
        let s0 = create_initial_state(ctx.config());
        let (_, r0) = step_day(&s0, &ctx).unwrap();
        assert_eq!(r0.day_cost.purchase, 500 * 26 * MONEY_SCALE);
        assert_eq!(r0.day_cost.nursery_transport, 500 * 5_625);
        assert_eq!(r0.day_cost.planting, 0);
        assert_eq!(r0.total_cost, r0.day_cost.total());
    }

    #[test]
    fn test_progress_counter_advances_while_waiting() {
        let ctx = context(500);
        let s0 = create_initial_state(ctx.config());
        let (s1, _) = step_day(&s0, &ctx).unwrap();
        let (s2, _) = step_day(&s1, &ctx).unwrap();
        assert_eq!(s2.progress.days_without_progress, 2);
        assert_eq!(s2.progress.last_progress_day, None);
    }
}
