/// Planting Engine — Trip Allocator
///
/// Greedy, tiered allocation of one vehicle over one workday.
///
/// Ranking: (species matched desc, plantable volume desc, round trip asc, id asc).
/// Loading: shortest treatment first, each species capped by
/// min(available, destination demand, vehicle room).
/// Fitting: drop the last species until the trip fits the remaining hours;
/// a lone species is cut to the largest quantity that still fits.
///
/// Exclusions last for the current day only. Nothing here mutates state;
/// the scheduler commits the returned trips.

use std::collections::{BTreeMap, BTreeSet};

use crate::arithmetic::{checked_add, scaled_by_quantity};
use crate::config::PlanConfig;
use crate::domain::{DemandMatrix, DestinationId, SpeciesId, TransportTrip, TripLoad};
use crate::error::PlanError;
use crate::events::AllocationSkip;

/// Trips chosen for one workday.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripPlan {
    pub trips: Vec<TransportTrip>,
    /// Destinations with matching stock that could not be served today.
    pub excluded: Vec<DestinationId>,
    pub hours_used: i64,
    pub skip: Option<AllocationSkip>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    destination: DestinationId,
    matched_species: usize,
    plantable: u64,
    round_trip: i64,
}

/// Build the day's trips against a working copy of stock and demand.
pub fn plan_trips(
    day: u32,
    available: &BTreeMap<SpeciesId, u64>,
    demand: &DemandMatrix,
    hour_budget: i64,
    config: &PlanConfig,
) -> Result<TripPlan, PlanError> {
    let mut stock = available.clone();
    let mut open = demand.clone();
    let mut remaining = hour_budget;
    let mut excluded: BTreeSet<DestinationId> = BTreeSet::new();
    let mut plan = TripPlan::default();
    let mut saw_candidate = false;

    loop {
        let mut candidates = rank_candidates(config, &stock, &open, &excluded)?;
        if candidates.is_empty() {
            break;
        }
        saw_candidate = true;
        let best = candidates.remove(0);

        let Some(trip) = build_trip(day, &plan, best, &stock, &open, remaining, config)? else {
            tracing::trace!(day, destination = best.destination, "destination excluded for the day");
            excluded.insert(best.destination);
            continue;
        };

        for load in &trip.loads {
            if let Some(qty) = stock.get_mut(&load.species) {
                *qty -= load.quantity;
            }
            open.reduce(trip.destination, load.species, load.quantity)?;
        }
        remaining -= trip.total_hours();
        plan.hours_used = checked_add(plan.hours_used, trip.total_hours())?;
        tracing::debug!(
            day,
            sequence = trip.sequence,
            destination = trip.destination,
            quantity = trip.quantity(),
            hours = trip.total_hours(),
            "trip planned"
        );
        plan.trips.push(trip);
    }

    plan.excluded = excluded.into_iter().collect();
    if plan.trips.is_empty() {
        plan.skip = Some(if saw_candidate {
            AllocationSkip::NoViableDestination
        } else {
            AllocationSkip::NoPlantableInventory
        });
    }
    Ok(plan)
}

fn rank_candidates(
    config: &PlanConfig,
    stock: &BTreeMap<SpeciesId, u64>,
    open: &DemandMatrix,
    excluded: &BTreeSet<DestinationId>,
) -> Result<Vec<Candidate>, PlanError> {
    let mut out = Vec::new();
    for (&destination, row) in &open.cells {
        if destination == config.warehouse_id || excluded.contains(&destination) {
            continue;
        }
        let mut matched_species = 0;
        let mut plantable = 0;
        for (&species, &need) in row {
            let have = stock.get(&species).copied().unwrap_or(0);
            let q = need.min(have);
            if q > 0 {
                matched_species += 1;
                plantable += q;
            }
        }
        if matched_species == 0 {
            continue;
        }
        let round_trip = config
            .travel
            .round_trip(config.warehouse_id, destination)
            .ok_or_else(|| {
                PlanError::Configuration(format!("no travel time for destination {}", destination))
            })?;
        out.push(Candidate {
            destination,
            matched_species,
            plantable,
            round_trip,
        });
    }
    out.sort_by(|a, b| {
        b.matched_species
            .cmp(&a.matched_species)
            .then_with(|| b.plantable.cmp(&a.plantable))
            .then_with(|| a.round_trip.cmp(&b.round_trip))
            .then_with(|| a.destination.cmp(&b.destination))
    });
    Ok(out)
}

/// Fill, then shrink until the trip fits `remaining` hours. `None` when nothing fits.
fn build_trip(
    day: u32,
    plan: &TripPlan,
    candidate: Candidate,
    stock: &BTreeMap<SpeciesId, u64>,
    open: &DemandMatrix,
    remaining: i64,
    config: &PlanConfig,
) -> Result<Option<TransportTrip>, PlanError> {
    let destination = candidate.destination;

    let mut wanted: Vec<(SpeciesId, u64, i64, i64)> = Vec::new();
    for species in &config.species {
        let need = open.get(destination, species.id);
        let have = stock.get(&species.id).copied().unwrap_or(0);
        let cap = need.min(have);
        if cap > 0 {
            wanted.push((
                species.id,
                cap,
                species.treatment_hours,
                species.treatment_hours_per_unit,
            ));
        }
    }
    wanted.sort_by(|a, b| {
        a.2.cmp(&b.2)
            .then_with(|| a.3.cmp(&b.3))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut room = config.vehicle_capacity;
    let mut loads: Vec<TripLoad> = Vec::new();
    for (species, cap, _, _) in wanted {
        if room == 0 {
            break;
        }
        let quantity = cap.min(room);
        room -= quantity;
        loads.push(TripLoad { species, quantity });
    }

    loop {
        let Some((last_species, last_quantity)) = loads.last().map(|l| (l.species, l.quantity))
        else {
            return Ok(None);
        };
        let (treatment, handling) = load_hours(config, &loads)?;
        let total = checked_add(checked_add(candidate.round_trip, treatment)?, handling)?;
        if total <= remaining {
            return Ok(Some(TransportTrip {
                day,
                sequence: plan.trips.len() as u32 + 1,
                destination,
                loads,
                travel_hours: candidate.round_trip,
                handling_hours: handling,
                treatment_hours: treatment,
            }));
        }
        if loads.len() > 1 {
            loads.pop();
            continue;
        }
        let fitted = largest_fitting_quantity(config, last_species, candidate.round_trip, remaining)
            .min(last_quantity);
        if fitted == 0 || fitted == last_quantity {
            return Ok(None);
        }
        loads[0].quantity = fitted;
    }
}

/// (treatment, handling) hours for a set of loads.
fn load_hours(config: &PlanConfig, loads: &[TripLoad]) -> Result<(i64, i64), PlanError> {
    let mut treatment = 0;
    let mut handling = 0;
    for load in loads {
        if let Some(species) = config.species(load.species) {
            if load.quantity > 0 {
                treatment = checked_add(treatment, species.treatment_hours)?;
                treatment = checked_add(
                    treatment,
                    scaled_by_quantity(species.treatment_hours_per_unit, load.quantity)?,
                )?;
            }
        }
        handling = checked_add(
            handling,
            scaled_by_quantity(config.handling_hours_per_unit(), load.quantity)?,
        )?;
    }
    Ok((treatment, handling))
}

/// Largest single-species quantity whose trip fits in `remaining` hours.
fn largest_fitting_quantity(
    config: &PlanConfig,
    species: SpeciesId,
    round_trip: i64,
    remaining: i64,
) -> u64 {
    let Some(s) = config.species(species) else {
        return 0;
    };
    let slack = remaining - round_trip - s.treatment_hours;
    if slack < 0 {
        return 0;
    }
    let per_unit = s.treatment_hours_per_unit + config.handling_hours_per_unit();
    if per_unit <= 0 {
        return config.vehicle_capacity;
    }
    (slack / per_unit) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::HOUR_SCALE;
    use crate::domain::{Provider, Species, TravelMatrix};

    fn species(id: SpeciesId, treatment: i64) -> Species {
        Species {
            id,
            name: format!("s{}", id),
            treatment_hours: treatment,
            treatment_hours_per_unit: 0,
            mix_weight: 1,
        }
    }

    /// Warehouse 18 plus destinations 1 and 2; one-way hours given per destination.
    fn config(one_way: [i64; 2]) -> PlanConfig {
        let [a, b] = one_way;
        PlanConfig {
            species: vec![species(1, HOUR_SCALE), species(2, HOUR_SCALE / 2)],
            providers: vec![Provider {
                id: "p".to_string(),
                unit_costs: BTreeMap::from([(1, 1), (2, 1)]),
                max_order_quantity: None,
            }],
            travel: TravelMatrix {
                sites: vec![18, 1, 2],
                hours: vec![vec![0, a, b], vec![a, 0, a + b], vec![b, a + b, 0]],
            },
            ..PlanConfig::default()
        }
    }

    #[test]
    fn test_two_full_trips_then_budget_exhausted() {
        let cfg = config([HOUR_SCALE / 2, HOUR_SCALE / 2]);
        let demand = DemandMatrix::new().with_cell(1, 1, 1_200);
        let stock = BTreeMap::from([(1, 1_200)]);
        let plan = plan_trips(4, &stock, &demand, cfg.labor_hours_per_workday, &cfg).unwrap();
        let loads: Vec<u64> = plan.trips.iter().map(|t| t.quantity()).collect();
        assert_eq!(loads, vec![524, 524]);
        assert!(plan.hours_used <= cfg.labor_hours_per_workday);
        assert_eq!(plan.trips[1].sequence, 2);
        assert_eq!(plan.excluded, vec![1]);
    }

    #[test]
    fn test_never_loads_more_than_demand_or_stock() {
        let cfg = config([HOUR_SCALE / 2, HOUR_SCALE / 2]);
        let demand = DemandMatrix::new().with_cell(1, 1, 90).with_cell(1, 2, 500);
        let stock = BTreeMap::from([(1, 300), (2, 40)]);
        let plan = plan_trips(0, &stock, &demand, cfg.labor_hours_per_workday, &cfg).unwrap();
        let trip = &plan.trips[0];
        assert_eq!(trip.loads.len(), 2);
        // Shorter treatment loads first.
        assert_eq!(trip.loads[0], TripLoad { species: 2, quantity: 40 });
        assert_eq!(trip.loads[1], TripLoad { species: 1, quantity: 90 });
        assert_eq!(plan.trips.len(), 1);
    }

    #[test]
    fn test_prefers_more_matched_species_then_closer() {
        let cfg = config([2 * HOUR_SCALE, HOUR_SCALE / 4]);
        let demand = DemandMatrix::new()
            .with_cell(1, 1, 10)
            .with_cell(1, 2, 10)
            .with_cell(2, 1, 10);
        let stock = BTreeMap::from([(1, 100), (2, 100)]);
        let plan = plan_trips(0, &stock, &demand, 12 * HOUR_SCALE, &cfg).unwrap();
        assert_eq!(plan.trips[0].destination, 1);
        assert_eq!(plan.trips[1].destination, 2);
    }

    #[test]
    fn test_lone_species_cut_to_fit() {
        let cfg = config([HOUR_SCALE, HOUR_SCALE]);
        let demand = DemandMatrix::new().with_cell(1, 1, 524);
        let stock = BTreeMap::from([(1, 524)]);
        // 2h travel + 1h treatment leaves 0.5h of handling.
        let budget = 3 * HOUR_SCALE + HOUR_SCALE / 2;
        let plan = plan_trips(0, &stock, &demand, budget, &cfg).unwrap();
        assert_eq!(plan.trips.len(), 1);
        let trip = &plan.trips[0];
        assert!(trip.quantity() < 524 && trip.quantity() > 0);
        assert!(trip.total_hours() <= budget);
    }

    #[test]
    fn test_no_matching_stock() {
        let cfg = config([HOUR_SCALE, HOUR_SCALE]);
        let demand = DemandMatrix::new().with_cell(1, 1, 10);
        let stock = BTreeMap::from([(2, 50)]);
        let plan = plan_trips(0, &stock, &demand, cfg.labor_hours_per_workday, &cfg).unwrap();
        assert!(plan.trips.is_empty());
        assert_eq!(plan.skip, Some(AllocationSkip::NoPlantableInventory));
    }

    #[test]
    fn test_destination_too_far_for_remaining_hours() {
        let cfg = config([HOUR_SCALE, HOUR_SCALE]);
        let demand = DemandMatrix::new().with_cell(1, 1, 10);
        let stock = BTreeMap::from([(1, 50)]);
        let plan = plan_trips(0, &stock, &demand, HOUR_SCALE, &cfg).unwrap();
        assert!(plan.trips.is_empty());
        assert_eq!(plan.skip, Some(AllocationSkip::NoViableDestination));
        assert_eq!(plan.excluded, vec![1]);
    }
}
