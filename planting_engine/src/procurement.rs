/// Planting Engine — Procurement Planner
///
/// One order per day at most, from the provider whose rotation turn it is.
/// Sizing moves the warehouse toward the outstanding-demand mix, bounded by
/// the order cap, projected warehouse headroom and uncovered demand.
///
/// The proportional mix is a sizing hint only. Nothing else depends on it.

use std::collections::{BTreeMap, BTreeSet};

use crate::arithmetic::{checked_add, scaled_by_quantity};
use crate::config::PlanConfig;
use crate::domain::{DemandMatrix, Order, OrderLine, Provider, SpeciesId};
use crate::error::PlanError;
use crate::events::ProcurementSkip;
use crate::pipeline::AcclimatizationPipeline;

// ---------------------------------------------------------------------------
// Provider rotation
// ---------------------------------------------------------------------------

/// Ordered provider cycle. Advances one position per calendar day,
/// whether or not an order is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCycle {
    order: Vec<String>,
}

impl ProviderCycle {
    pub fn new(providers: &[Provider]) -> Self {
        Self {
            order: providers.iter().map(|p| p.id.clone()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Provider whose turn it is on `day`.
    pub fn provider_for(&self, day: u32) -> Option<&str> {
        if self.order.is_empty() {
            return None;
        }
        self.order
            .get(day as usize % self.order.len())
            .map(|s| s.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sourcing assignment
// ---------------------------------------------------------------------------

/// Provider chosen to source a species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcingChoice {
    pub provider: String,
    pub unit_cost: i64,
}

/// Assign every supplied species to its cheapest provider.
/// Ties go to the provider that comes first in the rotation.
pub fn assign_sourcing(providers: &[Provider]) -> BTreeMap<SpeciesId, SourcingChoice> {
    let mut best: BTreeMap<SpeciesId, SourcingChoice> = BTreeMap::new();
    for provider in providers {
        for (&species, &unit_cost) in &provider.unit_costs {
            let better = best
                .get(&species)
                .map(|current| unit_cost < current.unit_cost)
                .unwrap_or(true);
            if better {
                best.insert(
                    species,
                    SourcingChoice {
                        provider: provider.id.clone(),
                        unit_cost,
                    },
                );
            }
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Projected inventory
// ---------------------------------------------------------------------------

/// Warehouse stock as it will stand once every pending order has arrived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectedInventory {
    pub held: BTreeMap<SpeciesId, u64>,
    pub occupancy: u64,
}

impl ProjectedInventory {
    pub fn from_parts(pipeline: &AcclimatizationPipeline, pending: &[Order]) -> Self {
        let mut held: BTreeMap<SpeciesId, u64> = BTreeMap::new();
        for (species, _) in pipeline.available_by_species() {
            held.insert(species, pipeline.held(species));
        }
        for order in pending {
            for line in &order.lines {
                *held.entry(line.species).or_default() += line.quantity;
            }
        }
        let occupancy = held.values().sum();
        Self { held, occupancy }
    }

    pub fn held(&self, species: SpeciesId) -> u64 {
        self.held.get(&species).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Outcome of one procurement decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcurementDecision {
    Place(Order),
    Skip(ProcurementSkip),
}

/// Rotation plus sourcing, fixed for the run.
#[derive(Debug, Clone)]
pub struct ProcurementPlanner {
    cycle: ProviderCycle,
    assigned: BTreeMap<String, BTreeSet<SpeciesId>>,
}

impl ProcurementPlanner {
    pub fn new(config: &PlanConfig) -> Self {
        let mut assigned: BTreeMap<String, BTreeSet<SpeciesId>> = config
            .providers
            .iter()
            .map(|p| (p.id.clone(), BTreeSet::new()))
            .collect();
        for (species, choice) in assign_sourcing(&config.providers) {
            assigned.entry(choice.provider).or_default().insert(species);
        }
        Self {
            cycle: ProviderCycle::new(&config.providers),
            assigned,
        }
    }

    pub fn cycle(&self) -> &ProviderCycle {
        &self.cycle
    }

    /// Species a provider is responsible for ordering.
    pub fn assigned_species(&self, provider: &str) -> Option<&BTreeSet<SpeciesId>> {
        self.assigned.get(provider)
    }

    /// Decide today's order.
    pub fn plan_order(
        &self,
        day: u32,
        config: &PlanConfig,
        projected: &ProjectedInventory,
        demand: &DemandMatrix,
    ) -> Result<ProcurementDecision, PlanError> {
        let provider = self
            .cycle
            .provider_for(day)
            .and_then(|id| config.providers.iter().find(|p| p.id == id))
            .ok_or_else(|| PlanError::Configuration("provider rotation is empty".to_string()))?;

        let outstanding = demand.species_totals();
        let total_outstanding: u64 = outstanding.values().sum();

        // Assigned species whose demand is not yet covered by held or pending stock.
        let uncovered: Vec<(SpeciesId, u64)> = self
            .assigned_species(&provider.id)
            .into_iter()
            .flatten()
            .filter_map(|&species| {
                let need = outstanding.get(&species).copied().unwrap_or(0);
                let gap = need.saturating_sub(projected.held(species));
                (gap > 0).then_some((species, gap))
            })
            .collect();
        if uncovered.is_empty() {
            return Ok(ProcurementDecision::Skip(ProcurementSkip::NoViableProvider {
                provider: provider.id.clone(),
            }));
        }

        let mut deficits: Vec<(SpeciesId, u64)> = uncovered
            .into_iter()
            .filter_map(|(species, gap)| {
                let need = outstanding.get(&species).copied().unwrap_or(0);
                let target = mix_target(config.warehouse_capacity, need, total_outstanding);
                let deficit = target.saturating_sub(projected.held(species)).min(gap);
                (deficit > 0).then_some((species, deficit))
            })
            .collect();
        if deficits.is_empty() {
            return Ok(ProcurementDecision::Skip(ProcurementSkip::TargetMixSatisfied {
                provider: provider.id.clone(),
            }));
        }
        let headroom = config.warehouse_capacity.saturating_sub(projected.occupancy);
        if headroom == 0 {
            return Ok(ProcurementDecision::Skip(ProcurementSkip::WarehouseFull {
                occupancy: projected.occupancy,
                capacity: config.warehouse_capacity,
            }));
        }
        let cap = provider
            .max_order_quantity
            .map_or(config.max_order_quantity, |c| c.min(config.max_order_quantity));
        let mut room = headroom.min(cap);

        deficits.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut lines = Vec::new();
        for (species, deficit) in deficits {
            if room == 0 {
                break;
            }
            let quantity = deficit.min(room);
            room -= quantity;
            lines.push(OrderLine {
                species,
                quantity,
                unit_cost: provider.unit_costs.get(&species).copied().unwrap_or(0),
            });
        }
        lines.sort_by_key(|l| l.species);

        let mut purchase_cost = 0;
        let mut transport_cost = 0;
        for line in &lines {
            purchase_cost = checked_add(purchase_cost, scaled_by_quantity(line.unit_cost, line.quantity)?)?;
            transport_cost = checked_add(
                transport_cost,
                scaled_by_quantity(config.nursery_transport_cost_per_unit, line.quantity)?,
            )?;
        }

        let arrival_day = day.checked_add(config.lead_time_days).ok_or_else(|| {
            PlanError::Overflow(format!("day {} + lead time {}", day, config.lead_time_days))
        })?;
        Ok(ProcurementDecision::Place(Order {
            provider: provider.id.clone(),
            lines,
            day_placed: day,
            arrival_day,
            purchase_cost,
            transport_cost,
        }))
    }
}

/// `ceil(capacity * need / total)`: the species' share of a full warehouse.
fn mix_target(capacity: u64, need: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let scaled = u128::from(capacity) * u128::from(need);
    let total = u128::from(total);
    let target = (scaled + total - 1) / total;
    u64::try_from(target).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::MONEY_SCALE;
    use crate::domain::Species;

    fn species(id: SpeciesId) -> Species {
        Species {
            id,
            name: format!("s{}", id),
            treatment_hours: 0,
            treatment_hours_per_unit: 0,
            mix_weight: 1,
        }
    }

    fn provider(id: &str, costs: &[(SpeciesId, i64)]) -> Provider {
        Provider {
            id: id.to_string(),
            unit_costs: costs.iter().copied().collect(),
            max_order_quantity: None,
        }
    }

    fn config(capacity: u64) -> PlanConfig {
        PlanConfig {
            warehouse_capacity: capacity,
            species: vec![species(1), species(2)],
            providers: vec![
                provider("a", &[(1, 10 * MONEY_SCALE), (2, 30 * MONEY_SCALE)]),
                provider("b", &[(2, 20 * MONEY_SCALE)]),
            ],
            ..PlanConfig::default()
        }
    }

    #[test]
    fn test_cycle_wraps_every_len_days() {
        let cfg = config(100);
        let cycle = ProviderCycle::new(&cfg.providers);
        assert_eq!(cycle.provider_for(0), Some("a"));
        assert_eq!(cycle.provider_for(1), Some("b"));
        assert_eq!(cycle.provider_for(2), Some("a"));
    }

    #[test]
    fn test_sourcing_prefers_cheapest() {
        let cfg = config(100);
        let sourcing = assign_sourcing(&cfg.providers);
        assert_eq!(sourcing[&1].provider, "a");
        assert_eq!(sourcing[&2].provider, "b");
    }

    #[test]
    fn test_sourcing_tie_goes_to_first_in_rotation() {
        let providers = vec![provider("x", &[(1, 5)]), provider("y", &[(1, 5)])];
        assert_eq!(assign_sourcing(&providers)[&1].provider, "x");
    }

    #[test]
    fn test_order_shrinks_to_headroom() {
        let cfg = config(1_000);
        let planner = ProcurementPlanner::new(&cfg);
        let demand = DemandMatrix::new().with_cell(1, 1, 5_000);
        let projected = ProjectedInventory {
            held: BTreeMap::from([(1, 800)]),
            occupancy: 800,
        };
        let ProcurementDecision::Place(order) =
            planner.plan_order(0, &cfg, &projected, &demand).unwrap()
        else {
            panic!("expected an order");
        };
        assert_eq!(order.quantity(), 200);
        assert_eq!(order.arrival_day, 1);
        assert_eq!(order.purchase_cost, 200 * 10 * MONEY_SCALE);
    }

    #[test]
    fn test_full_warehouse_skips() {
        let cfg = config(1_000);
        let planner = ProcurementPlanner::new(&cfg);
        let demand = DemandMatrix::new().with_cell(1, 1, 5_000);
        let projected = ProjectedInventory {
            held: BTreeMap::from([(2, 1_000)]),
            occupancy: 1_000,
        };
        let decision = planner.plan_order(0, &cfg, &projected, &demand).unwrap();
        assert!(matches!(
            decision,
            ProcurementDecision::Skip(ProcurementSkip::WarehouseFull { .. })
        ));
    }

    #[test]
    fn test_never_orders_beyond_outstanding() {
        let cfg = config(10_000);
        let planner = ProcurementPlanner::new(&cfg);
        let demand = DemandMatrix::new().with_cell(1, 1, 300);
        let projected = ProjectedInventory {
            held: BTreeMap::from([(1, 100)]),
            occupancy: 100,
        };
        let ProcurementDecision::Place(order) =
            planner.plan_order(0, &cfg, &projected, &demand).unwrap()
        else {
            panic!("expected an order");
        };
        assert_eq!(order.quantity_of(1), 200);
    }

    #[test]
    fn test_provider_without_uncovered_species_is_not_viable() {
        let cfg = config(10_000);
        let planner = ProcurementPlanner::new(&cfg);
        // Day 1 is provider "b", which only sources species 2.
        let demand = DemandMatrix::new().with_cell(1, 1, 300);
        let decision = planner
            .plan_order(1, &cfg, &ProjectedInventory::default(), &demand)
            .unwrap();
        assert_eq!(
            decision,
            ProcurementDecision::Skip(ProcurementSkip::NoViableProvider {
                provider: "b".to_string()
            })
        );
    }

    #[test]
    fn test_mix_target_limits_dominant_species() {
        let cfg = PlanConfig {
            providers: vec![provider("a", &[(1, 1), (2, 1)])],
            ..config(1_000)
        };
        let planner = ProcurementPlanner::new(&cfg);
        let demand = DemandMatrix::new().with_cell(1, 1, 3_000).with_cell(1, 2, 1_000);
        let projected = ProjectedInventory {
            held: BTreeMap::from([(1, 750)]),
            occupancy: 750,
        };
        let ProcurementDecision::Place(order) =
            planner.plan_order(0, &cfg, &projected, &demand).unwrap()
        else {
            panic!("expected an order");
        };
        // Species 1 already holds its 750 share; species 2 gets the remaining 250.
        assert_eq!(order.quantity_of(1), 0);
        assert_eq!(order.quantity_of(2), 250);
    }

    #[test]
    fn test_order_respects_provider_cap() {
        let mut cfg = config(10_000);
        cfg.providers[0].max_order_quantity = Some(120);
        let planner = ProcurementPlanner::new(&cfg);
        let demand = DemandMatrix::new().with_cell(1, 1, 5_000);
        let ProcurementDecision::Place(order) = planner
            .plan_order(0, &cfg, &ProjectedInventory::default(), &demand)
            .unwrap()
        else {
            panic!("expected an order");
        };
        assert_eq!(order.quantity(), 120);
    }
}
