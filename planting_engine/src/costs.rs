/// Planting Engine — Cost Analysis
///
/// Post-run comparison of what a ledger actually spent against the
/// theoretical optimum: every demanded plant bought once from its
/// cheapest provider, shipped once and planted once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::arithmetic::{checked_add, scaled_by_quantity};
use crate::config::PlanConfig;
use crate::domain::{CostBreakdown, SpeciesId};
use crate::error::PlanError;
use crate::events::DailyState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCost {
    pub demanded: u64,
    pub ordered: u64,
    pub planted: u64,
    /// Purchase cost actually paid.
    pub purchase_cost: i64,
    /// Purchase cost had every ordered plant come from the cheapest provider.
    pub cheapest_purchase_cost: i64,
    /// Order lines placed with a provider that was not the cheapest.
    pub off_cheapest_lines: u32,
}

impl SpeciesCost {
    pub fn excess_ordered(&self) -> u64 {
        self.ordered.saturating_sub(self.planted)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub species: BTreeMap<SpeciesId, SpeciesCost>,
    pub actual: CostBreakdown,
    pub optimal: CostBreakdown,
}

impl CostAnalysis {
    /// Actual minus optimal total. Zero for a perfectly sourced, fully planted run.
    pub fn overspend(&self) -> i64 {
        self.actual.total() - self.optimal.total()
    }

    pub fn total_ordered(&self) -> u64 {
        self.species.values().map(|s| s.ordered).sum()
    }

    pub fn total_planted(&self) -> u64 {
        self.species.values().map(|s| s.planted).sum()
    }
}

/// Break down the cost of `ledger` per species and against the optimum.
pub fn analyze_costs(config: &PlanConfig, ledger: &[DailyState]) -> Result<CostAnalysis, PlanError> {
    let cheapest: BTreeMap<SpeciesId, i64> = config
        .providers
        .iter()
        .flat_map(|p| p.unit_costs.iter())
        .fold(BTreeMap::new(), |mut acc, (&species, &cost)| {
            let entry = acc.entry(species).or_insert(cost);
            *entry = (*entry).min(cost);
            acc
        });

    let mut analysis = CostAnalysis::default();
    for (species, demanded) in config.initial_species_demand() {
        analysis.species.entry(species).or_default().demanded = demanded;
    }

    for day in ledger {
        analysis.actual.accumulate(&day.day_cost)?;
        if let Some(order) = &day.order {
            for line in &order.lines {
                let best = cheapest.get(&line.species).copied().unwrap_or(line.unit_cost);
                let entry = analysis.species.entry(line.species).or_default();
                entry.ordered += line.quantity;
                entry.purchase_cost = checked_add(
                    entry.purchase_cost,
                    scaled_by_quantity(line.unit_cost, line.quantity)?,
                )?;
                entry.cheapest_purchase_cost =
                    checked_add(entry.cheapest_purchase_cost, scaled_by_quantity(best, line.quantity)?)?;
                if line.unit_cost > best {
                    entry.off_cheapest_lines += 1;
                }
            }
        }
        for planting in &day.plantings {
            analysis.species.entry(planting.species).or_default().planted += planting.quantity;
        }
    }

    for (species, cost) in &analysis.species {
        let best = cheapest.get(species).copied().unwrap_or(0);
        let optimal = &mut analysis.optimal;
        optimal.purchase = checked_add(optimal.purchase, scaled_by_quantity(best, cost.demanded)?)?;
        optimal.nursery_transport = checked_add(
            optimal.nursery_transport,
            scaled_by_quantity(config.nursery_transport_cost_per_unit, cost.demanded)?,
        )?;
        optimal.planting = checked_add(
            optimal.planting,
            scaled_by_quantity(config.planting_cost_per_unit, cost.demanded)?,
        )?;
    }
    Ok(analysis)
}
