//! Scenario loading — JSON file to validated `PlanConfig`.
//!
//! Scenario files carry real-valued hours and money; they are converted to
//! fixed point here, once. Omitted constants fall back to the engine defaults.
//!
//! Demand may be given per cell (`demand`: destination → species → plants)
//! or per area (`demand_hectares`: destination → hectares), in which case
//! each species' `mix_weight` is read as plants per hectare.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use planting_engine::arithmetic::{to_fixed, HOUR_SCALE, MONEY_SCALE};
use planting_engine::domain::{
    DemandMatrix, DestinationId, Provider, Species, SpeciesId, TravelMatrix,
};
use planting_engine::PlanConfig;

use crate::error::RuntimeError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    pub start_date: Option<NaiveDate>,
    pub warehouse_id: Option<DestinationId>,
    pub warehouse_capacity: Option<u64>,
    pub vehicle_capacity: Option<u64>,
    pub max_order_quantity: Option<u64>,
    pub lead_time_days: Option<u32>,
    pub acclimatization_days: Option<u32>,
    pub labor_hours_per_workday: Option<f64>,
    pub load_hours_per_unit: Option<f64>,
    pub unload_hours_per_unit: Option<f64>,
    pub planting_cost_per_unit: Option<f64>,
    pub nursery_transport_cost_per_unit: Option<f64>,
    pub stall_window_days: Option<u32>,
    pub species: Vec<ScenarioSpecies>,
    pub providers: Vec<ScenarioProvider>,
    #[serde(default)]
    pub demand: BTreeMap<DestinationId, BTreeMap<SpeciesId, u64>>,
    #[serde(default)]
    pub demand_hectares: BTreeMap<DestinationId, f64>,
    pub travel: ScenarioTravel,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSpecies {
    pub id: SpeciesId,
    pub name: String,
    pub treatment_hours: f64,
    #[serde(default)]
    pub treatment_hours_per_unit: f64,
    #[serde(default)]
    pub mix_weight: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioProvider {
    pub id: String,
    pub unit_costs: BTreeMap<SpeciesId, f64>,
    #[serde(default)]
    pub max_order_quantity: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioTravel {
    pub sites: Vec<DestinationId>,
    /// One-way hours, `hours[i][j]` from `sites[i]` to `sites[j]`.
    pub hours: Vec<Vec<f64>>,
}

/// Read, convert and validate a scenario file.
pub fn load_scenario(path: &Path) -> Result<PlanConfig, RuntimeError> {
    let text = fs::read_to_string(path)?;
    parse_scenario(&text)
}

/// Convert and validate scenario JSON text.
pub fn parse_scenario(text: &str) -> Result<PlanConfig, RuntimeError> {
    let file: ScenarioFile = serde_json::from_str(text)?;
    let config = file.into_config()?;
    config.validate()?;
    Ok(config)
}

impl ScenarioFile {
    pub fn into_config(self) -> Result<PlanConfig, RuntimeError> {
        let defaults = PlanConfig::default();
        let hours = |v: Option<f64>, d: i64| v.map_or(Ok(d), |v| to_fixed(v, HOUR_SCALE));
        let money = |v: Option<f64>, d: i64| v.map_or(Ok(d), |v| to_fixed(v, MONEY_SCALE));

        let species = self
            .species
            .iter()
            .map(|s| {
                Ok(Species {
                    id: s.id,
                    name: s.name.clone(),
                    treatment_hours: to_fixed(s.treatment_hours, HOUR_SCALE)?,
                    treatment_hours_per_unit: to_fixed(s.treatment_hours_per_unit, HOUR_SCALE)?,
                    mix_weight: s.mix_weight,
                })
            })
            .collect::<Result<Vec<_>, RuntimeError>>()?;

        let providers = self
            .providers
            .iter()
            .map(|p| {
                let unit_costs = p
                    .unit_costs
                    .iter()
                    .map(|(&id, &cost)| Ok((id, to_fixed(cost, MONEY_SCALE)?)))
                    .collect::<Result<BTreeMap<_, _>, RuntimeError>>()?;
                Ok(Provider {
                    id: p.id.clone(),
                    unit_costs,
                    max_order_quantity: p.max_order_quantity,
                })
            })
            .collect::<Result<Vec<_>, RuntimeError>>()?;

        let demand = build_demand(&self.demand, &self.demand_hectares, &species)?;

        let travel = TravelMatrix {
            sites: self.travel.sites.clone(),
            hours: self
                .travel
                .hours
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|&h| to_fixed(h, HOUR_SCALE))
                        .collect::<Result<Vec<i64>, _>>()
                })
                .collect::<Result<Vec<Vec<i64>>, _>>()?,
        };

        Ok(PlanConfig {
            start_date: self.start_date.unwrap_or(defaults.start_date),
            warehouse_id: self.warehouse_id.unwrap_or(defaults.warehouse_id),
            warehouse_capacity: self.warehouse_capacity.unwrap_or(defaults.warehouse_capacity),
            vehicle_capacity: self.vehicle_capacity.unwrap_or(defaults.vehicle_capacity),
            max_order_quantity: self.max_order_quantity.unwrap_or(defaults.max_order_quantity),
            lead_time_days: self.lead_time_days.unwrap_or(defaults.lead_time_days),
            acclimatization_days: self
                .acclimatization_days
                .unwrap_or(defaults.acclimatization_days),
            labor_hours_per_workday: hours(
                self.labor_hours_per_workday,
                defaults.labor_hours_per_workday,
            )?,
            load_hours_per_unit: hours(self.load_hours_per_unit, defaults.load_hours_per_unit)?,
            unload_hours_per_unit: hours(
                self.unload_hours_per_unit,
                defaults.unload_hours_per_unit,
            )?,
            planting_cost_per_unit: money(
                self.planting_cost_per_unit,
                defaults.planting_cost_per_unit,
            )?,
            nursery_transport_cost_per_unit: money(
                self.nursery_transport_cost_per_unit,
                defaults.nursery_transport_cost_per_unit,
            )?,
            stall_window_days: self.stall_window_days.unwrap_or(defaults.stall_window_days),
            species,
            providers,
            demand,
            travel,
        })
    }
}

/// Hectare demand above this many plants per cell is rejected.
const MAX_PLANTS_PER_CELL: f64 = (1u64 << 53) as f64;

/// Merge per-cell demand with area-based demand. A destination may use one form only.
fn build_demand(
    cells: &BTreeMap<DestinationId, BTreeMap<SpeciesId, u64>>,
    hectares: &BTreeMap<DestinationId, f64>,
    species: &[Species],
) -> Result<DemandMatrix, RuntimeError> {
    let mut demand = DemandMatrix::new();
    for (&destination, row) in cells {
        for (&species_id, &qty) in row {
            demand = demand.with_cell(destination, species_id, qty);
        }
    }
    for (&destination, &area) in hectares {
        if cells.contains_key(&destination) {
            return Err(RuntimeError::Scenario(format!(
                "destination {} has both cell and hectare demand",
                destination
            )));
        }
        if !area.is_finite() || area < 0.0 {
            return Err(RuntimeError::Scenario(format!(
                "destination {} has invalid area {}",
                destination, area
            )));
        }
        for s in species.iter().filter(|s| s.mix_weight > 0) {
            // Whole plants only; rounded once at load time.
            let plants = (area * s.mix_weight as f64).round();
            if plants >= MAX_PLANTS_PER_CELL {
                return Err(RuntimeError::Scenario(format!(
                    "destination {} area {} gives {} plants of species {}",
                    destination, area, plants, s.id
                )));
            }
            demand = demand.with_cell(destination, s.id, plants as u64);
        }
    }
    Ok(demand)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "species": [
            {"id": 1, "name": "agave", "treatment_hours": 1.0, "mix_weight": 33},
            {"id": 5, "name": "opuntia", "treatment_hours": 0.3333333, "mix_weight": 39}
        ],
        "providers": [
            {"id": "laguna_seca", "unit_costs": {"1": 26.0}},
            {"id": "venado", "unit_costs": {"5": 18.0}, "max_order_quantity": 4000}
        ],
        "demand": {"1": {"1": 120, "5": 40}},
        "demand_hectares": {"2": 2.5},
        "travel": {"sites": [18, 1, 2], "hours": [[0, 0.5, 0.75], [0.5, 0, 1.0], [0.75, 1.0, 0]]}
    }"#;

    #[test]
    fn test_parse_applies_defaults_and_fixed_point() {
        let cfg = parse_scenario(SCENARIO).unwrap();
        assert_eq!(cfg.warehouse_capacity, 10_000);
        assert_eq!(cfg.labor_hours_per_workday, 6 * HOUR_SCALE);
        assert_eq!(cfg.nursery_transport_cost_per_unit, 5_625);
        assert_eq!(cfg.species[1].treatment_hours, 333_333);
        assert_eq!(cfg.providers[0].unit_costs[&1], 26 * MONEY_SCALE);
        assert_eq!(cfg.travel.one_way(18, 2), Some(750_000));
    }

    #[test]
    fn test_hectares_expand_by_mix_weight() {
        let cfg = parse_scenario(SCENARIO).unwrap();
        assert_eq!(cfg.demand.get(2, 1), 83);
        assert_eq!(cfg.demand.get(2, 5), 98);
        assert_eq!(cfg.demand.get(1, 5), 40);
    }

    #[test]
    fn test_oversized_area_is_rejected() {
        let text = SCENARIO.replacen("{\"2\": 2.5}", "{\"2\": 1e300}", 1);
        assert!(matches!(parse_scenario(&text), Err(RuntimeError::Scenario(_))));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let text = SCENARIO.replacen("\"species\"", "\"colour\": 1, \"species\"", 1);
        assert!(matches!(parse_scenario(&text), Err(RuntimeError::Json(_))));
    }

    #[test]
    fn test_invalid_config_surfaces_as_plan_error() {
        let text = SCENARIO.replacen("\"species\"", "\"vehicle_capacity\": 0, \"species\"", 1);
        assert!(matches!(parse_scenario(&text), Err(RuntimeError::Plan(_))));
    }
}
