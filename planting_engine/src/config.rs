/// Planting Engine — Static Configuration
///
/// Loaded once before day 0 and never mutated during a run.
/// Hours: micro-hours. Money: MONEY_SCALE fixed-point.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::arithmetic::{validate_identifier, HOUR_SCALE, MONEY_SCALE};
use crate::domain::{DemandMatrix, DestinationId, Provider, Species, SpeciesId, TravelMatrix};
use crate::error::PlanError;

/// Upper bound on order lead time and on acclimatization stages.
pub const MAX_PIPELINE_DAYS: u32 = 365;

/// All static planning parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    pub start_date: NaiveDate,
    pub warehouse_id: DestinationId,
    pub warehouse_capacity: u64,
    pub vehicle_capacity: u64,
    pub max_order_quantity: u64,
    pub lead_time_days: u32,
    pub acclimatization_days: u32,
    pub labor_hours_per_workday: i64,
    pub load_hours_per_unit: i64,
    pub unload_hours_per_unit: i64,
    pub planting_cost_per_unit: i64,
    pub nursery_transport_cost_per_unit: i64,
    pub stall_window_days: u32,
    pub species: Vec<Species>,
    /// Rotation cycle, in order.
    pub providers: Vec<Provider>,
    pub demand: DemandMatrix,
    pub travel: TravelMatrix,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            // 2025-09-01 is a Monday.
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap_or_default(),
            warehouse_id: 18,
            warehouse_capacity: 10_000,
            vehicle_capacity: 524,
            max_order_quantity: 8_000,
            lead_time_days: 1,
            acclimatization_days: 3,
            labor_hours_per_workday: 6 * HOUR_SCALE,
            load_hours_per_unit: HOUR_SCALE / 2 / 524,
            unload_hours_per_unit: HOUR_SCALE / 2 / 524,
            planting_cost_per_unit: 20 * MONEY_SCALE,
            nursery_transport_cost_per_unit: 5_625,
            stall_window_days: 21,
            species: Vec::new(),
            providers: Vec::new(),
            demand: DemandMatrix::default(),
            travel: TravelMatrix::default(),
        }
    }
}

impl PlanConfig {
    pub fn species(&self, id: SpeciesId) -> Option<&Species> {
        self.species.iter().find(|s| s.id == id)
    }

    /// Per-unit handling time: loading plus unloading.
    pub fn handling_hours_per_unit(&self) -> i64 {
        self.load_hours_per_unit.saturating_add(self.unload_hours_per_unit)
    }

    /// Smallest stall window that cannot be tripped by normal pipeline delay,
    /// one full provider rotation and a weekend.
    pub fn minimum_stall_window(&self) -> u32 {
        let rotation = u32::try_from(self.providers.len()).unwrap_or(u32::MAX);
        self.lead_time_days
            .saturating_add(self.acclimatization_days)
            .saturating_add(rotation)
            .saturating_add(2)
    }

    /// Reject any configuration the scheduler cannot run safely.
    pub fn validate(&self) -> Result<(), PlanError> {
        self.check_scalars()?;
        self.check_species()?;
        self.check_providers()?;
        self.check_demand()?;
        self.check_travel()?;
        self.check_reachability()?;
        Ok(())
    }

    fn check_scalars(&self) -> Result<(), PlanError> {
        let positive: [(&str, u64); 3] = [
            ("warehouse_capacity", self.warehouse_capacity),
            ("vehicle_capacity", self.vehicle_capacity),
            ("max_order_quantity", self.max_order_quantity),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(config_error(format!("{} must be positive", name)));
            }
        }
        if self.labor_hours_per_workday <= 0 {
            return Err(config_error("labor_hours_per_workday must be positive"));
        }
        let non_negative: [(&str, i64); 4] = [
            ("load_hours_per_unit", self.load_hours_per_unit),
            ("unload_hours_per_unit", self.unload_hours_per_unit),
            ("planting_cost_per_unit", self.planting_cost_per_unit),
            ("nursery_transport_cost_per_unit", self.nursery_transport_cost_per_unit),
        ];
        for (name, value) in non_negative {
            if value < 0 {
                return Err(config_error(format!("{} must not be negative", name)));
            }
        }
        let delays: [(&str, u32); 2] = [
            ("lead_time_days", self.lead_time_days),
            ("acclimatization_days", self.acclimatization_days),
        ];
        for (name, value) in delays {
            if value > MAX_PIPELINE_DAYS {
                return Err(config_error(format!(
                    "{}={} exceeds {} days",
                    name, value, MAX_PIPELINE_DAYS
                )));
            }
        }
        if self.stall_window_days < self.minimum_stall_window() {
            return Err(config_error(format!(
                "stall_window_days={} is shorter than the minimum {}",
                self.stall_window_days,
                self.minimum_stall_window()
            )));
        }
        Ok(())
    }

    fn check_species(&self) -> Result<(), PlanError> {
        let mut seen = BTreeSet::new();
        for s in &self.species {
            if !seen.insert(s.id) {
                return Err(config_error(format!("duplicate species id {}", s.id)));
            }
            if s.treatment_hours < 0 || s.treatment_hours_per_unit < 0 {
                return Err(config_error(format!(
                    "species {} has negative treatment time",
                    s.id
                )));
            }
        }
        Ok(())
    }

    fn check_providers(&self) -> Result<(), PlanError> {
        if self.providers.is_empty() {
            return Err(config_error("at least one provider is required"));
        }
        let mut seen = BTreeSet::new();
        for p in &self.providers {
            validate_identifier(&p.id)?;
            if !seen.insert(p.id.as_str()) {
                return Err(config_error(format!("duplicate provider id {:?}", p.id)));
            }
            if p.unit_costs.is_empty() {
                return Err(config_error(format!("provider {:?} supplies nothing", p.id)));
            }
            if p.max_order_quantity == Some(0) {
                return Err(config_error(format!(
                    "provider {:?} has a zero order cap",
                    p.id
                )));
            }
            for (&species, &cost) in &p.unit_costs {
                if self.species(species).is_none() {
                    return Err(config_error(format!(
                        "provider {:?} prices unknown species {}",
                        p.id, species
                    )));
                }
                if cost < 0 {
                    return Err(config_error(format!(
                        "provider {:?} has a negative cost for species {}",
                        p.id, species
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_demand(&self) -> Result<(), PlanError> {
        if self.demand.destination_total(self.warehouse_id) > 0 {
            return Err(config_error(format!(
                "warehouse site {} must not carry demand",
                self.warehouse_id
            )));
        }
        for (species, qty) in self.demand.species_totals() {
            if self.species(species).is_none() {
                return Err(config_error(format!("demand for unknown species {}", species)));
            }
            if qty > 0 && !self.providers.iter().any(|p| p.supplies(species)) {
                return Err(config_error(format!(
                    "no provider supplies species {}",
                    species
                )));
            }
        }
        Ok(())
    }

    fn check_travel(&self) -> Result<(), PlanError> {
        let t = &self.travel;
        let n = t.sites.len();
        if t.hours.len() != n || t.hours.iter().any(|row| row.len() != n) {
            return Err(config_error("travel matrix must be square over its sites"));
        }
        let unique: BTreeSet<_> = t.sites.iter().collect();
        if unique.len() != n {
            return Err(config_error("travel matrix lists a site twice"));
        }
        for i in 0..n {
            for j in 0..n {
                if t.hours[i][j] < 0 {
                    return Err(config_error(format!(
                        "negative travel time between {} and {}",
                        t.sites[i], t.sites[j]
                    )));
                }
                if t.hours[i][j] != t.hours[j][i] {
                    return Err(config_error(format!(
                        "travel matrix is not symmetric between {} and {}",
                        t.sites[i], t.sites[j]
                    )));
                }
            }
        }
        if !t.contains(self.warehouse_id) {
            return Err(config_error(format!(
                "travel matrix does not include the warehouse {}",
                self.warehouse_id
            )));
        }
        for destination in self.demand.open_destinations() {
            if !t.contains(destination) {
                return Err(config_error(format!(
                    "travel matrix does not include destination {}",
                    destination
                )));
            }
        }
        Ok(())
    }

    /// Every demanded (destination, species) cell must fit a one-plant trip in a workday.
    fn check_reachability(&self) -> Result<(), PlanError> {
        for (&destination, row) in &self.demand.cells {
            let travel = self
                .travel
                .round_trip(self.warehouse_id, destination)
                .unwrap_or(i64::MAX);
            for (&species_id, _) in row.iter().filter(|&(_, &qty)| qty > 0) {
                let Some(species) = self.species(species_id) else {
                    continue;
                };
                let treatment = species
                    .treatment_hours
                    .saturating_add(species.treatment_hours_per_unit);
                let minimal_trip = travel
                    .saturating_add(treatment)
                    .saturating_add(self.handling_hours_per_unit());
                if minimal_trip > self.labor_hours_per_workday {
                    return Err(config_error(format!(
                        "species {} cannot be delivered to destination {} within one workday",
                        species_id, destination
                    )));
                }
            }
        }
        Ok(())
    }

    /// Initial demand per species, for reporting.
    pub fn initial_species_demand(&self) -> BTreeMap<SpeciesId, u64> {
        self.demand.species_totals()
    }
}

fn config_error(msg: impl Into<String>) -> PlanError {
    PlanError::Configuration(msg.into())
}
