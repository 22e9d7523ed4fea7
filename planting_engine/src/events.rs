/// Planting Engine — Daily Ledger Records
///
/// Records are pure data. They describe what a day did and carry
/// no transition logic. The ledger is append-only, one record per day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    CostBreakdown, DestinationId, InventorySnapshot, Order, PlantingRecord, TransportTrip,
};

/// Why no order was placed today. Expected, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcurementSkip {
    /// The provider of the day has no assigned species with uncovered demand.
    NoViableProvider { provider: String },
    /// Projected occupancy already fills the warehouse.
    WarehouseFull { occupancy: u64, capacity: u64 },
    /// Assigned species still need stock but already hold their share of the mix.
    TargetMixSatisfied { provider: String },
}

impl ProcurementSkip {
    pub fn kind(&self) -> &'static str {
        match self {
            ProcurementSkip::NoViableProvider { .. } => "no_viable_provider",
            ProcurementSkip::WarehouseFull { .. } => "warehouse_full",
            ProcurementSkip::TargetMixSatisfied { .. } => "target_mix_satisfied",
        }
    }
}

/// Why no trip ran today. Expected, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationSkip {
    NonWorkday,
    /// No destination wants any species that is currently available.
    NoPlantableInventory,
    /// Matching stock exists but no destination fits in the hour budget.
    NoViableDestination,
}

impl AllocationSkip {
    pub fn kind(&self) -> &'static str {
        match self {
            AllocationSkip::NonWorkday => "non_workday",
            AllocationSkip::NoPlantableInventory => "no_plantable_inventory",
            AllocationSkip::NoViableDestination => "no_viable_destination",
        }
    }
}

/// One ledger entry. Written once at the end of each simulated day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyState {
    pub day: u32,
    pub date: NaiveDate,
    pub workday: bool,
    /// Provider whose rotation turn it was.
    pub provider_turn: String,
    pub order: Option<Order>,
    pub procurement_skip: Option<ProcurementSkip>,
    /// Orders received into stage 0 today.
    pub arrivals: Vec<Order>,
    pub trips: Vec<TransportTrip>,
    pub plantings: Vec<PlantingRecord>,
    pub allocation_skip: Option<AllocationSkip>,
    /// Destinations set aside for today only.
    pub excluded_destinations: Vec<DestinationId>,
    pub labor_hours_used: i64,
    pub inventory: InventorySnapshot,
    pub day_cost: CostBreakdown,
    pub total_cost: i64,
    pub outstanding_demand: u64,
}

impl DailyState {
    pub fn planted_quantity(&self) -> u64 {
        self.plantings.iter().map(|p| p.quantity).sum()
    }
}

/// Diagnostic for a run that stopped making demand progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StallReport {
    pub window_days: u32,
    /// Last day on which outstanding demand fell, if any.
    pub last_progress_day: Option<u32>,
    pub outstanding_demand: u64,
    pub last_day: Option<DailyState>,
}

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunOutcome {
    pub completed: bool,
    pub total_days: u32,
    pub total_cost: i64,
    pub cost: CostBreakdown,
    pub final_inventory: InventorySnapshot,
    pub stall_reason: Option<StallReport>,
}
