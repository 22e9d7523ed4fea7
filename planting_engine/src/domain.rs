/// Planting Engine — Core Domain Types
///
/// Pure data plus small accessors. No scheduling policy lives here.
/// Hours are fixed-point micro-hours, money is fixed-point MONEY_SCALE.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

pub type SpeciesId = u32;
pub type DestinationId = u32;

// ── Reference Data ─────────────────────────────────────────────────

/// A plantable species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Species {
    pub id: SpeciesId,
    pub name: String,
    /// Charged once per trip for each species carried (micro-hours).
    pub treatment_hours: i64,
    /// Charged per plant carried (micro-hours). Usually zero.
    pub treatment_hours_per_unit: i64,
    /// Relative share of a balanced demand unit (plants per hectare).
    pub mix_weight: u64,
}

impl Species {
    /// Treatment time for `quantity` plants of this species on one trip.
    pub fn treatment_time(&self, quantity: u64) -> i64 {
        if quantity == 0 {
            return 0;
        }
        self.treatment_hours + self.treatment_hours_per_unit * quantity as i64
    }
}

/// An external nursery. The order of providers in the config is the rotation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Provider {
    pub id: String,
    /// Species supplied, with unit purchase cost (fixed-point money).
    pub unit_costs: BTreeMap<SpeciesId, i64>,
    /// Optional provider-specific cap, tighter than the global per-order cap.
    pub max_order_quantity: Option<u64>,
}

impl Provider {
    pub fn supplies(&self, species: SpeciesId) -> bool {
        self.unit_costs.contains_key(&species)
    }
}

// ── Matrices ───────────────────────────────────────────────────────

/// Outstanding demand per destination and species.
///
/// Cells only ever decrease. Zero cells are kept so the shape stays stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemandMatrix {
    pub cells: BTreeMap<DestinationId, BTreeMap<SpeciesId, u64>>,
}

impl DemandMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell(mut self, destination: DestinationId, species: SpeciesId, qty: u64) -> Self {
        self.cells
            .entry(destination)
            .or_default()
            .insert(species, qty);
        self
    }

    pub fn get(&self, destination: DestinationId, species: SpeciesId) -> u64 {
        self.cells
            .get(&destination)
            .and_then(|row| row.get(&species))
            .copied()
            .unwrap_or(0)
    }

    /// Total outstanding demand across all destinations and species.
    pub fn total(&self) -> u64 {
        self.cells.values().flat_map(|row| row.values()).sum()
    }

    pub fn destination_total(&self, destination: DestinationId) -> u64 {
        self.cells
            .get(&destination)
            .map(|row| row.values().sum())
            .unwrap_or(0)
    }

    /// Outstanding demand per species, summed over destinations.
    pub fn species_totals(&self) -> BTreeMap<SpeciesId, u64> {
        let mut totals: BTreeMap<SpeciesId, u64> = BTreeMap::new();
        for row in self.cells.values() {
            for (&species, &qty) in row {
                *totals.entry(species).or_default() += qty;
            }
        }
        totals
    }

    /// Destinations that still have any outstanding demand, ascending id.
    pub fn open_destinations(&self) -> Vec<DestinationId> {
        self.cells
            .iter()
            .filter(|(_, row)| row.values().any(|&q| q > 0))
            .map(|(&id, _)| id)
            .collect()
    }

    /// Reduce one cell. Fails rather than clamping.
    pub fn reduce(
        &mut self,
        destination: DestinationId,
        species: SpeciesId,
        qty: u64,
    ) -> Result<(), PlanError> {
        let outstanding = self.get(destination, species);
        if qty > outstanding {
            return Err(PlanError::DemandUnderflow {
                destination,
                species,
                requested: qty,
                outstanding,
            });
        }
        if let Some(cell) = self
            .cells
            .get_mut(&destination)
            .and_then(|row| row.get_mut(&species))
        {
            *cell = outstanding - qty;
        }
        Ok(())
    }
}

/// Symmetric travel-time matrix over site ids (warehouse included).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TravelMatrix {
    /// Site ids, in row/column order.
    pub sites: Vec<DestinationId>,
    /// `hours[i][j]`: one-way travel from `sites[i]` to `sites[j]` (micro-hours).
    pub hours: Vec<Vec<i64>>,
}

impl TravelMatrix {
    fn index_of(&self, site: DestinationId) -> Option<usize> {
        self.sites.iter().position(|&s| s == site)
    }

    pub fn contains(&self, site: DestinationId) -> bool {
        self.index_of(site).is_some()
    }

    pub fn one_way(&self, from: DestinationId, to: DestinationId) -> Option<i64> {
        let i = self.index_of(from)?;
        let j = self.index_of(to)?;
        self.hours.get(i).and_then(|row| row.get(j)).copied()
    }

    /// Out-and-back travel time between two sites.
    pub fn round_trip(&self, from: DestinationId, to: DestinationId) -> Option<i64> {
        Some(self.one_way(from, to)? + self.one_way(to, from)?)
    }
}

// ── Planning Records ───────────────────────────────────────────────

/// One species line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderLine {
    pub species: SpeciesId,
    pub quantity: u64,
    pub unit_cost: i64,
}

/// A nursery order. Immutable once placed; received exactly once on `arrival_day`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Order {
    pub provider: String,
    pub lines: Vec<OrderLine>,
    pub day_placed: u32,
    pub arrival_day: u32,
    pub purchase_cost: i64,
    pub transport_cost: i64,
}

impl Order {
    pub fn quantity(&self) -> u64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn quantity_of(&self, species: SpeciesId) -> u64 {
        self.lines
            .iter()
            .filter(|l| l.species == species)
            .map(|l| l.quantity)
            .sum()
    }
}

/// Quantity of one species carried by a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TripLoad {
    pub species: SpeciesId,
    pub quantity: u64,
}

/// One round trip of the vehicle between the warehouse and a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportTrip {
    pub day: u32,
    /// 1-based position among the day's trips.
    pub sequence: u32,
    pub destination: DestinationId,
    pub loads: Vec<TripLoad>,
    pub travel_hours: i64,
    pub handling_hours: i64,
    pub treatment_hours: i64,
}

impl TransportTrip {
    pub fn quantity(&self) -> u64 {
        self.loads.iter().map(|l| l.quantity).sum()
    }

    pub fn total_hours(&self) -> i64 {
        self.travel_hours + self.handling_hours + self.treatment_hours
    }
}

/// Plants committed at a destination. Created together with the demand reduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlantingRecord {
    pub day: u32,
    pub trip: u32,
    pub destination: DestinationId,
    pub species: SpeciesId,
    pub quantity: u64,
    pub cost: i64,
}

/// Cost split by booking category (fixed-point money).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CostBreakdown {
    pub purchase: i64,
    pub nursery_transport: i64,
    pub planting: i64,
}

impl CostBreakdown {
    pub fn total(&self) -> i64 {
        self.purchase + self.nursery_transport + self.planting
    }

    pub fn accumulate(&mut self, other: &CostBreakdown) -> Result<(), PlanError> {
        use crate::arithmetic::checked_add;
        self.purchase = checked_add(self.purchase, other.purchase)?;
        self.nursery_transport = checked_add(self.nursery_transport, other.nursery_transport)?;
        self.planting = checked_add(self.planting, other.planting)?;
        Ok(())
    }
}

/// Per-species pipeline content at the end of a day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesInventory {
    /// `stages[0]` arrived today; the last stage becomes available tomorrow.
    pub stages: Vec<u64>,
    pub available: u64,
}

impl SpeciesInventory {
    pub fn total(&self) -> u64 {
        self.stages.iter().sum::<u64>() + self.available
    }
}

/// Warehouse content, per species and stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventorySnapshot {
    pub species: BTreeMap<SpeciesId, SpeciesInventory>,
}

impl InventorySnapshot {
    pub fn total(&self) -> u64 {
        self.species.values().map(|s| s.total()).sum()
    }
}
