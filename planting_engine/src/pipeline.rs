/// Planting Engine — Acclimatization Pipeline
///
/// Per-species ring of waiting stages plus an available pool.
/// Plants of one species within a stage are fungible, so only counts are kept.
///
/// Timing: `receive` puts plants in stage 0; each `advance_day` shifts every
/// stage by one and merges the oldest stage into `available`. With N stages
/// a plant received on day d is available from day d + N.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::{InventorySnapshot, SpeciesId, SpeciesInventory};
use crate::error::PlanError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpeciesStock {
    stages: VecDeque<u64>,
    available: u64,
    arrived: u64,
    planted: u64,
}

impl SpeciesStock {
    fn new(stage_count: usize) -> Self {
        Self {
            stages: VecDeque::from(vec![0; stage_count]),
            available: 0,
            arrived: 0,
            planted: 0,
        }
    }

    fn held(&self) -> u64 {
        self.stages.iter().sum::<u64>() + self.available
    }
}

/// Warehouse stock from arrival to availability. Owned by the plan state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcclimatizationPipeline {
    stage_count: usize,
    stock: BTreeMap<SpeciesId, SpeciesStock>,
}

impl AcclimatizationPipeline {
    /// Create an empty pipeline with `acclimatization_days` waiting stages.
    pub fn new(acclimatization_days: u32, species: impl IntoIterator<Item = SpeciesId>) -> Self {
        let stage_count = acclimatization_days as usize;
        Self {
            stage_count,
            stock: species
                .into_iter()
                .map(|id| (id, SpeciesStock::new(stage_count)))
                .collect(),
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    /// Enqueue an arrival at stage 0. Called only on an order's arrival day.
    pub fn receive(&mut self, species: SpeciesId, qty: u64, day: u32) {
        let stage_count = self.stage_count;
        let entry = self
            .stock
            .entry(species)
            .or_insert_with(|| SpeciesStock::new(stage_count));
        match entry.stages.front_mut() {
            Some(front) => *front += qty,
            None => entry.available += qty,
        }
        entry.arrived += qty;
        tracing::trace!(day, species, qty, "received into acclimatization");
    }

    /// Age every stage by one day. Runs once per simulated day, weekends included.
    pub fn advance_day(&mut self) {
        for entry in self.stock.values_mut() {
            if let Some(ready) = entry.stages.pop_back() {
                entry.available += ready;
                entry.stages.push_front(0);
            }
        }
    }

    /// Plantable quantity of a species.
    pub fn available(&self, species: SpeciesId) -> u64 {
        self.stock.get(&species).map(|s| s.available).unwrap_or(0)
    }

    /// All species with their available quantity, zeros included.
    pub fn available_by_species(&self) -> BTreeMap<SpeciesId, u64> {
        self.stock
            .iter()
            .map(|(&id, s)| (id, s.available))
            .collect()
    }

    /// Take plants out of the available pool. Never partially fulfils.
    pub fn reserve_for_planting(&mut self, species: SpeciesId, qty: u64) -> Result<(), PlanError> {
        let available = self.available(species);
        if qty > available {
            return Err(PlanError::InsufficientInventory {
                species,
                requested: qty,
                available,
            });
        }
        if let Some(entry) = self.stock.get_mut(&species) {
            entry.available -= qty;
            entry.planted += qty;
        }
        Ok(())
    }

    /// Stock of a species in any stage or available.
    pub fn held(&self, species: SpeciesId) -> u64 {
        self.stock.get(&species).map(|s| s.held()).unwrap_or(0)
    }

    /// Physical warehouse occupancy.
    pub fn total(&self) -> u64 {
        self.stock.values().map(|s| s.held()).sum()
    }

    pub fn cumulative_arrived(&self, species: SpeciesId) -> u64 {
        self.stock.get(&species).map(|s| s.arrived).unwrap_or(0)
    }

    pub fn cumulative_planted(&self, species: SpeciesId) -> u64 {
        self.stock.get(&species).map(|s| s.planted).unwrap_or(0)
    }

    /// Held stock must equal arrivals minus plantings, per species.
    pub fn check_conservation(&self) -> Result<(), PlanError> {
        for (&species, s) in &self.stock {
            if s.stages.len() != self.stage_count {
                return Err(PlanError::InvariantViolation(format!(
                    "[INVARIANT:pipeline_shape] species {} has {} stages, expected {}",
                    species,
                    s.stages.len(),
                    self.stage_count
                )));
            }
            if s.arrived < s.planted || s.held() != s.arrived - s.planted {
                return Err(PlanError::InvariantViolation(format!(
                    "[INVARIANT:pipeline_conservation] species {}: held={} arrived={} planted={}",
                    species,
                    s.held(),
                    s.arrived,
                    s.planted
                )));
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            species: self
                .stock
                .iter()
                .map(|(&id, s)| {
                    (
                        id,
                        SpeciesInventory {
                            stages: s.stages.iter().copied().collect(),
                            available: s.available,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_after_exactly_three_advances() {
        let mut p = AcclimatizationPipeline::new(3, [1]);
        p.receive(1, 100, 1);
        for _ in 0..2 {
            p.advance_day();
            assert_eq!(p.available(1), 0);
        }
        p.advance_day();
        assert_eq!(p.available(1), 100);
        assert_eq!(p.held(1), 100);
    }

    #[test]
    fn test_available_never_regresses() {
        let mut p = AcclimatizationPipeline::new(3, [1]);
        p.receive(1, 10, 0);
        for _ in 0..10 {
            p.advance_day();
        }
        assert_eq!(p.available(1), 10);
        assert_eq!(p.snapshot().species[&1].stages, vec![0, 0, 0]);
    }

    #[test]
    fn test_stages_shift_in_order() {
        let mut p = AcclimatizationPipeline::new(3, [1]);
        p.receive(1, 5, 0);
        p.advance_day();
        p.receive(1, 7, 1);
        let snap = p.snapshot();
        assert_eq!(snap.species[&1].stages, vec![7, 5, 0]);
        assert_eq!(snap.total(), 12);
    }

    #[test]
    fn test_reserve_rejects_more_than_available() {
        let mut p = AcclimatizationPipeline::new(3, [1]);
        p.receive(1, 50, 0);
        let err = p.reserve_for_planting(1, 1).unwrap_err();
        assert_eq!(
            err,
            PlanError::InsufficientInventory {
                species: 1,
                requested: 1,
                available: 0
            }
        );
        assert_eq!(p.held(1), 50);
    }

    #[test]
    fn test_conservation_holds_through_planting() {
        let mut p = AcclimatizationPipeline::new(3, [1, 2]);
        p.receive(1, 40, 0);
        p.receive(2, 10, 0);
        for _ in 0..3 {
            p.advance_day();
        }
        p.reserve_for_planting(1, 15).unwrap();
        assert_eq!(p.check_conservation(), Ok(()));
        assert_eq!(p.held(1), p.cumulative_arrived(1) - p.cumulative_planted(1));
        assert_eq!(p.total(), 35);
    }

    #[test]
    fn test_zero_stage_pipeline_is_immediately_available() {
        let mut p = AcclimatizationPipeline::new(0, [1]);
        p.receive(1, 3, 0);
        assert_eq!(p.available(1), 3);
        p.advance_day();
        assert_eq!(p.available(1), 3);
    }
}
