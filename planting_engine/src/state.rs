/// Planting Engine — Plan State
///
/// Everything that carries from one simulated day to the next.
/// Static inputs stay in `PlanConfig`; this holds only what a day mutates.

use serde::{Deserialize, Serialize};

use crate::config::PlanConfig;
use crate::domain::{CostBreakdown, DemandMatrix, Order};
use crate::pipeline::AcclimatizationPipeline;

/// Non-improvement counter on total outstanding demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgressTracker {
    pub last_outstanding: u64,
    pub days_without_progress: u32,
    pub last_progress_day: Option<u32>,
}

impl ProgressTracker {
    /// Record the outstanding total at the end of `day`.
    pub fn observe(&mut self, day: u32, outstanding: u64) {
        if outstanding < self.last_outstanding {
            self.days_without_progress = 0;
            self.last_progress_day = Some(day);
        } else {
            self.days_without_progress = self.days_without_progress.saturating_add(1);
        }
        self.last_outstanding = outstanding;
    }
}

/// State between two days. `day` is the next day to simulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanState {
    pub day: u32,
    pub pipeline: AcclimatizationPipeline,
    /// Placed but not yet arrived, in placement order.
    pub pending_orders: Vec<Order>,
    pub demand: DemandMatrix,
    pub cost: CostBreakdown,
    pub progress: ProgressTracker,
}

impl PlanState {
    pub fn outstanding_demand(&self) -> u64 {
        self.demand.total()
    }

    pub fn total_cost(&self) -> i64 {
        self.cost.total()
    }

    pub fn is_complete(&self) -> bool {
        self.outstanding_demand() == 0
    }
}

/// Day-0 state: empty warehouse, full demand, no cost.
pub fn create_initial_state(config: &PlanConfig) -> PlanState {
    let demand = config.demand.clone();
    let outstanding = demand.total();
    PlanState {
        day: 0,
        pipeline: AcclimatizationPipeline::new(
            config.acclimatization_days,
            config.species.iter().map(|s| s.id),
        ),
        pending_orders: Vec::new(),
        demand,
        cost: CostBreakdown::default(),
        progress: ProgressTracker {
            last_outstanding: outstanding,
            ..ProgressTracker::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_resets_on_progress() {
        let mut t = ProgressTracker {
            last_outstanding: 100,
            ..ProgressTracker::default()
        };
        t.observe(0, 100);
        t.observe(1, 100);
        assert_eq!(t.days_without_progress, 2);
        t.observe(2, 60);
        assert_eq!(t.days_without_progress, 0);
        assert_eq!(t.last_progress_day, Some(2));
    }

    #[test]
    fn test_initial_state_copies_demand() {
        let cfg = PlanConfig {
            demand: DemandMatrix::new().with_cell(3, 1, 40),
            ..PlanConfig::default()
        };
        let state = create_initial_state(&cfg);
        assert_eq!(state.outstanding_demand(), 40);
        assert_eq!(state.progress.last_outstanding, 40);
        assert!(!state.is_complete());
        assert_eq!(state.total_cost(), 0);
    }
}
