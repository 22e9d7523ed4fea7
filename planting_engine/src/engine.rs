/// Planting Engine — Engine
///
/// Top-level driver. Delegates each day to transitions,
/// validates via invariants, owns the append-only ledger.
///
/// Two exits only: completion, or stall after `stall_window_days`
/// consecutive days without demand progress.

use crate::config::PlanConfig;
use crate::error::PlanError;
use crate::events::{DailyState, RunOutcome, StallReport};
use crate::invariants::{validate_day, validate_state};
use crate::state::{create_initial_state, PlanState};
use crate::transitions::{step_day, PlanContext};

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Completed,
    Stalled(StallReport),
}

/// Ledger, outcome and final state of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub ledger: Vec<DailyState>,
    pub outcome: RunOutcome,
    pub final_state: PlanState,
}

/// Stateful engine wrapping the pure day transition.
pub struct PlanningEngine {
    context: PlanContext,
    state: PlanState,
    ledger: Vec<DailyState>,
}

impl PlanningEngine {
    /// Validate `config` and start from an empty warehouse on day 0.
    pub fn new(config: PlanConfig) -> Result<Self, PlanError> {
        let context = PlanContext::new(config)?;
        let state = create_initial_state(context.config());
        Ok(Self {
            context,
            state,
            ledger: Vec::new(),
        })
    }

    /// Resume from a previously saved state. The ledger starts empty.
    pub fn from_state(config: PlanConfig, state: PlanState) -> Result<Self, PlanError> {
        let context = PlanContext::new(config)?;
        validate_state(&state, context.config())?;
        Ok(Self {
            context,
            state,
            ledger: Vec::new(),
        })
    }

    pub fn context(&self) -> &PlanContext {
        &self.context
    }

    pub fn config(&self) -> &PlanConfig {
        self.context.config()
    }

    pub fn state(&self) -> &PlanState {
        &self.state
    }

    /// Records produced by this engine instance, oldest first.
    pub fn ledger(&self) -> &[DailyState] {
        &self.ledger
    }

    /// Simulate one day:
    ///   1. Run the pure transition on the current state
    ///   2. Validate invariants between old and new state
    ///   3. Store the new state and append the record
    pub fn step(&mut self) -> Result<&DailyState, PlanError> {
        let (next, record) = step_day(&self.state, &self.context)?;
        validate_day(&self.state, &next, &record, self.context.config())?;
        self.state = next;
        self.ledger.push(record);
        self.ledger
            .last()
            .ok_or_else(|| PlanError::InvariantViolation("ledger append lost a record".to_string()))
    }

    /// Completion first, then the stall window.
    pub fn check_termination(&self) -> Option<Termination> {
        if self.state.is_complete() {
            return Some(Termination::Completed);
        }
        let progress = &self.state.progress;
        let window = self.context.config().stall_window_days;
        if progress.days_without_progress >= window {
            return Some(Termination::Stalled(StallReport {
                window_days: window,
                last_progress_day: progress.last_progress_day,
                outstanding_demand: self.state.outstanding_demand(),
                last_day: self.ledger.last().cloned(),
            }));
        }
        None
    }

    /// Outcome for the current position, if the run has terminated.
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.check_termination().map(|t| self.outcome_for(t))
    }

    fn outcome_for(&self, termination: Termination) -> RunOutcome {
        let (completed, stall_reason) = match termination {
            Termination::Completed => (true, None),
            Termination::Stalled(report) => (false, Some(report)),
        };
        RunOutcome {
            completed,
            total_days: self.state.day,
            total_cost: self.state.total_cost(),
            cost: self.state.cost,
            final_inventory: self.state.pipeline.snapshot(),
            stall_reason,
        }
    }

    /// Step until completion or stall.
    pub fn run(mut self) -> Result<RunReport, PlanError> {
        loop {
            if let Some(termination) = self.check_termination() {
                match &termination {
                    Termination::Completed => tracing::info!(
                        days = self.state.day,
                        total_cost = self.state.total_cost(),
                        "planting complete"
                    ),
                    Termination::Stalled(report) => tracing::warn!(
                        day = self.state.day,
                        window = report.window_days,
                        outstanding = report.outstanding_demand,
                        "no demand progress within the stall window, aborting"
                    ),
                }
                let outcome = self.outcome_for(termination);
                return Ok(RunReport {
                    ledger: self.ledger,
                    outcome,
                    final_state: self.state,
                });
            }
            self.step()?;
        }
    }
}

/// Run a full plan from day 0.
pub fn run_plan(config: PlanConfig) -> Result<RunReport, PlanError> {
    PlanningEngine::new(config)?.run()
}
