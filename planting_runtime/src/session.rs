//! Planning session — a persistent run with persist-after-step semantics.
//!
//! Each session owns a directory with a ledger log and snapshots:
//!   <dir>/ledger.log
//!   <dir>/snapshots/
//!
//! Step-before-persist order:
//!   1. engine.step()        may fail on any invariant violation
//!   2. ledger.append()      only if step 1 succeeded
//!   3. snapshot if the interval is reached
//!
//! Reopening a session replays every stored day through the engine and
//! cross-checks the latest snapshot against the replayed state.

use std::path::{Path, PathBuf};

use planting_engine::events::{DailyState, RunOutcome};
use planting_engine::hashing::{ledger_hash, state_hash};
use planting_engine::{PlanConfig, PlanState, PlanningEngine};

use crate::error::RuntimeError;
use crate::ledger_store::LedgerStore;
use crate::replay;
use crate::snapshot;

pub struct Session {
    dir: PathBuf,
    engine: PlanningEngine,
    store: LedgerStore,
    ledger: Vec<DailyState>,
    snapshot_interval: u32,
}

impl Session {
    /// Open or create a session in `dir`. Existing days are re-simulated and checked.
    pub fn open(dir: &Path, config: PlanConfig, snapshot_interval: u32) -> Result<Self, RuntimeError> {
        let store = LedgerStore::open(&dir.join("ledger.log"))?;
        let ledger = store.load_all()?;

        let snap_dir = dir.join("snapshots");
        let latest = snapshot::load_latest_snapshot(&snap_dir)?;
        if let Some(snap) = &latest {
            snapshot::verify_snapshot_hash(snap)?;
            if snap.day as usize > ledger.len() {
                return Err(RuntimeError::Corrupt(format!(
                    "snapshot for day {} but ledger holds {} days",
                    snap.day,
                    ledger.len()
                )));
            }
        }
        let engine = replay::rebuild_engine_observed(&config, &ledger, |state| {
            match &latest {
                Some(snap) if snap.day == state.day => {
                    let replayed = state_hash(state)?;
                    if replayed != snap.hash {
                        return Err(RuntimeError::ReplayMismatch {
                            day: snap.day,
                            detail: format!(
                                "snapshot hash {}, replayed state {}",
                                snap.hash, replayed
                            ),
                        });
                    }
                    Ok(())
                }
                _ => Ok(()),
            }
        })?;

        if !ledger.is_empty() {
            tracing::info!(days = ledger.len(), dir = %dir.display(), "session resumed");
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            engine,
            store,
            ledger,
            snapshot_interval,
        })
    }

    /// Simulate and persist one day. `None` once the run has terminated.
    pub fn step(&mut self) -> Result<Option<&DailyState>, RuntimeError> {
        if self.engine.check_termination().is_some() {
            return Ok(None);
        }
        let record = self.engine.step()?.clone();
        self.store.append(&record)?;

        let next_day = self.engine.state().day;
        if self.snapshot_interval > 0 && next_day % self.snapshot_interval == 0 {
            snapshot::save_snapshot(&self.dir.join("snapshots"), self.engine.state())?;
        }
        self.ledger.push(record);
        Ok(self.ledger.last())
    }

    /// Step until termination and return the outcome.
    pub fn run(&mut self) -> Result<RunOutcome, RuntimeError> {
        while self.step()?.is_some() {}
        self.outcome().ok_or_else(|| {
            RuntimeError::Corrupt("run stopped without a terminal outcome".to_string())
        })
    }

    /// Terminal outcome, if reached.
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.engine.outcome()
    }

    pub fn state(&self) -> &PlanState {
        self.engine.state()
    }

    pub fn config(&self) -> &PlanConfig {
        self.engine.config()
    }

    /// Every day recorded in this session, including resumed ones.
    pub fn ledger(&self) -> &[DailyState] {
        &self.ledger
    }

    pub fn ledger_hash(&self) -> Result<String, RuntimeError> {
        Ok(ledger_hash(&self.ledger)?)
    }

    pub fn current_day(&self) -> u32 {
        self.engine.state().day
    }
}
