//! Progress tracking — per-day completion and milestone timeline.
//!
//! Completion is in basis points (10_000 = done) of the initial demand.

use chrono::NaiveDate;
use serde::Serialize;

use planting_engine::events::DailyState;

/// 25 %, 50 %, 75 %, 90 %, 100 %.
pub const MILESTONES_BP: [u32; 5] = [2_500, 5_000, 7_500, 9_000, 10_000];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyProgress {
    pub day: u32,
    pub date: NaiveDate,
    pub planted_today: u64,
    pub planted_total: u64,
    pub outstanding_demand: u64,
    pub completion_bp: u32,
    pub total_cost: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub completion_bp: u32,
    pub day: u32,
    pub date: NaiveDate,
    pub total_cost: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub initial_demand: u64,
    pub days: Vec<DailyProgress>,
    /// First day each milestone was reached, in milestone order.
    pub milestones: Vec<Milestone>,
}

pub fn completion_bp(initial: u64, outstanding: u64) -> u32 {
    if initial == 0 {
        return 10_000;
    }
    let done = u128::from(initial.saturating_sub(outstanding));
    (done * 10_000 / u128::from(initial)) as u32
}

pub fn progress_report(initial_demand: u64, ledger: &[DailyState]) -> ProgressReport {
    let mut report = ProgressReport {
        initial_demand,
        ..ProgressReport::default()
    };
    let mut planted_total = 0;
    let mut next_milestone = 0;
    for record in ledger {
        let planted_today = record.planted_quantity();
        planted_total += planted_today;
        let bp = completion_bp(initial_demand, record.outstanding_demand);
        while next_milestone < MILESTONES_BP.len() && bp >= MILESTONES_BP[next_milestone] {
            report.milestones.push(Milestone {
                completion_bp: MILESTONES_BP[next_milestone],
                day: record.day,
                date: record.date,
                total_cost: record.total_cost,
            });
            next_milestone += 1;
        }
        report.days.push(DailyProgress {
            day: record.day,
            date: record.date,
            planted_today,
            planted_total,
            outstanding_demand: record.outstanding_demand,
            completion_bp: bp,
            total_cost: record.total_cost,
        });
    }
    report
}
