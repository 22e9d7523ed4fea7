//! planting-runner — run a planting scenario from the command line.
//!
//! Without `--session-dir` the scenario runs in memory. With it, every day
//! is persisted and an interrupted run resumes where it stopped.
//!
//! Exit codes: 0 completed, 1 stalled, 2 error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use planting_engine::arithmetic::{format_fixed, HOUR_SCALE, MONEY_SCALE};
use planting_engine::costs::analyze_costs;
use planting_engine::events::{DailyState, RunOutcome};
use planting_engine::PlanConfig;

use planting_runtime::drift;
use planting_runtime::progress::progress_report;
use planting_runtime::replay;
use planting_runtime::scenario::load_scenario;
use planting_runtime::session::Session;
use planting_runtime::RuntimeError;

#[derive(Parser, Debug)]
#[command(name = "planting-runner")]
#[command(about = "Simulate procurement, staging and planting for a reforestation scenario")]
struct Args {
    /// Scenario JSON file
    scenario: PathBuf,

    /// Persist the ledger and snapshots here; resumes if it already holds a run
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Save a snapshot every N days (0 disables)
    #[arg(long, default_value_t = 7)]
    snapshot_interval: u32,

    /// Run the scenario twice and require identical ledgers
    #[arg(long)]
    verify: bool,

    /// Print every day's record as JSON lines
    #[arg(long)]
    ledger_json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(outcome) if outcome.completed => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<RunOutcome, RuntimeError> {
    let config = load_scenario(&args.scenario)?;
    tracing::info!(
        scenario = %args.scenario.display(),
        species = config.species.len(),
        providers = config.providers.len(),
        demand = config.demand.total(),
        "scenario loaded"
    );

    if args.verify {
        let hash = drift::verify_determinism(&config)?;
        tracing::info!(ledger_hash = %hash, "determinism verified");
    }

    let (outcome, ledger, hash) = match &args.session_dir {
        Some(dir) => {
            let mut session = Session::open(dir, config.clone(), args.snapshot_interval)?;
            let outcome = session.run()?;
            let hash = session.ledger_hash()?;
            (outcome, session.ledger().to_vec(), hash)
        }
        None => {
            let result = replay::replay_scenario(&config)?;
            let outcome = result.report.outcome.clone();
            (outcome, result.report.ledger, result.ledger_hash)
        }
    };

    if args.ledger_json {
        for day in &ledger {
            println!("{}", serde_json::to_string(day)?);
        }
    }
    print_summary(&config, &outcome, &ledger, &hash)?;
    Ok(outcome)
}

fn print_summary(
    config: &PlanConfig,
    outcome: &RunOutcome,
    ledger: &[DailyState],
    hash: &str,
) -> Result<(), RuntimeError> {
    let money = |v: i64| format_fixed(v, MONEY_SCALE);

    println!("== Outcome ==");
    println!("completed:        {}", outcome.completed);
    println!("days:             {}", outcome.total_days);
    println!("purchase:         {}", money(outcome.cost.purchase));
    println!("nursery transport:{}", money(outcome.cost.nursery_transport));
    println!("planting:         {}", money(outcome.cost.planting));
    println!("total cost:       {}", money(outcome.total_cost));
    println!("ledger hash:      {}", hash);
    if let Some(stall) = &outcome.stall_reason {
        println!(
            "stalled:          no progress for {} days, {} plants outstanding (last progress day {:?})",
            stall.window_days, stall.outstanding_demand, stall.last_progress_day
        );
    }

    let analysis = analyze_costs(config, ledger)?;
    println!("== Cost analysis ==");
    println!("optimal total:    {}", money(analysis.optimal.total()));
    println!("overspend:        {}", money(analysis.overspend()));
    for (species, cost) in &analysis.species {
        println!(
            "species {:>4}: demanded {:>7} ordered {:>7} planted {:>7} purchase {}",
            species,
            cost.demanded,
            cost.ordered,
            cost.planted,
            money(cost.purchase_cost)
        );
    }

    let labor: i64 = ledger.iter().map(|d| d.labor_hours_used).sum();
    println!("labor hours:      {}", format_fixed(labor, HOUR_SCALE));

    let report = progress_report(config.demand.total(), ledger);
    println!("== Milestones ==");
    for m in &report.milestones {
        println!(
            "{:>3}% day {:>4} ({}) cost {}",
            m.completion_bp / 100,
            m.day,
            m.date,
            money(m.total_cost)
        );
    }
    Ok(())
}
