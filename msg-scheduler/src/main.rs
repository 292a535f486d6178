/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use msg_scheduler::backend::{SearchBackend, SolveOptions};
use msg_scheduler::config::{ScenarioConfig, SchedulerConfig};
use msg_scheduler::generator::seeded_scenario;
use msg_scheduler::schedule::{Schedule, SortOrder};
use msg_scheduler::scheduler::{
    synthesize, synthesize_with_retries, RetryOutcome, ScheduleError, SynthesisOutcome,
};

// ── CLI argument definition ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Order {
    Slot,
    Flow,
}

impl From<Order> for SortOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Slot => SortOrder::BySlot,
            Order::Flow => SortOrder::ByFlow,
        }
    }
}

/// Time-triggered message schedule synthesis.
///
/// Example:
///   msg-scheduler --config scenarios/star.yaml --order flow
///   msg-scheduler --random --nodes 10 --seed 7 --attempts 20
#[derive(Debug, Parser)]
#[command(
    name = "msg-scheduler",
    about = "Synthesize a conflict-free time-triggered message schedule",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML scenario file.
    #[arg(short = 'c', long = "config", required_unless_present = "random")]
    config: Option<PathBuf>,

    /// Generate random tree scenarios instead of reading a file.
    #[arg(short = 'r', long = "random", conflicts_with = "config")]
    random: bool,

    /// Seed of the first random scenario; attempt n uses seed + n - 1.
    #[arg(long = "seed", default_value_t = 0)]
    seed: u64,

    /// Maximum number of random scenarios to try.
    #[arg(long = "attempts", default_value_t = 10)]
    attempts: u32,

    /// Number of nodes in each random scenario.
    #[arg(long = "nodes", default_value_t = 8)]
    nodes: usize,

    /// Solver time budget per attempt, in milliseconds.
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Solver step budget per attempt.
    #[arg(long = "max-steps")]
    max_steps: Option<u64>,

    /// Ordering of the printed schedule.
    #[arg(long = "order", value_enum, default_value_t = Order::Slot)]
    order: Order,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(
        config    = ?cli.config,
        random    = cli.random,
        seed      = cli.seed,
        attempts  = cli.attempts,
        nodes     = cli.nodes,
        timeout_ms = ?cli.timeout_ms,
        max_steps = ?cli.max_steps,
        "msg-scheduler starting"
    );

    // ── Ctrl-C cancels the running solve ─────────────────────────────────────
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling synthesis");
            on_signal.cancel();
        }
    });

    let order = SortOrder::from(cli.order);
    let outcome = match tokio::task::spawn_blocking(move || run(&cli, cancel)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Synthesis task failed: {}", e);
            process::exit(1);
        }
    };

    match outcome {
        Ok(Some(schedule)) => {
            log_frames(&schedule);
            match serde_yaml::to_string(&schedule.export(order)) {
                Ok(yaml) => print!("{yaml}"),
                Err(e) => {
                    error!("Failed to serialise schedule: {}", e);
                    process::exit(1);
                }
            }
        }
        Ok(None) => process::exit(2),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

// ── Synthesis ─────────────────────────────────────────────────────────────────

/// `Ok(None)` when no schedule was produced (infeasible, interrupted or
/// cancelled); the reason has already been logged.
fn run(cli: &Cli, cancel: CancellationToken) -> Result<Option<Schedule>> {
    if cli.random {
        return run_random(cli, cancel);
    }

    let path = cli
        .config
        .as_deref()
        .context("either --config or --random is required")?;
    let scenario = ScenarioConfig::load_from_file(path)?;
    let topology = scenario.build_topology()?;
    let apps = scenario.build_applications(&topology)?;
    let options = solve_options(cli, scenario.solver.to_options(), cancel);

    let mut backend = SearchBackend::new();
    let outcome = synthesize(&topology, apps, &scenario.scheduler, &mut backend, &options)
        .with_context(|| format!("scenario {}", path.display()))?;

    Ok(match outcome {
        SynthesisOutcome::Feasible(schedule) => Some(schedule),
        SynthesisOutcome::Infeasible => {
            warn!("Scenario is infeasible");
            None
        }
        SynthesisOutcome::Interrupted(reason) => {
            warn!(%reason, "Solver stopped without an answer");
            None
        }
    })
}

fn run_random(cli: &Cli, cancel: CancellationToken) -> Result<Option<Schedule>> {
    let config = SchedulerConfig::default();
    let options = solve_options(cli, SolveOptions::default(), cancel);

    let result = synthesize_with_retries(cli.attempts, |attempt| {
        let seed = cli.seed.wrapping_add(u64::from(attempt) - 1);
        let scenario = seeded_scenario(seed, cli.nodes)?;
        info!(
            attempt,
            seed,
            applications = scenario.applications.len(),
            "Trying random scenario"
        );
        let mut backend = SearchBackend::new();
        synthesize(
            &scenario.topology,
            scenario.applications,
            &config,
            &mut backend,
            &options,
        )
    });

    match result {
        Ok(RetryOutcome::Found { attempt, schedule }) => {
            info!(attempt, "Random scenario scheduled");
            Ok(Some(schedule))
        }
        Ok(RetryOutcome::Cancelled { attempt }) => {
            warn!(attempt, "Cancelled");
            Ok(None)
        }
        Err(ScheduleError::AttemptsExhausted { attempts }) => {
            warn!(attempts, "No random scenario was schedulable");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Scenario budget, overridden by the command line, plus the cancel token.
fn solve_options(cli: &Cli, base: SolveOptions, cancel: CancellationToken) -> SolveOptions {
    let mut options = base.with_cancel(cancel);
    if let Some(ms) = cli.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    if let Some(steps) = cli.max_steps {
        options = options.with_max_steps(steps);
    }
    options
}

/// One debug line per occupied link per slot.
fn log_frames(schedule: &Schedule) {
    for slot in 0..schedule.hyperperiod() {
        for (link, occupant) in schedule.frame(slot) {
            debug!(slot, link = %link, occupant = %occupant, "frame");
        }
    }
}
