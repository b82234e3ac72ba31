//! Nurse rota CLI.
//!
//! Solves rota requests and checks finished schedules.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use nurse_rota::compliance::ScheduleValidator;
use nurse_rota::config::SolverConfig;
use nurse_rota::logging;
use nurse_rota::models::{ConstraintModel, Schedule, ShiftGrid};
use nurse_rota::scheduler::RotaSolver;

#[derive(Parser)]
#[command(name = "nurse-rota")]
#[command(about = "Day/night nurse rota assignment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a rota request and print the schedule as JSON.
    Solve {
        /// Request file: {"constraints": ..., "preferences": ..., "config": ...}
        input: PathBuf,

        /// Write the schedule here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Search time limit in seconds
        #[arg(long, env = "ROTA_TIME_LIMIT_SECS")]
        time_limit: Option<f64>,

        /// Parallel search workers
        #[arg(long, env = "ROTA_WORKERS")]
        workers: Option<usize>,

        /// Search seed
        #[arg(long, env = "ROTA_SEED")]
        seed: Option<u64>,

        /// Seed for the fallback's tie-breaking
        #[arg(long)]
        fallback_seed: Option<u64>,

        /// Keep rest rules in the fallback repair pass
        #[arg(long)]
        respect_rest_rules: bool,
    },

    /// Check a schedule against a request and print violations as JSON.
    Validate {
        /// Request file the schedule was made for
        input: PathBuf,

        /// Schedule file: records per nurse, or plain codes per nurse
        schedule: PathBuf,
    },
}

/// Request document read by both commands.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Request {
    constraints: Value,
    #[serde(default)]
    preferences: Option<Value>,
    #[serde(default)]
    config: Option<SolverConfig>,
    /// Requested days off per nurse, checked by `validate`.
    #[serde(default)]
    off_requests: HashMap<String, HashSet<NaiveDate>>,
}

fn read_request(path: &Path) -> Result<Request> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing request {}", path.display()))
}

fn read_grid(path: &Path) -> Result<ShiftGrid> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if let Ok(schedule) = serde_json::from_str::<Schedule>(&text) {
        return Ok(schedule.to_grid());
    }
    serde_json::from_str(&text).with_context(|| format!("parsing schedule {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    match cli.command {
        Commands::Solve {
            input,
            output,
            time_limit,
            workers,
            seed,
            fallback_seed,
            respect_rest_rules,
        } => {
            let request = read_request(&input)?;
            let mut config = request.config.unwrap_or_default();
            if let Some(secs) = time_limit {
                config.time_limit_secs = secs;
            }
            if let Some(workers) = workers {
                config = config.with_workers(workers);
            }
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if let Some(seed) = fallback_seed {
                config.fallback.seed = Some(seed);
            }
            config.fallback.respect_rest_rules |= respect_rest_rules;

            let model = ConstraintModel::from_values(request.constraints, request.preferences.as_ref())
                .context("building constraint model")?;
            let solution = RotaSolver::new(config).solve(&model)?;
            info!(
                origin = ?solution.origin,
                objective = solution.objective,
                "schedule ready"
            );

            let json = serde_json::to_string_pretty(&solution.schedule)?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{json}"),
            }
        }

        Commands::Validate { input, schedule } => {
            let request = read_request(&input)?;
            let model = ConstraintModel::from_values(request.constraints, request.preferences.as_ref())
                .context("building constraint model")?;
            let grid = read_grid(&schedule)?;

            let violations = ScheduleValidator::for_model(&model)
                .with_off_requests(request.off_requests)
                .validate(&grid);
            info!(count = violations.len(), "validation finished");
            println!("{}", serde_json::to_string_pretty(&violations)?);
        }
    }

    Ok(())
}
