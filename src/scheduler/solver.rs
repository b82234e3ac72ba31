//! Rota solve pipeline: resource checks, CP search, greedy fallback.
//!
//! # Algorithm
//!
//! 1. Reject inputs whose certified supply or nurse capacity cannot cover
//!    the requirements, before any search.
//! 2. Skip the search when the rest rules alone leave too few nurses for
//!    the headcount. Otherwise build the CP formulation ([`RotaCpBuilder`])
//!    and search it under the configured time limit and worker count.
//! 3. On an optimal or feasible result, decode it. Otherwise log a
//!    warning and run the [`GreedyAllocator`].

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use super::fallback::GreedyAllocator;
use super::kpi::RotaKpi;
use crate::config::SolverConfig;
use crate::cp::{CpSolution, CpSolver, CpStatus, RotaCpBuilder};
use crate::error::{RotaError, RotaResult};
use crate::models::{
    ConstraintModel, ConstraintSpec, Preferences, Schedule, MAX_CONSECUTIVE_WORK_DAYS,
};

/// How a schedule was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SolutionOrigin {
    /// CP search, optimality proven.
    Optimal,
    /// CP search, best found within the time limit.
    Feasible,
    /// Greedy fallback after the search found nothing.
    Fallback,
}

/// A schedule with its solve report.
#[derive(Debug, Clone)]
pub struct Solution {
    /// The rota.
    pub schedule: Schedule,
    /// Where the rota came from.
    pub origin: SolutionOrigin,
    /// Status reported by the CP search.
    pub cp_status: CpStatus,
    /// Weighted objective of the rota.
    pub objective: i64,
    /// Quality indicators.
    pub kpi: RotaKpi,
    /// Wall-clock time of the whole solve.
    pub elapsed: Duration,
}

/// Nurse rota solver.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use nurse_rota::config::SolverConfig;
/// use nurse_rota::scheduler::RotaSolver;
/// # fn demo(model: &nurse_rota::models::ConstraintModel) -> nurse_rota::error::RotaResult<()> {
/// let solver = RotaSolver::new(SolverConfig::default().with_time_limit(Duration::from_secs(10)));
/// let solution = solver.solve(model)?;
/// println!("{:?}: {} violations", solution.origin, solution.kpi.preference_violations);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RotaSolver {
    config: SolverConfig,
}

impl Solution {
    /// Whether the CP search produced the schedule.
    pub fn is_from_search(&self) -> bool {
        self.origin != SolutionOrigin::Fallback
    }
}

impl RotaSolver {
    /// Creates a solver.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Solver settings.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves a rota.
    ///
    /// # Errors
    /// - [`RotaError::Config`] when the solver settings are invalid.
    /// - [`RotaError::InsufficientCertified`] / [`RotaError::InsufficientCapacity`]
    ///   when the roster cannot cover the requirements.
    ///
    /// A search that finds nothing is not an error; the result then comes
    /// from the greedy fallback.
    pub fn solve(&self, model: &ConstraintModel) -> RotaResult<Solution> {
        self.config.validate()?;
        check_resources(model)?;

        let started = Instant::now();
        let required_shifts = model.requirements().daily_headcount() * model.num_days() as u64;
        info!(
            nurses = model.nurses().len(),
            certified = model.certified_count(),
            days = model.num_days(),
            required_shifts,
            "solving rota"
        );

        let (result, decoded) = match rest_capacity_shortfall(model) {
            Some(reason) => {
                warn!(%reason, "rest rules cannot be met, skipping search");
                (CpSolution::infeasible(), None)
            }
            None => {
                let builder = RotaCpBuilder::new(model)
                    .with_weights(self.config.preference_penalty, self.config.fairness_weight);
                let (cp, vars) = builder.build();
                let result = CpSolver::new(self.config.search_params()).solve(&cp);
                let decoded = builder.decode(&vars, &result);
                (result, decoded)
            }
        };

        let (schedule, origin) = match decoded {
            Some(schedule) => {
                let origin = if result.status == CpStatus::Optimal {
                    SolutionOrigin::Optimal
                } else {
                    SolutionOrigin::Feasible
                };
                (schedule, origin)
            }
            None => {
                warn!(
                    status = ?result.status,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "no solution from search, using greedy fallback"
                );
                let schedule = GreedyAllocator::new(self.config.fallback.clone()).allocate(model);
                (schedule, SolutionOrigin::Fallback)
            }
        };

        let kpi = RotaKpi::calculate(&schedule, model);
        let objective = kpi.objective(self.config.preference_penalty, self.config.fairness_weight);
        let elapsed = started.elapsed();
        info!(
            ?origin,
            objective,
            assigned_shifts = schedule.total_working_shifts(),
            preference_violations = kpi.preference_violations,
            spread = kpi.spread(),
            elapsed_ms = elapsed.as_millis() as u64,
            "rota solved"
        );

        Ok(Solution {
            schedule,
            origin,
            cp_status: result.status,
            objective,
            kpi,
            elapsed,
        })
    }
}

/// Solves a rota with the default settings.
///
/// # Errors
/// Configuration errors from building the model, and the resource errors
/// of [`RotaSolver::solve`].
pub fn solve(preferences: Preferences, constraints: ConstraintSpec) -> RotaResult<Schedule> {
    let model = ConstraintModel::new(constraints, preferences)?;
    RotaSolver::default()
        .solve(&model)
        .map(|solution| solution.schedule)
}

/// Checks certified supply, then total capacity.
pub fn check_resources(model: &ConstraintModel) -> RotaResult<()> {
    let days = model.num_days();
    let reqs = model.requirements();

    let required = reqs.daily_certified() * days as u64;
    let available = model.certified_count() as u64 * days as u64;
    if required > available {
        return Err(RotaError::InsufficientCertified {
            required,
            available,
            days,
        });
    }

    let required = reqs.daily_headcount() * days as u64;
    let possible = model.nurses().len() as u64 * days as u64;
    if required > possible {
        return Err(RotaError::InsufficientCapacity { required, possible });
    }
    Ok(())
}

/// Counting bounds implied by the rest rules.
///
/// Every nurse works at most one day of a weekend pair and at most
/// `MAX_CONSECUTIVE_WORK_DAYS` days of any longer window, so a daily
/// headcount above those bounds has no solution.
fn rest_capacity_shortfall(model: &ConstraintModel) -> Option<String> {
    let headcount = model.requirements().daily_headcount();
    let nurses = model.nurses().len() as u64;

    if !model.calendar().weekend_pairs().is_empty() && 2 * headcount > nurses {
        return Some(format!(
            "weekend pairs need {} shifts, {nurses} nurses can work at most one day each",
            2 * headcount
        ));
    }
    let window = MAX_CONSECUTIVE_WORK_DAYS + 1;
    if model.num_days() >= window {
        let needed = window as u64 * headcount;
        let possible = MAX_CONSECUTIVE_WORK_DAYS as u64 * nurses;
        if needed > possible {
            return Some(format!(
                "{window}-day windows need {needed} shifts, {nurses} nurses can work {possible}"
            ));
        }
    }
    None
}
