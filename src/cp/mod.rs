//! CP-based rota formulation.
//!
//! A small boolean constraint-programming engine ([`CpModel`],
//! [`CpSolver`]) and the bridge that turns a [`ConstraintModel`] into a
//! model over one boolean per (nurse, day, shift code).
//!
//! # Hard constraints
//! 1. Exactly one code per nurse per day (`OFF` included).
//! 2. Daily day/night headcount equality.
//! 3. Daily certified minimum per category.
//! 4. At most 3 working days in every 4-day window.
//! 5. No day shift on the day after a night shift.
//! 6. `OFF` on at least one day of every aligned weekend pair.
//!
//! # Objective
//! `penalty * violated_requests + fairness * (max_shifts - min_shifts)`.

mod model;
mod search;
mod solver;

pub use model::{BoolVar, Cardinality, CpModel, DecisionGroup, Objective};
pub use solver::{CpSolution, CpSolver, CpStatus, SearchParams};

use crate::models::{
    ConstraintModel, Schedule, ShiftCategory, ShiftRecord, MAX_CONSECUTIVE_WORK_DAYS,
};

/// Default penalty per violated shift request.
pub const DEFAULT_PREFERENCE_PENALTY: i64 = 100;
/// Default weight of the workload spread.
pub const DEFAULT_FAIRNESS_WEIGHT: i64 = 10;

/// Variable layout of a rota model: `(nurse, day, code)` → [`BoolVar`].
#[derive(Debug, Clone)]
pub struct RotaVariables {
    vars: Vec<BoolVar>,
    num_days: usize,
    num_codes: usize,
}

impl RotaVariables {
    /// Variable of nurse `n` working code `s` on day `d`.
    #[inline]
    pub fn get(&self, n: usize, d: usize, s: usize) -> BoolVar {
        self.vars[(n * self.num_days + d) * self.num_codes + s]
    }

    /// All code variables of one nurse-day, in code order.
    pub fn cell(&self, n: usize, d: usize) -> &[BoolVar] {
        let start = (n * self.num_days + d) * self.num_codes;
        &self.vars[start..start + self.num_codes]
    }
}

/// Builds a CP model from a constraint model.
///
/// # Example
/// ```no_run
/// use nurse_rota::cp::{CpSolver, RotaCpBuilder, SearchParams};
/// # fn demo(model: &nurse_rota::models::ConstraintModel) {
/// let builder = RotaCpBuilder::new(model);
/// let (cp, vars) = builder.build();
/// let solution = CpSolver::new(SearchParams::default()).solve(&cp);
/// let schedule = builder.decode(&vars, &solution);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RotaCpBuilder<'a> {
    model: &'a ConstraintModel,
    preference_penalty: i64,
    fairness_weight: i64,
}

impl<'a> RotaCpBuilder<'a> {
    /// Creates a builder with the default weights (100 / 10).
    pub fn new(model: &'a ConstraintModel) -> Self {
        Self {
            model,
            preference_penalty: DEFAULT_PREFERENCE_PENALTY,
            fairness_weight: DEFAULT_FAIRNESS_WEIGHT,
        }
    }

    /// Sets objective weights.
    pub fn with_weights(mut self, preference_penalty: i64, fairness_weight: i64) -> Self {
        self.preference_penalty = preference_penalty;
        self.fairness_weight = fairness_weight;
        self
    }

    /// Builds the CP model and its variable layout.
    pub fn build(&self) -> (CpModel, RotaVariables) {
        let model = self.model;
        let num_nurses = model.nurses().len();
        let num_days = model.num_days();
        let num_codes = model.shift_types().len();
        let off = model.off_index();
        let day_codes: Vec<usize> = model.codes_in(ShiftCategory::Day).collect();
        let night_codes: Vec<usize> = model.codes_in(ShiftCategory::Night).collect();

        let mut cp = CpModel::new("nurse-rota");
        // laid out nurse-major, then day, then code
        let all: Vec<BoolVar> = (0..num_nurses * num_days * num_codes)
            .map(|_| cp.new_bool_var())
            .collect();
        let vars = RotaVariables {
            vars: all,
            num_days,
            num_codes,
        };

        // 1. one code per nurse-day
        for n in 0..num_nurses {
            for d in 0..num_days {
                cp.add_exactly_one(vars.cell(n, d).to_vec());
            }
        }

        // 2-3. headcount and certified minimum per category
        let reqs = model.requirements();
        for d in 0..num_days {
            for (category, codes) in [
                (ShiftCategory::Day, &day_codes),
                (ShiftCategory::Night, &night_codes),
            ] {
                let Some(req) = reqs.get(category) else {
                    continue;
                };
                let staffed: Vec<BoolVar> = (0..num_nurses)
                    .flat_map(|n| codes.iter().map(move |&s| (n, s)))
                    .map(|(n, s)| vars.get(n, d, s))
                    .collect();
                cp.add_sum_eq(staffed, req.count);

                let certified: Vec<BoolVar> = (0..num_nurses)
                    .filter(|&n| model.nurses()[n].is_chemo_certified)
                    .flat_map(|n| codes.iter().map(move |&s| (n, s)))
                    .map(|(n, s)| vars.get(n, d, s))
                    .collect();
                cp.add_sum_ge(certified, req.min_chemo_certified);
            }
        }

        // 4. no more than 3 working days in any 4-day window
        let window = MAX_CONSECUTIVE_WORK_DAYS + 1;
        for n in 0..num_nurses {
            for start in model.calendar().sliding_windows(window) {
                let working: Vec<BoolVar> = (start..start + window)
                    .flat_map(|d| (0..num_codes).filter(|&s| s != off).map(move |s| (d, s)))
                    .map(|(d, s)| vars.get(n, d, s))
                    .collect();
                cp.add_sum_le(working, MAX_CONSECUTIVE_WORK_DAYS as u32);
            }
        }

        // 5. no night shift followed by a day shift
        for n in 0..num_nurses {
            for d in 0..num_days.saturating_sub(1) {
                for &ns in &night_codes {
                    for &ds in &day_codes {
                        cp.add_not_both(vars.get(n, d, ns), vars.get(n, d + 1, ds));
                    }
                }
            }
        }

        // 6. one weekend day off per aligned week
        for n in 0..num_nurses {
            for (sat, sun) in model.calendar().weekend_pairs() {
                cp.add_bool_or(vec![vars.get(n, sat, off), vars.get(n, sun, off)]);
            }
        }

        // Objective: honored requests, then balanced workload
        for n in 0..num_nurses {
            for d in 0..num_days {
                if let Some(s) = model.requested_code(n, d) {
                    cp.penalize_unless(vars.get(n, d, s), self.preference_penalty);
                }
            }
        }
        let workloads = (0..num_nurses)
            .map(|n| {
                (0..num_days)
                    .flat_map(|d| (0..num_codes).filter(|&s| s != off).map(move |s| (d, s)))
                    .map(|(d, s)| vars.get(n, d, s))
                    .collect()
            })
            .collect();
        cp.minimize_spread(workloads, self.fairness_weight);

        // Equal loads are impossible when the work does not divide evenly.
        let total_work = reqs.daily_headcount() * num_days as u64;
        if num_nurses > 0 && total_work % num_nurses as u64 != 0 {
            cp.set_objective_floor(self.fairness_weight);
        }

        // Branch day by day; within a day, nurse by nurse.
        for d in 0..num_days {
            for n in 0..num_nurses {
                let hint = model.requested_code(n, d).map(|s| vars.get(n, d, s));
                cp.add_decision_group(d as u32, vars.cell(n, d).to_vec(), hint);
            }
        }

        (cp, vars)
    }

    /// Decodes a CP solution into a schedule.
    ///
    /// Returns `None` when the solution carries no assignment.
    pub fn decode(&self, vars: &RotaVariables, solution: &CpSolution) -> Option<Schedule> {
        if !solution.is_solution_found() {
            return None;
        }
        let model = self.model;
        let types = model.shift_types();
        let mut schedule = Schedule::new();
        for (n, nurse) in model.nurses().iter().enumerate() {
            let records = model
                .calendar()
                .dates()
                .iter()
                .enumerate()
                .map(|(d, &date)| {
                    match vars.cell(n, d).iter().position(|&v| solution.value(v)) {
                        Some(s) => ShiftRecord::new(date, &types[s]),
                        None => ShiftRecord::off(date),
                    }
                })
                .collect();
            schedule.insert(nurse.name.clone(), records);
        }
        Some(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ConstraintSpec, DateRange, Nurse, Preferences, ShiftRequirement, ShiftRequirements,
    };
    use chrono::NaiveDate;
    use std::time::Duration;

    fn make_model(nurses: usize, days: u64, day: u32, night: u32, prefs: Preferences) -> ConstraintModel {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = start + chrono::Days::new(days - 1);
        let roster = (0..nurses)
            .map(|i| Nurse::new(format!("N{i}")).with_certification(i % 3 != 2))
            .collect();
        let spec = ConstraintSpec::new(
            DateRange::new(start, end),
            ShiftRequirements::new(
                ShiftRequirement::new(day, vec!["07".into(), "Z07".into()]).with_min_certified(1),
                ShiftRequirement::new(night, vec!["Z23".into()]).with_min_certified(1),
            ),
            roster,
        );
        ConstraintModel::new(spec, prefs).unwrap()
    }

    fn params() -> SearchParams {
        SearchParams {
            time_limit: Duration::from_secs(20),
            workers: 4,
            seed: 3,
        }
    }

    #[test]
    fn test_build_model_size() {
        let model = make_model(4, 7, 1, 1, Preferences::new());
        let (cp, vars) = RotaCpBuilder::new(&model).build();
        // 4 nurses × 7 days × 4 codes (07, Z07, Z23, OFF)
        assert_eq!(cp.var_count(), 4 * 7 * 4);
        assert_eq!(vars.cell(1, 2).len(), 4);
        let exactly_one = 4 * 7;
        let coverage = 7 * 2 * 2;
        let windows = 4 * 4;
        let night_day = 4 * 6 * 2;
        let weekend = 4;
        assert_eq!(
            cp.constraint_count(),
            exactly_one + coverage + windows + night_day + weekend
        );
        assert_eq!(cp.decision_groups().len(), 28);
    }

    #[test]
    fn test_objective_floor_when_uneven() {
        // 2 shifts/day over 7 days = 14, not divisible by 4 nurses
        let model = make_model(4, 7, 1, 1, Preferences::new());
        let (cp, _) = RotaCpBuilder::new(&model).build();
        assert_eq!(cp.objective().floor, DEFAULT_FAIRNESS_WEIGHT);

        // 2 shifts/day over 6 days = 12, divisible by 4
        let model = make_model(4, 6, 1, 1, Preferences::new());
        let (cp, _) = RotaCpBuilder::new(&model).build();
        assert_eq!(cp.objective().floor, 0);
    }

    #[test]
    fn test_preferences_become_penalties_and_hints() {
        let prefs = Preferences::new()
            .with_nurse("N0", &["Z07", "", "OFF", "", "", "", ""])
            .with_nurse("N3", &["", "Z23", "", "", "", "", ""]);
        let model = make_model(4, 7, 1, 1, prefs);
        let (cp, vars) = RotaCpBuilder::new(&model).with_weights(50, 5).build();
        let penalties = &cp.objective().penalties;
        assert_eq!(penalties.len(), 2);
        assert!(penalties.contains(&(vars.get(0, 0, 1), 50)));
        assert!(penalties.contains(&(vars.get(3, 1, 2), 50)));
        assert_eq!(cp.objective().balance_weight, 5);
    }

    #[test]
    fn test_solve_and_decode() {
        let prefs = Preferences::new().with_nurse("N1", &["Z07", "", "", "", "", "", ""]);
        let model = make_model(6, 7, 2, 1, prefs);
        let builder = RotaCpBuilder::new(&model);
        let (cp, vars) = builder.build();
        let solution = CpSolver::new(params()).solve(&cp);
        assert!(solution.is_solution_found());
        assert!(cp.is_satisfied(solution.values.as_ref().unwrap()));

        let schedule = builder.decode(&vars, &solution).unwrap();
        assert_eq!(schedule.nurse_count(), 6);
        for d in 0..7 {
            assert_eq!(schedule.count_on(d, ShiftCategory::Day), 2);
            assert_eq!(schedule.count_on(d, ShiftCategory::Night), 1);
        }
        assert_eq!(schedule.get("N1").unwrap()[0].shift, "Z07");
    }

    #[test]
    fn test_decode_without_solution() {
        let model = make_model(2, 2, 1, 1, Preferences::new());
        let builder = RotaCpBuilder::new(&model);
        let (_, vars) = builder.build();
        let empty = CpSolution {
            status: CpStatus::Unknown,
            objective: None,
            values: None,
            elapsed: Duration::ZERO,
            nodes: 0,
        };
        assert!(builder.decode(&vars, &empty).is_none());
    }
}
