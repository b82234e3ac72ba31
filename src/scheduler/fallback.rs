//! Greedy fallback allocator.
//!
//! Used when the CP search returns no solution within its budget. It
//! always produces a complete schedule, possibly under-covered.
//!
//! # Algorithm
//!
//! 1. **Preference pass**: every nurse-day with a request for an eligible
//!    code gets that code while the category quota for the day is open.
//!    Everything else starts as `OFF`.
//! 2. **Repair pass**: for each day and category, `OFF` nurses are pulled
//!    in (certified nurses first while the certified minimum is unmet) and
//!    given the category's first code until the quota is met or no
//!    candidate remains.
//!
//! Candidates are tried in roster order, or in a seeded shuffle per day
//! and category when [`FallbackConfig::seed`] is set.
//!
//! The consecutive-day, night-to-day and weekend rules are not enforced
//! unless [`FallbackConfig::respect_rest_rules`] is set, in which case the
//! repair pass skips candidates that would break the first two.
//!
//! # Complexity
//! O(d * c * n) where d=days, c=categories, n=nurses.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::config::FallbackConfig;
use crate::models::{
    ConstraintModel, Schedule, ShiftCategory, ShiftRecord, MAX_CONSECUTIVE_WORK_DAYS,
};

/// Greedy allocator producing a best-effort schedule.
///
/// # Example
///
/// ```no_run
/// use nurse_rota::config::FallbackConfig;
/// use nurse_rota::scheduler::GreedyAllocator;
/// # fn demo(model: &nurse_rota::models::ConstraintModel) {
/// let schedule = GreedyAllocator::new(FallbackConfig::default().with_seed(7)).allocate(model);
/// assert_eq!(schedule.nurse_count(), model.nurses().len());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GreedyAllocator {
    config: FallbackConfig,
}

/// Code index per nurse per day during allocation.
struct Grid<'a> {
    model: &'a ConstraintModel,
    cells: Vec<Vec<usize>>,
}

impl<'a> Grid<'a> {
    fn new(model: &'a ConstraintModel) -> Self {
        let off = model.off_index();
        Self {
            model,
            cells: vec![vec![off; model.num_days()]; model.nurses().len()],
        }
    }

    fn category(&self, n: usize, d: usize) -> ShiftCategory {
        self.model.shift_types()[self.cells[n][d]].category
    }

    fn is_off(&self, n: usize, d: usize) -> bool {
        self.cells[n][d] == self.model.off_index()
    }

    fn count_on(&self, d: usize, category: ShiftCategory) -> usize {
        (0..self.cells.len())
            .filter(|&n| self.category(n, d) == category)
            .count()
    }

    fn certified_on(&self, d: usize, category: ShiftCategory) -> usize {
        self.model
            .nurses()
            .iter()
            .enumerate()
            .filter(|(n, nurse)| nurse.is_chemo_certified && self.category(*n, d) == category)
            .count()
    }

    /// Whether working `category` on day `d` keeps nurse `n` within the
    /// consecutive-day limit and off day shifts right after nights.
    fn keeps_rest_rules(&self, n: usize, d: usize, category: ShiftCategory) -> bool {
        let days = self.model.num_days();
        let before = (0..d).rev().take_while(|&x| !self.is_off(n, x)).count();
        let after = (d + 1..days).take_while(|&x| !self.is_off(n, x)).count();
        if before + 1 + after > MAX_CONSECUTIVE_WORK_DAYS {
            return false;
        }
        match category {
            ShiftCategory::Day => d == 0 || self.category(n, d - 1) != ShiftCategory::Night,
            ShiftCategory::Night => d + 1 >= days || self.category(n, d + 1) != ShiftCategory::Day,
            ShiftCategory::Off => true,
        }
    }

    fn into_schedule(self) -> Schedule {
        let mut schedule = Schedule::new();
        for (nurse, row) in self.model.nurses().iter().zip(self.cells) {
            let records = self
                .model
                .calendar()
                .dates()
                .iter()
                .zip(row)
                .map(|(&date, s)| ShiftRecord::new(date, &self.model.shift_types()[s]))
                .collect();
            schedule.insert(nurse.name.clone(), records);
        }
        schedule
    }
}

impl GreedyAllocator {
    /// Creates an allocator.
    pub fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    /// Fallback settings.
    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Builds a schedule for `model`.
    ///
    /// Every nurse gets exactly one record per day. Headcounts never exceed
    /// the requirement; they fall short only when candidates run out.
    pub fn allocate(&self, model: &ConstraintModel) -> Schedule {
        let mut grid = Grid::new(model);
        let mut rng = self.config.seed.map(StdRng::seed_from_u64);
        let reqs = model.requirements();

        // 1. Preference pass
        for n in 0..model.nurses().len() {
            for d in 0..model.num_days() {
                let Some(s) = model.requested_code(n, d) else {
                    continue;
                };
                let category = model.shift_types()[s].category;
                let quota = reqs.get(category).map_or(0, |r| r.count as usize);
                if grid.count_on(d, category) < quota {
                    grid.cells[n][d] = s;
                }
            }
        }

        // 2. Repair pass
        let mut unfilled = 0usize;
        for d in 0..model.num_days() {
            for category in ShiftCategory::WORKING {
                let Some(req) = reqs.get(category) else {
                    continue;
                };
                let Some(code) = req.primary_code().and_then(|c| model.code_index(c)) else {
                    continue;
                };

                let mut candidates: Vec<usize> = (0..model.nurses().len())
                    .filter(|&n| grid.is_off(n, d))
                    .collect();
                if let Some(rng) = rng.as_mut() {
                    candidates.shuffle(rng);
                }

                while grid.count_on(d, category) < req.count as usize {
                    let wants_certified =
                        grid.certified_on(d, category) < req.min_chemo_certified as usize;
                    let eligible = |n: &usize| {
                        !self.config.respect_rest_rules || grid.keeps_rest_rules(*n, d, category)
                    };
                    let pick = wants_certified
                        .then(|| {
                            candidates
                                .iter()
                                .position(|n| model.nurses()[*n].is_chemo_certified && eligible(n))
                        })
                        .flatten()
                        .or_else(|| candidates.iter().position(eligible));
                    let Some(pos) = pick else {
                        break;
                    };
                    let n = candidates.remove(pos);
                    grid.cells[n][d] = code;
                }
                unfilled += (req.count as usize).saturating_sub(grid.count_on(d, category));
            }
        }

        debug!(
            nurses = model.nurses().len(),
            days = model.num_days(),
            unfilled,
            "greedy allocation finished"
        );
        grid.into_schedule()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ConstraintSpec, DateRange, Nurse, Preferences, ShiftRequirement, ShiftRequirements,
    };
    use chrono::NaiveDate;

    fn model(nurses: Vec<Nurse>, days: u64, day: (u32, u32), night: (u32, u32), prefs: Preferences) -> ConstraintModel {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = start + chrono::Days::new(days - 1);
        let spec = ConstraintSpec::new(
            DateRange::new(start, end),
            ShiftRequirements::new(
                ShiftRequirement::new(day.0, vec!["07".into(), "Z07".into()])
                    .with_min_certified(day.1),
                ShiftRequirement::new(night.0, vec!["Z23".into()]).with_min_certified(night.1),
            ),
            nurses,
        );
        ConstraintModel::new(spec, prefs).unwrap()
    }

    fn roster(n: usize, certified: usize) -> Vec<Nurse> {
        (0..n)
            .map(|i| Nurse::new(format!("N{i}")).with_certification(i < certified))
            .collect()
    }

    #[test]
    fn test_fills_quotas_and_length() {
        let m = model(roster(6, 3), 7, (2, 1), (1, 1), Preferences::new());
        let schedule = GreedyAllocator::default().allocate(&m);
        assert_eq!(schedule.nurse_count(), 6);
        for (_, records) in schedule.iter() {
            assert_eq!(records.len(), 7);
        }
        for d in 0..7 {
            assert_eq!(schedule.count_on(d, ShiftCategory::Day), 2);
            assert_eq!(schedule.count_on(d, ShiftCategory::Night), 1);
        }
        // without requests every shift is the first listed code
        for (_, records) in schedule.iter() {
            assert!(records
                .iter()
                .all(|r| matches!(r.shift.as_str(), "07" | "Z23" | "OFF")));
        }
    }

    #[test]
    fn test_honors_preferences_within_quota() {
        let prefs = Preferences::new()
            .with_nurse("N3", &["Z07", "", ""])
            .with_nurse("N4", &["Z07", "", ""])
            .with_nurse("N5", &["Z07", "", ""]);
        let m = model(roster(6, 2), 3, (2, 0), (1, 0), prefs);
        let schedule = GreedyAllocator::default().allocate(&m);
        // quota of 2: the third request is dropped
        assert_eq!(schedule.get("N3").unwrap()[0].shift, "Z07");
        assert_eq!(schedule.get("N4").unwrap()[0].shift, "Z07");
        assert_eq!(schedule.get("N5").unwrap()[0].shift, "OFF");
        assert_eq!(schedule.count_on(0, ShiftCategory::Day), 2);
    }

    #[test]
    fn test_certified_first_in_repair() {
        // certified nurses sit at the end of the roster
        let nurses = vec![
            Nurse::new("A"),
            Nurse::new("B"),
            Nurse::certified("C"),
            Nurse::certified("D"),
        ];
        let m = model(nurses, 2, (1, 1), (1, 1), Preferences::new());
        let schedule = GreedyAllocator::default().allocate(&m);
        for d in 0..2 {
            let on = |name: &str, cat| schedule.get(name).unwrap()[d].shift_type == cat;
            assert!(on("C", ShiftCategory::Day) || on("D", ShiftCategory::Day));
            assert!(on("C", ShiftCategory::Night) || on("D", ShiftCategory::Night));
        }
    }

    #[test]
    fn test_undercovered_when_roster_short() {
        let m = model(roster(2, 1), 2, (2, 0), (1, 0), Preferences::new());
        let schedule = GreedyAllocator::default().allocate(&m);
        for d in 0..2 {
            assert_eq!(schedule.count_on(d, ShiftCategory::Day), 2);
            assert_eq!(schedule.count_on(d, ShiftCategory::Night), 0);
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let m = model(roster(8, 4), 7, (2, 1), (2, 1), Preferences::new());
        let allocator = GreedyAllocator::new(FallbackConfig::default().with_seed(11));
        let a = allocator.allocate(&m).to_grid();
        let b = allocator.allocate(&m).to_grid();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rest_rules_guard() {
        let m = model(roster(8, 8), 10, (2, 0), (1, 0), Preferences::new());
        let allocator = GreedyAllocator::new(FallbackConfig::default().respecting_rest_rules());
        let schedule = allocator.allocate(&m);
        for (name, records) in schedule.iter() {
            let mut run = 0;
            for (d, r) in records.iter().enumerate() {
                run = if r.is_working() { run + 1 } else { 0 };
                assert!(run <= MAX_CONSECUTIVE_WORK_DAYS, "{name} works {run} days in a row");
                if d > 0 && r.shift_type == ShiftCategory::Day {
                    assert_ne!(records[d - 1].shift_type, ShiftCategory::Night, "{name} day {d}");
                }
            }
        }
        for d in 0..10 {
            assert_eq!(schedule.count_on(d, ShiftCategory::Day), 2);
            assert_eq!(schedule.count_on(d, ShiftCategory::Night), 1);
        }
    }

    #[test]
    fn test_zero_headcount_all_off() {
        let m = model(roster(3, 1), 4, (0, 0), (0, 0), Preferences::new());
        let schedule = GreedyAllocator::default().allocate(&m);
        assert_eq!(schedule.total_working_shifts(), 0);
    }
}
