//! Rota quality metrics (KPIs).
//!
//! Computes the indicators reported with every solve, from a finished
//! schedule and the constraint model it was built for.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Preference violations | Requests whose code was not assigned |
//! | Shift spread | max(shifts) - min(shifts) over the roster |
//! | Coverage shortfall | Sum of max(0, required - assigned) per day and category |
//! | Certified shortfall | Same, for the certified minimums |
//! | Hours | Paid hours per nurse |

use std::collections::HashMap;

use crate::models::{ConstraintModel, Schedule, ShiftCategory};

/// Rota performance indicators.
#[derive(Debug, Clone)]
pub struct RotaKpi {
    /// Requests (non-empty, non-`OFF`, known code) left unhonored.
    pub preference_violations: usize,
    /// Worked shifts per nurse.
    pub shifts_by_nurse: HashMap<String, usize>,
    /// Fewest worked shifts of any nurse.
    pub min_shifts: usize,
    /// Most worked shifts of any nurse.
    pub max_shifts: usize,
    /// Paid hours per nurse.
    pub hours_by_nurse: HashMap<String, f64>,
    /// Missing nurses against the headcount, summed over days and categories.
    pub coverage_shortfall: usize,
    /// Missing certified nurses, summed over days and categories.
    pub certified_shortfall: usize,
}

impl RotaKpi {
    /// Computes KPIs from a schedule and its constraint model.
    pub fn calculate(schedule: &Schedule, model: &ConstraintModel) -> Self {
        let mut preference_violations = 0;
        for (n, nurse) in model.nurses().iter().enumerate() {
            let records = schedule.get(&nurse.name).unwrap_or_default();
            for d in 0..model.num_days() {
                let Some(s) = model.requested_code(n, d) else {
                    continue;
                };
                let wanted = &model.shift_types()[s].code;
                if records.get(d).map(|r| &r.shift) != Some(wanted) {
                    preference_violations += 1;
                }
            }
        }

        let shifts_by_nurse: HashMap<String, usize> = model
            .nurses()
            .iter()
            .map(|n| (n.name.clone(), schedule.working_shifts(&n.name)))
            .collect();
        let min_shifts = shifts_by_nurse.values().copied().min().unwrap_or(0);
        let max_shifts = shifts_by_nurse.values().copied().max().unwrap_or(0);

        let hours_by_nurse = model
            .nurses()
            .iter()
            .map(|n| (n.name.clone(), schedule.total_hours(&n.name)))
            .collect();

        let certified: Vec<&str> = model
            .nurses()
            .iter()
            .filter(|n| n.is_chemo_certified)
            .map(|n| n.name.as_str())
            .collect();
        let mut coverage_shortfall = 0;
        let mut certified_shortfall = 0;
        for d in 0..model.num_days() {
            for category in ShiftCategory::WORKING {
                let Some(req) = model.requirements().get(category) else {
                    continue;
                };
                let assigned = schedule.count_on(d, category);
                coverage_shortfall += (req.count as usize).saturating_sub(assigned);

                let certified_on = certified
                    .iter()
                    .filter(|name| {
                        schedule
                            .get(name)
                            .and_then(|records| records.get(d))
                            .is_some_and(|r| r.shift_type == category)
                    })
                    .count();
                certified_shortfall +=
                    (req.min_chemo_certified as usize).saturating_sub(certified_on);
            }
        }

        Self {
            preference_violations,
            shifts_by_nurse,
            min_shifts,
            max_shifts,
            hours_by_nurse,
            coverage_shortfall,
            certified_shortfall,
        }
    }

    /// `max_shifts - min_shifts`.
    pub fn spread(&self) -> usize {
        self.max_shifts - self.min_shifts
    }

    /// Weighted objective: `penalty * violations + fairness * spread`.
    pub fn objective(&self, preference_penalty: i64, fairness_weight: i64) -> i64 {
        preference_penalty * self.preference_violations as i64
            + fairness_weight * self.spread() as i64
    }

    /// Whether every headcount and certified minimum is met.
    pub fn is_fully_covered(&self) -> bool {
        self.coverage_shortfall == 0 && self.certified_shortfall == 0
    }
}
