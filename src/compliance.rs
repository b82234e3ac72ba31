//! Schedule compliance checks.
//!
//! Re-verifies a finished rota against the unit's rules, independently of
//! how it was produced. Reports every problem found and never fails.
//!
//! # Checks
//!
//! | Check | Entity | Rule |
//! |-------|--------|------|
//! | Missing day | nurse | one entry per day |
//! | Off request | nurse | no working shift on a requested day off |
//! | Unknown code | nurse | code is a day code, night code, `OFF` or empty |
//! | Coverage | date | day/night headcount equals the rule |
//! | Head nurse | date | exactly one on day shift, none on nights |
//! | Certified | date | certified count per category at least the minimum |
//! | Consecutive days | nurse | no run over 3 working days |
//! | Contracted hours | nurse | total within the tolerance of the contract |
//!
//! A day shift with no designated head nurse is a head nurse violation.
//! The hours check applies only to nurses with contracted hours.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;

use crate::models::{
    ConstraintModel, Nurse, Schedule, ShiftCalendar, ShiftCategory, ShiftGrid, Violation,
    ViolationType, MAX_CONSECUTIVE_WORK_DAYS, OFF,
};

/// Headcount rule of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRule {
    /// Exact headcount per day.
    pub count: usize,
    /// Minimum certified nurses per day.
    pub min_certified: usize,
    /// Codes belonging to the category.
    pub codes: BTreeSet<String>,
}

/// Unit rules checked by [`ScheduleValidator`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRules {
    /// Day shift rule.
    pub day: CategoryRule,
    /// Night shift rule.
    pub night: CategoryRule,
    /// Paid hours per code; unknown codes count 0.
    pub code_hours: HashMap<String, f64>,
    /// Allowed distance between assigned and contracted hours.
    pub hours_tolerance: f64,
}

impl CategoryRule {
    fn new(count: usize, min_certified: usize, codes: &[&str]) -> Self {
        Self {
            count,
            min_certified,
            codes: codes.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Default for CoverageRules {
    /// The oncology unit rules: 5 on days, 4 on nights, 2 certified each.
    fn default() -> Self {
        let code_hours = [
            ("07", 8.0),
            ("19", 8.0),
            ("Z07", 12.0),
            ("Z19", 12.0),
            ("Z23", 12.0),
            ("Z23 B", 12.0),
        ]
        .into_iter()
        .map(|(code, hours)| (code.to_string(), hours))
        .collect();
        Self {
            day: CategoryRule::new(5, 2, &["07", "Z07", "Z19"]),
            night: CategoryRule::new(4, 2, &["Z23", "Z23 B", "19"]),
            code_hours,
            hours_tolerance: 8.0,
        }
    }
}

impl CoverageRules {
    /// Derives the rules from a constraint model's requirements and shift table.
    pub fn from_model(model: &ConstraintModel) -> Self {
        let rule = |category| {
            let codes = model
                .codes_in(category)
                .map(|s| model.shift_types()[s].code.clone())
                .collect();
            let req = model.requirements().get(category);
            CategoryRule {
                count: req.map_or(0, |r| r.count as usize),
                min_certified: req.map_or(0, |r| r.min_chemo_certified as usize),
                codes,
            }
        };
        let code_hours = model
            .shift_types()
            .iter()
            .map(|t| (t.code.clone(), t.info.hours))
            .collect();
        Self {
            day: rule(ShiftCategory::Day),
            night: rule(ShiftCategory::Night),
            code_hours,
            hours_tolerance: 8.0,
        }
    }

    /// Sets the hours tolerance.
    pub fn with_hours_tolerance(mut self, tolerance: f64) -> Self {
        self.hours_tolerance = tolerance;
        self
    }

    fn category_of(&self, code: &str) -> Option<ShiftCategory> {
        if code.is_empty() || code == OFF {
            Some(ShiftCategory::Off)
        } else if self.day.codes.contains(code) {
            Some(ShiftCategory::Day)
        } else if self.night.codes.contains(code) {
            Some(ShiftCategory::Night)
        } else {
            None
        }
    }

    fn hours_of(&self, code: &str) -> f64 {
        self.code_hours.get(code).copied().unwrap_or(0.0)
    }
}

/// Checks shift grids against [`CoverageRules`] and nurse attributes.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use nurse_rota::compliance::{CoverageRules, ScheduleValidator};
/// use nurse_rota::models::{ShiftCalendar, ShiftGrid};
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let calendar = ShiftCalendar::starting(start, 1).unwrap();
/// let validator = ScheduleValidator::new(CoverageRules::default(), calendar);
/// let grid = ShiftGrid::from([("Kim".to_string(), vec!["07".to_string()])]);
/// assert!(!validator.validate(&grid).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ScheduleValidator {
    rules: CoverageRules,
    calendar: ShiftCalendar,
    contracted_hours: HashMap<String, f64>,
    off_requests: HashMap<String, HashSet<NaiveDate>>,
    head_nurses: HashSet<String>,
    certified: HashSet<String>,
}

impl ScheduleValidator {
    /// Creates a validator with no nurse attributes.
    pub fn new(rules: CoverageRules, calendar: ShiftCalendar) -> Self {
        Self {
            rules,
            calendar,
            contracted_hours: HashMap::new(),
            off_requests: HashMap::new(),
            head_nurses: HashSet::new(),
            certified: HashSet::new(),
        }
    }

    /// Validator for schedules of `model`: its rules, calendar and roster.
    pub fn for_model(model: &ConstraintModel) -> Self {
        Self::new(CoverageRules::from_model(model), model.calendar().clone())
            .with_nurse_metadata(model.nurses())
    }

    /// Takes contracted hours, head nurses and certifications from a roster.
    pub fn with_nurse_metadata(mut self, nurses: &[Nurse]) -> Self {
        for nurse in nurses {
            if let Some(hours) = nurse.contracted_hours {
                self.contracted_hours.insert(nurse.name.clone(), hours);
            }
            if nurse.is_head_nurse {
                self.head_nurses.insert(nurse.name.clone());
            }
            if nurse.is_chemo_certified {
                self.certified.insert(nurse.name.clone());
            }
        }
        self
    }

    /// Sets requested days off per nurse.
    pub fn with_off_requests(mut self, requests: HashMap<String, HashSet<NaiveDate>>) -> Self {
        self.off_requests = requests;
        self
    }

    /// Adds head nurses.
    pub fn with_head_nurses<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.head_nurses.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds certified nurses.
    pub fn with_certified<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.certified.extend(names.into_iter().map(Into::into));
        self
    }

    /// Rules in use.
    pub fn rules(&self) -> &CoverageRules {
        &self.rules
    }

    /// Validates a full schedule.
    pub fn validate_schedule(&self, schedule: &Schedule) -> Vec<Violation> {
        self.validate(&schedule.to_grid())
    }

    /// Validates a shift grid.
    ///
    /// Violations come per day in date order (nurse findings first, then
    /// the day's coverage findings), then per nurse in name order for runs
    /// and hours.
    pub fn validate(&self, grid: &ShiftGrid) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (d, &date) in self.calendar.dates().iter().enumerate() {
            self.check_day(grid, d, date, &mut violations);
        }
        for (nurse, shifts) in grid {
            self.check_runs(nurse, shifts, &mut violations);
            self.check_hours(nurse, shifts, &mut violations);
        }
        violations
    }

    fn check_day(&self, grid: &ShiftGrid, d: usize, date: NaiveDate, out: &mut Vec<Violation>) {
        let mut on_day = Vec::new();
        let mut on_night = Vec::new();
        for (nurse, shifts) in grid {
            let Some(code) = shifts.get(d) else {
                out.push(Violation::new(
                    ViolationType::MissingDay,
                    nurse.as_str(),
                    format!("Schedule missing day {date} for nurse {nurse}"),
                ));
                continue;
            };
            let off = code.is_empty() || code == OFF;
            if !off
                && self
                    .off_requests
                    .get(nurse)
                    .is_some_and(|days| days.contains(&date))
            {
                out.push(Violation::new(
                    ViolationType::OffRequestIgnored,
                    nurse.as_str(),
                    format!("Nurse {nurse} assigned shift {code} on off day {date}"),
                ));
            }
            match self.rules.category_of(code) {
                Some(ShiftCategory::Day) => on_day.push(nurse.as_str()),
                Some(ShiftCategory::Night) => on_night.push(nurse.as_str()),
                Some(ShiftCategory::Off) => {}
                None => out.push(Violation::new(
                    ViolationType::UnknownShiftCode,
                    nurse.as_str(),
                    format!("Unknown shift code {code} for nurse {nurse} on {date}"),
                )),
            }
        }

        let entity = date.to_string();
        for (category, rule, staffed) in [
            (ShiftCategory::Day, &self.rules.day, &on_day),
            (ShiftCategory::Night, &self.rules.night, &on_night),
        ] {
            let label = category.label();
            if staffed.len() != rule.count {
                out.push(Violation::new(
                    ViolationType::Coverage,
                    entity.as_str(),
                    format!(
                        "{label} shift coverage on {date} is {} not {}",
                        staffed.len(),
                        rule.count
                    ),
                ));
            }
            let heads = staffed.iter().filter(|n| self.head_nurses.contains(**n)).count();
            let wanted = usize::from(category == ShiftCategory::Day);
            if heads != wanted {
                out.push(Violation::new(
                    ViolationType::HeadNurse,
                    entity.as_str(),
                    format!("{label} shift on {date} has {heads} head nurses, must be {wanted}"),
                ));
            }
            let certified = staffed.iter().filter(|n| self.certified.contains(**n)).count();
            if certified < rule.min_certified {
                out.push(Violation::new(
                    ViolationType::CertifiedCoverage,
                    entity.as_str(),
                    format!(
                        "{label} shift on {date} has {certified} chemo-certified nurses, \
                         minimum {} required",
                        rule.min_certified
                    ),
                ));
            }
        }
    }

    fn check_runs(&self, nurse: &str, shifts: &[String], out: &mut Vec<Violation>) {
        let mut run = 0;
        for (d, code) in shifts.iter().enumerate() {
            let working = !(code.is_empty() || code == OFF);
            if working {
                run += 1;
            }
            let run_ended = !working || d + 1 == shifts.len();
            if run_ended {
                if run > MAX_CONSECUTIVE_WORK_DAYS {
                    out.push(Violation::new(
                        ViolationType::ConsecutiveDays,
                        nurse,
                        format!(
                            "Nurse {nurse} works {run} consecutive days, more than {}",
                            MAX_CONSECUTIVE_WORK_DAYS
                        ),
                    ));
                }
                run = 0;
            }
        }
    }

    fn check_hours(&self, nurse: &str, shifts: &[String], out: &mut Vec<Violation>) {
        let Some(&contracted) = self.contracted_hours.get(nurse) else {
            return;
        };
        let total: f64 = shifts.iter().map(|code| self.rules.hours_of(code)).sum();
        if (total - contracted).abs() > self.rules.hours_tolerance {
            out.push(Violation::new(
                ViolationType::ContractedHours,
                nurse,
                format!("Nurse {nurse} assigned {total} hours vs contracted {contracted}"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ConstraintSpec, DateRange, Preferences, ShiftInfo, ShiftRequirement, ShiftRequirements,
    };

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn small_rules() -> CoverageRules {
        CoverageRules {
            day: CategoryRule::new(1, 1, &["07"]),
            night: CategoryRule::new(1, 0, &["Z23"]),
            ..CoverageRules::default()
        }
    }

    fn grid(rows: &[(&str, &[&str])]) -> ShiftGrid {
        rows.iter()
            .map(|(name, codes)| (name.to_string(), codes.iter().map(|c| c.to_string()).collect()))
            .collect()
    }

    fn count(violations: &[Violation], kind: ViolationType) -> usize {
        violations.iter().filter(|v| v.violation_type == kind).count()
    }

    #[test]
    fn test_clean_schedule() {
        let validator =
            ScheduleValidator::new(small_rules(), ShiftCalendar::starting(start(), 2).unwrap())
                .with_certified(["A", "B"])
                .with_head_nurses(["A", "B"]);
        let g = grid(&[("A", &["07", "OFF"]), ("B", &["OFF", "07"]), ("C", &["Z23", "Z23"])]);
        assert!(validator.validate(&g).is_empty());
    }

    #[test]
    fn test_default_rules_constants() {
        let rules = CoverageRules::default();
        assert_eq!(rules.day.count, 5);
        assert_eq!(rules.night.count, 4);
        assert_eq!(rules.day.min_certified, 2);
        assert_eq!(rules.hours_of("07"), 8.0);
        assert_eq!(rules.hours_of("Z23 B"), 12.0);
        assert_eq!(rules.category_of("19"), Some(ShiftCategory::Night));
        assert_eq!(rules.category_of(""), Some(ShiftCategory::Off));
        assert_eq!(rules.category_of("X"), None);
    }

    #[test]
    fn test_missing_day_and_unknown_code() {
        let validator =
            ScheduleValidator::new(small_rules(), ShiftCalendar::starting(start(), 2).unwrap())
                .with_certified(["A"]);
        let g = grid(&[("A", &["07"]), ("B", &["Z23", "Q9"])]);
        let v = validator.validate(&g);
        assert_eq!(count(&v, ViolationType::MissingDay), 1);
        assert_eq!(count(&v, ViolationType::UnknownShiftCode), 1);
        // day 2: nobody on day shift, nobody on nights
        assert_eq!(count(&v, ViolationType::Coverage), 2);
        assert_eq!(count(&v, ViolationType::CertifiedCoverage), 1);
        let missing = v
            .iter()
            .find(|v| v.violation_type == ViolationType::MissingDay)
            .unwrap();
        assert_eq!(missing.entity_id, "A");
        assert_eq!(missing.severity, 100);
    }

    #[test]
    fn test_head_nurse_rule() {
        let calendar = ShiftCalendar::starting(start(), 1).unwrap();
        let rules = small_rules();

        // no head nurse designated: the day shift still needs one
        let plain = ScheduleValidator::new(rules.clone(), calendar.clone()).with_certified(["A"]);
        let g = grid(&[("A", &["07"]), ("H", &["Z23"])]);
        let v = plain.validate(&g);
        assert_eq!(count(&v, ViolationType::HeadNurse), 1);
        let head = v
            .iter()
            .find(|v| v.violation_type == ViolationType::HeadNurse)
            .unwrap();
        assert_eq!(head.entity_id, "2024-01-01");
        assert!(head.message.contains("0 head nurses"));

        // head nurse on nights, none on days
        let with_head = plain.clone().with_head_nurses(["H"]);
        let v = with_head.validate(&g);
        assert_eq!(count(&v, ViolationType::HeadNurse), 2);

        // head nurse on days only
        let day_head = plain.with_head_nurses(["A"]);
        assert_eq!(count(&day_head.validate(&g), ViolationType::HeadNurse), 0);
    }

    #[test]
    fn test_off_request_ignored() {
        let mut requests = HashMap::new();
        requests.insert("A".to_string(), HashSet::from([start()]));
        let validator =
            ScheduleValidator::new(small_rules(), ShiftCalendar::starting(start(), 1).unwrap())
                .with_certified(["A"])
                .with_head_nurses(["A"])
                .with_off_requests(requests);
        let v = validator.validate(&grid(&[("A", &["07"]), ("B", &["Z23"])]));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::OffRequestIgnored);
    }

    #[test]
    fn test_consecutive_days_one_per_run() {
        let rules = CoverageRules {
            day: CategoryRule::new(1, 0, &["07"]),
            night: CategoryRule::new(0, 0, &["Z23"]),
            ..CoverageRules::default()
        };
        let validator = ScheduleValidator::new(rules, ShiftCalendar::starting(start(), 11).unwrap());
        let g = grid(&[(
            "A",
            &["07", "07", "07", "07", "07", "OFF", "07", "07", "07", "07", "07"],
        )]);
        let v = validator.validate(&g);
        assert_eq!(count(&v, ViolationType::ConsecutiveDays), 2);
        assert!(v.iter().all(|v| v.violation_type != ViolationType::Coverage || v.entity_id == "2024-01-06"));
    }

    #[test]
    fn test_contracted_hours() {
        let calendar = ShiftCalendar::starting(start(), 3).unwrap();
        let nurses = [
            Nurse::new("A").with_contracted_hours(36.0),
            Nurse::new("B").with_contracted_hours(8.0),
            Nurse::new("C"),
        ];
        let validator =
            ScheduleValidator::new(CoverageRules::default(), calendar).with_nurse_metadata(&nurses);
        let g = grid(&[
            ("A", &["Z07", "Z07", "07"]), // 32 h, within 8 of 36
            ("B", &["Z07", "Z07", "OFF"]), // 24 h, 16 over
            ("C", &["Z07", "Z07", "Z07"]), // no contract
        ]);
        let v = validator.validate(&g);
        assert_eq!(count(&v, ViolationType::ContractedHours), 1);
        let hours = v
            .iter()
            .find(|v| v.violation_type == ViolationType::ContractedHours)
            .unwrap();
        assert_eq!(hours.entity_id, "B");
    }

    #[test]
    fn test_idempotent() {
        let validator = ScheduleValidator::new(
            CoverageRules::default(),
            ShiftCalendar::starting(start(), 4).unwrap(),
        )
        .with_head_nurses(["A"])
        .with_certified(["A", "C"]);
        let g = grid(&[
            ("A", &["07", "07", "07", "07"]),
            ("B", &["Z23", "X", "OFF"]),
            ("C", &["Z19", "", "Z23", "19"]),
        ]);
        let first = validator.validate(&g);
        let second = validator.validate(&g);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_for_model() {
        let spec = ConstraintSpec::new(
            DateRange::new(start(), start()),
            ShiftRequirements::new(
                ShiftRequirement::new(1, vec!["D1".into()]).with_min_certified(1),
                ShiftRequirement::new(1, vec!["N1".into()]),
            ),
            vec![
                Nurse::certified("A").as_head_nurse().with_contracted_hours(10.0),
                Nurse::new("B"),
            ],
        )
        .with_shift_info("D1", ShiftInfo::new(10.0, "08:00", "18:00"))
        .with_shift_info("N1", ShiftInfo::new(10.0, "20:00", "06:00"));
        let model = ConstraintModel::new(spec, Preferences::new()).unwrap();
        let validator = ScheduleValidator::for_model(&model);
        assert_eq!(validator.rules().day.codes, BTreeSet::from(["D1".to_string()]));
        assert!(validator.validate(&grid(&[("A", &["D1"]), ("B", &["N1"])])).is_empty());

        let v = validator.validate(&grid(&[("A", &["N1"]), ("B", &["D1"])]));
        assert_eq!(count(&v, ViolationType::CertifiedCoverage), 1);
    }
}
