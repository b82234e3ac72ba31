//! Input validation for rota requests.
//!
//! Checks structural integrity of a constraint document and its
//! preferences before any model is built. Detects:
//! - Empty date range or roster
//! - Duplicate nurse names
//! - Day/night code sets that overlap or reuse the `OFF` sentinel
//! - A staffed category without eligible codes
//! - Preference lists whose length differs from the number of days
//!
//! Feasibility (enough nurses, enough certified nurses) is not checked
//! here; the solver does that before searching.

use std::collections::HashSet;

use crate::models::{ConstraintSpec, Preferences, ShiftCategory, OFF};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The date range contains no days.
    EmptyDateRange,
    /// The roster has no nurses.
    EmptyRoster,
    /// Two nurses share the same name.
    DuplicateNurse,
    /// A code is listed for both day and night.
    OverlappingShiftCode,
    /// `OFF` is listed as a working code.
    ReservedShiftCode,
    /// A category requires nurses but lists no codes.
    MissingShiftCodes,
    /// A preference list does not cover every day exactly.
    PreferenceLength,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a constraint document and its preferences.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(spec: &ConstraintSpec, preferences: &Preferences) -> ValidationResult {
    let mut errors = Vec::new();

    let range = spec.date_range;
    let num_days = if range.end < range.start {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyDateRange,
            format!("Dates list cannot be empty: {} is after {}", range.start, range.end),
        ));
        None
    } else {
        Some((range.end - range.start).num_days() as usize + 1)
    };

    if spec.nurses.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyRoster,
            "Nurses list cannot be empty",
        ));
    }

    let mut names = HashSet::new();
    for nurse in &spec.nurses {
        if !names.insert(nurse.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateNurse,
                format!("Duplicate nurse name: {}", nurse.name),
            ));
        }
    }

    check_shift_codes(spec, &mut errors);

    if let Some(num_days) = num_days {
        for (nurse, codes) in preferences.iter() {
            if codes.len() != num_days {
                errors.push(ValidationError::new(
                    ValidationErrorKind::PreferenceLength,
                    format!(
                        "Assignment length for nurse {nurse} is {} but the range has {num_days} days",
                        codes.len()
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_shift_codes(spec: &ConstraintSpec, errors: &mut Vec<ValidationError>) {
    let reqs = &spec.shift_requirements;
    let mut seen: HashSet<&str> = HashSet::new();

    for category in ShiftCategory::WORKING {
        let Some(req) = reqs.get(category) else {
            continue;
        };
        if req.count > 0 && req.shift_codes.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingShiftCodes,
                format!(
                    "{} shift requires {} nurses but lists no shift codes",
                    category.label(),
                    req.count
                ),
            ));
        }
        let mut own: HashSet<&str> = HashSet::new();
        for code in &req.shift_codes {
            if code == OFF || code.is_empty() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ReservedShiftCode,
                    format!("{} shift lists reserved code '{code}'", category.label()),
                ));
                continue;
            }
            // Repeats inside one category are harmless; across categories they are not.
            if own.insert(code.as_str()) && !seen.insert(code.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::OverlappingShiftCode,
                    format!("Shift code '{code}' is listed for both day and night"),
                ));
            }
        }
    }
}
