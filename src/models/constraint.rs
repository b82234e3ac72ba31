//! Constraint model: the fully resolved input of one rota request.
//!
//! Built from the JSON shape produced upstream:
//!
//! ```json
//! {
//!   "dateRange": {"start": "2024-01-01", "end": "2024-01-14"},
//!   "shiftRequirements": {
//!     "dayShift":   {"count": 5, "minChemoCertified": 2, "shiftCodes": ["07", "Z07"]},
//!     "nightShift": {"count": 4, "minChemoCertified": 2, "shiftCodes": ["Z23"]}
//!   },
//!   "shiftsInfo": {"07": {"hours": 8, "startTime": "07:00", "endTime": "15:00"}},
//!   "nurses": [{"name": "Kim", "isChemoCertified": true}]
//! }
//! ```
//!
//! Construction validates shape only. Whether the roster can actually
//! cover the requirements is decided at solve time.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::calendar::{DateRange, ShiftCalendar};
use super::nurse::Nurse;
use super::preference::Preferences;
use super::shift::{ShiftCategory, ShiftInfo, ShiftRequirements, ShiftType, OFF};
use crate::error::{RotaError, RotaResult};
use crate::validation::validate_input;

/// Raw constraint document, as deserialized from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSpec {
    /// Inclusive scheduling range.
    pub date_range: DateRange,
    /// Day and night staffing rules.
    pub shift_requirements: ShiftRequirements,
    /// Timing metadata per code.
    #[serde(default)]
    pub shifts_info: BTreeMap<String, ShiftInfo>,
    /// Ordered roster.
    pub nurses: Vec<Nurse>,
}

/// Validated scheduling parameters consumed by the solver, the fallback
/// and the compliance checks.
#[derive(Debug, Clone)]
pub struct ConstraintModel {
    calendar: ShiftCalendar,
    requirements: ShiftRequirements,
    nurses: Vec<Nurse>,
    /// Day codes, then night codes, then `OFF`.
    shift_types: Vec<ShiftType>,
    code_index: HashMap<String, usize>,
    preferences: Preferences,
}

impl ConstraintSpec {
    /// Creates a constraint document.
    pub fn new(date_range: DateRange, shift_requirements: ShiftRequirements, nurses: Vec<Nurse>) -> Self {
        Self {
            date_range,
            shift_requirements,
            shifts_info: BTreeMap::new(),
            nurses,
        }
    }

    /// Adds timing metadata for a code.
    pub fn with_shift_info(mut self, code: impl Into<String>, info: ShiftInfo) -> Self {
        self.shifts_info.insert(code.into(), info);
        self
    }
}

impl ConstraintModel {
    /// Validates `spec` and `preferences` and resolves the shift taxonomy.
    ///
    /// # Errors
    /// [`RotaError::InvalidInput`] listing every structural problem found
    /// (empty range or roster, duplicate names, overlapping code sets,
    /// preference lists of the wrong length).
    pub fn new(spec: ConstraintSpec, preferences: Preferences) -> RotaResult<Self> {
        validate_input(&spec, &preferences).map_err(RotaError::InvalidInput)?;
        let calendar = ShiftCalendar::from_range(spec.date_range)?;

        let mut shift_types = Vec::new();
        for category in ShiftCategory::WORKING {
            let Some(req) = spec.shift_requirements.get(category) else {
                continue;
            };
            for code in &req.shift_codes {
                shift_types.push(ShiftType {
                    code: code.clone(),
                    category,
                    info: spec.shifts_info.get(code).cloned().unwrap_or_default(),
                });
            }
        }
        shift_types.push(ShiftType::off());

        let code_index = shift_types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.code.clone(), i))
            .collect();

        Ok(Self {
            calendar,
            requirements: spec.shift_requirements,
            nurses: spec.nurses,
            shift_types,
            code_index,
            preferences,
        })
    }

    /// Parses a constraint document and builds the model.
    ///
    /// Missing keys and wrong value types become [`RotaError::Config`].
    pub fn from_json(constraints: &str, preferences: Preferences) -> RotaResult<Self> {
        let spec: ConstraintSpec = serde_json::from_str(constraints)?;
        Self::new(spec, preferences)
    }

    /// Builds the model from already-parsed JSON values.
    pub fn from_values(constraints: Value, preferences: Option<&Value>) -> RotaResult<Self> {
        let spec: ConstraintSpec = serde_json::from_value(constraints)?;
        let preferences = match preferences {
            Some(value) if !value.is_null() => Preferences::from_json_value(value)?,
            _ => Preferences::new(),
        };
        Self::new(spec, preferences)
    }

    /// Scheduling days.
    pub fn calendar(&self) -> &ShiftCalendar {
        &self.calendar
    }

    /// Number of scheduling days.
    #[inline]
    pub fn num_days(&self) -> usize {
        self.calendar.num_days()
    }

    /// Ordered roster.
    pub fn nurses(&self) -> &[Nurse] {
        &self.nurses
    }

    /// Staffing requirements.
    pub fn requirements(&self) -> &ShiftRequirements {
        &self.requirements
    }

    /// Shift requests.
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// All shift types: day codes, night codes, then `OFF`.
    pub fn shift_types(&self) -> &[ShiftType] {
        &self.shift_types
    }

    /// Index of a code within [`Self::shift_types`].
    pub fn code_index(&self, code: &str) -> Option<usize> {
        self.code_index.get(code).copied()
    }

    /// Index of the `OFF` shift type.
    pub fn off_index(&self) -> usize {
        self.shift_types.len() - 1
    }

    /// Resolved shift type for a code.
    pub fn shift_type(&self, code: &str) -> Option<&ShiftType> {
        self.code_index(code).map(|i| &self.shift_types[i])
    }

    /// Category of a code; unknown codes yield `None`.
    pub fn category_of(&self, code: &str) -> Option<ShiftCategory> {
        self.shift_type(code).map(|t| t.category)
    }

    /// Indices of the shift types in a category.
    pub fn codes_in(&self, category: ShiftCategory) -> impl Iterator<Item = usize> + '_ {
        self.shift_types
            .iter()
            .enumerate()
            .filter(move |(_, t)| t.category == category)
            .map(|(i, _)| i)
    }

    /// Number of certified nurses on the roster.
    pub fn certified_count(&self) -> usize {
        self.nurses.iter().filter(|n| n.is_chemo_certified).count()
    }

    /// The eligible working code requested by nurse `nurse` on `day`.
    ///
    /// Requests for codes outside the day/night sets are ignored.
    pub fn requested_code(&self, nurse: usize, day: usize) -> Option<usize> {
        let name = &self.nurses.get(nurse)?.name;
        let code = self.preferences.request(name, day)?;
        self.code_index(code).filter(|&i| i != self.off_index())
    }
}
