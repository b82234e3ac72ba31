//! Shift taxonomy: categories, shift types, and per-category requirements.

use serde::{Deserialize, Serialize};

/// Reserved code for an unassigned (rest) day.
pub const OFF: &str = "OFF";

/// Longest allowed run of consecutive working days.
pub const MAX_CONSECUTIVE_WORK_DAYS: usize = 3;

/// Shift category, derived from the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftCategory {
    Day,
    Night,
    Off,
}

impl ShiftCategory {
    /// Working categories, in model order.
    pub const WORKING: [ShiftCategory; 2] = [ShiftCategory::Day, ShiftCategory::Night];

    /// Whether this category counts as a worked shift.
    #[inline]
    pub fn is_working(self) -> bool {
        self != ShiftCategory::Off
    }

    /// Lowercase label used in records and messages.
    pub fn label(self) -> &'static str {
        match self {
            ShiftCategory::Day => "day",
            ShiftCategory::Night => "night",
            ShiftCategory::Off => "off",
        }
    }
}

/// Timing metadata of a shift code (`shiftsInfo` entry).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftInfo {
    /// Paid duration in hours.
    #[serde(default)]
    pub hours: f64,
    /// Start time of day, e.g. `"07:00"`.
    #[serde(default)]
    pub start_time: String,
    /// End time of day, e.g. `"19:00"`.
    #[serde(default)]
    pub end_time: String,
}

/// A fully resolved shift type.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftType {
    /// Shift code.
    pub code: String,
    /// Category of the code.
    pub category: ShiftCategory,
    /// Timing metadata.
    pub info: ShiftInfo,
}

/// Staffing requirement for one category (`dayShift` / `nightShift`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRequirement {
    /// Exact number of nurses required each day.
    pub count: u32,
    /// Minimum number of certified nurses each day.
    #[serde(default)]
    pub min_chemo_certified: u32,
    /// Codes eligible for this category.
    pub shift_codes: Vec<String>,
}

/// Day and night requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRequirements {
    pub day_shift: ShiftRequirement,
    pub night_shift: ShiftRequirement,
}

impl ShiftInfo {
    /// Creates timing metadata.
    pub fn new(hours: f64, start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            hours,
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }
}

impl ShiftType {
    /// The rest-day shift type: zero hours, no times.
    pub fn off() -> Self {
        Self {
            code: OFF.to_string(),
            category: ShiftCategory::Off,
            info: ShiftInfo::default(),
        }
    }
}

impl ShiftRequirement {
    /// Creates a requirement with no certification minimum.
    pub fn new(count: u32, shift_codes: Vec<String>) -> Self {
        Self {
            count,
            min_chemo_certified: 0,
            shift_codes,
        }
    }

    /// Sets the certified minimum.
    pub fn with_min_certified(mut self, min: u32) -> Self {
        self.min_chemo_certified = min;
        self
    }

    /// First eligible code, used when a slot must be filled without a request.
    pub fn primary_code(&self) -> Option<&str> {
        self.shift_codes.first().map(String::as_str)
    }
}

impl ShiftRequirements {
    /// Creates day/night requirements.
    pub fn new(day_shift: ShiftRequirement, night_shift: ShiftRequirement) -> Self {
        Self {
            day_shift,
            night_shift,
        }
    }

    /// Requirement of a working category.
    ///
    /// `Off` has no requirement and yields `None`.
    pub fn get(&self, category: ShiftCategory) -> Option<&ShiftRequirement> {
        match category {
            ShiftCategory::Day => Some(&self.day_shift),
            ShiftCategory::Night => Some(&self.night_shift),
            ShiftCategory::Off => None,
        }
    }

    /// Nurses required per day across both categories.
    pub fn daily_headcount(&self) -> u64 {
        u64::from(self.day_shift.count) + u64::from(self.night_shift.count)
    }

    /// Certified nurses required per day across both categories.
    pub fn daily_certified(&self) -> u64 {
        u64::from(self.day_shift.min_chemo_certified)
            + u64::from(self.night_shift.min_chemo_certified)
    }
}
