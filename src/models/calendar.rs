//! Shift calendar.
//!
//! Derives the ordered scheduling days from an inclusive date range.
//!
//! # Weekend Alignment
//! Weeks are aligned to the roster start: window `w` covers days
//! `[7w, 7w + 7)`. Offsets 5 and 6 of a window are its weekend pair
//! (Saturday/Sunday when the roster starts on a Monday). Only windows
//! that lie completely inside the range have a weekend pair.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{RotaError, RotaResult};

/// Number of days in an aligned roster week.
pub const WEEK_LEN: usize = 7;

/// An inclusive date range, as supplied in the constraint model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First scheduling day.
    pub start: NaiveDate,
    /// Last scheduling day (inclusive).
    pub end: NaiveDate,
}

/// Ordered, contiguous list of scheduling days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftCalendar {
    dates: Vec<NaiveDate>,
}

impl DateRange {
    /// Creates a date range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

impl ShiftCalendar {
    /// Builds the calendar for an inclusive range.
    ///
    /// Fails when `end` precedes `start`, which would leave no days.
    pub fn from_range(range: DateRange) -> RotaResult<Self> {
        if range.end < range.start {
            return Err(RotaError::Config(format!(
                "date range is empty: end {} precedes start {}",
                range.end, range.start
            )));
        }
        let span = (range.end - range.start).num_days() as u64;
        let dates = (0..=span)
            .filter_map(|offset| range.start.checked_add_days(Days::new(offset)))
            .collect();
        Ok(Self { dates })
    }

    /// Builds a calendar of `num_days` days starting at `start`.
    pub fn starting(start: NaiveDate, num_days: usize) -> RotaResult<Self> {
        if num_days == 0 {
            return Err(RotaError::Config("date range is empty".into()));
        }
        let end = start
            .checked_add_days(Days::new(num_days as u64 - 1))
            .ok_or_else(|| RotaError::Config("date range overflows the calendar".into()))?;
        Self::from_range(DateRange::new(start, end))
    }

    /// Number of scheduling days.
    #[inline]
    pub fn num_days(&self) -> usize {
        self.dates.len()
    }

    /// All days in order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// The date of day `index`.
    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.dates.get(index).copied()
    }

    /// Weekend day pairs `(saturday, sunday)` of every complete aligned week.
    pub fn weekend_pairs(&self) -> Vec<(usize, usize)> {
        let n = self.num_days();
        (0..n.saturating_sub(WEEK_LEN - 1))
            .step_by(WEEK_LEN)
            .map(|week_start| (week_start + 5, week_start + 6))
            .collect()
    }

    /// Start indices of every `len`-day sliding window.
    pub fn sliding_windows(&self, len: usize) -> std::ops::Range<usize> {
        0..(self.num_days() + 1).saturating_sub(len)
    }
}
