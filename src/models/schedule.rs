//! Schedule (solution) model.
//!
//! A schedule maps every nurse to exactly one shift record per calendar
//! day. It serializes as `{nurse: [record, ...]}` in roster order, the
//! shape consumed by the persistence and API layers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::shift::{ShiftCategory, ShiftType};

/// Plain shift codes per nurse, the input of the compliance checks.
pub type ShiftGrid = BTreeMap<String, Vec<String>>;

/// One nurse-day of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Calendar day.
    pub date: NaiveDate,
    /// Shift code (`"OFF"` for rest days).
    pub shift: String,
    /// Category derived from the code.
    pub shift_type: ShiftCategory,
    /// Paid hours.
    pub hours: f64,
    /// Start time of day, empty for rest days.
    pub start_time: String,
    /// End time of day, empty for rest days.
    pub end_time: String,
}

/// A complete rota.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    rows: Vec<(String, Vec<ShiftRecord>)>,
}

/// A rule broken by a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity: a nurse name or an ISO date.
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of schedule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    /// A nurse has fewer entries than there are days.
    MissingDay,
    /// Day or night headcount differs from the requirement.
    Coverage,
    /// Head nurse rule broken (one on day shift, none on night shift).
    HeadNurse,
    /// Fewer certified nurses than the category minimum.
    CertifiedCoverage,
    /// A working shift on a requested day off.
    OffRequestIgnored,
    /// A code outside the known taxonomy.
    UnknownShiftCode,
    /// More consecutive working days than allowed.
    ConsecutiveDays,
    /// Total hours too far from contracted hours.
    ContractedHours,
}

impl ShiftRecord {
    /// Creates a record for `date` from a resolved shift type.
    pub fn new(date: NaiveDate, shift: &ShiftType) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            shift: shift.code.clone(),
            shift_type: shift.category,
            hours: shift.info.hours,
            start_time: shift.info.start_time.clone(),
            end_time: shift.info.end_time.clone(),
        }
    }

    /// A rest-day record.
    pub fn off(date: NaiveDate) -> Self {
        Self::new(date, &ShiftType::off())
    }

    /// Whether the record is a worked shift.
    #[inline]
    pub fn is_working(&self) -> bool {
        self.shift_type.is_working()
    }
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
            severity: violation_type.default_severity(),
        }
    }
}

impl ViolationType {
    /// Default severity of the violation type.
    pub fn default_severity(self) -> i32 {
        match self {
            ViolationType::MissingDay => 100,
            ViolationType::Coverage | ViolationType::CertifiedCoverage => 90,
            ViolationType::HeadNurse => 80,
            ViolationType::ConsecutiveDays => 70,
            ViolationType::OffRequestIgnored => 60,
            ViolationType::ContractedHours => 40,
            ViolationType::UnknownShiftCode => 30,
        }
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a nurse's records. Replaces any earlier row for the same nurse.
    pub fn insert(&mut self, nurse: impl Into<String>, records: Vec<ShiftRecord>) {
        let nurse = nurse.into();
        match self.rows.iter_mut().find(|(name, _)| *name == nurse) {
            Some((_, existing)) => *existing = records,
            None => self.rows.push((nurse, records)),
        }
    }

    /// Records of a nurse.
    pub fn get(&self, nurse: &str) -> Option<&[ShiftRecord]> {
        self.rows
            .iter()
            .find(|(name, _)| name == nurse)
            .map(|(_, records)| records.as_slice())
    }

    /// Iterates `(nurse, records)` in roster order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ShiftRecord])> {
        self.rows
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    /// Number of nurses.
    pub fn nurse_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the schedule has no nurses.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of nurses on `category` on day `day`.
    pub fn count_on(&self, day: usize, category: ShiftCategory) -> usize {
        self.rows
            .iter()
            .filter(|(_, records)| records.get(day).is_some_and(|r| r.shift_type == category))
            .count()
    }

    /// Worked shifts of a nurse.
    pub fn working_shifts(&self, nurse: &str) -> usize {
        self.get(nurse)
            .map(|records| records.iter().filter(|r| r.is_working()).count())
            .unwrap_or(0)
    }

    /// Total worked shifts across all nurses.
    pub fn total_working_shifts(&self) -> usize {
        self.rows
            .iter()
            .map(|(_, records)| records.iter().filter(|r| r.is_working()).count())
            .sum()
    }

    /// Total paid hours of a nurse.
    pub fn total_hours(&self, nurse: &str) -> f64 {
        self.get(nurse)
            .map(|records| records.iter().map(|r| r.hours).sum())
            .unwrap_or(0.0)
    }

    /// Strips records down to their shift codes.
    pub fn to_grid(&self) -> ShiftGrid {
        self.rows
            .iter()
            .map(|(name, records)| {
                (
                    name.clone(),
                    records.iter().map(|r| r.shift.clone()).collect(),
                )
            })
            .collect()
    }
}

impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (name, records) in &self.rows {
            map.serialize_entry(name, records)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScheduleVisitor;

        impl<'de> Visitor<'de> for ScheduleVisitor {
            type Value = Schedule;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of nurse name to shift records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Schedule, A::Error> {
                let mut schedule = Schedule::new();
                while let Some((name, records)) = access.next_entry::<String, Vec<ShiftRecord>>()? {
                    schedule.insert(name, records);
                }
                Ok(schedule)
            }
        }

        deserializer.deserialize_map(ScheduleVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShiftInfo;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn early() -> ShiftType {
        ShiftType {
            code: "07".into(),
            category: ShiftCategory::Day,
            info: ShiftInfo::new(8.0, "07:00", "15:00"),
        }
    }

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.insert(
            "Kim",
            vec![ShiftRecord::new(day(1), &early()), ShiftRecord::off(day(2))],
        );
        s.insert(
            "Lee",
            vec![ShiftRecord::off(day(1)), ShiftRecord::new(day(2), &early())],
        );
        s
    }

    #[test]
    fn test_record_from_shift_type() {
        let r = ShiftRecord::new(day(1), &early());
        assert_eq!(r.shift, "07");
        assert_eq!(r.shift_type, ShiftCategory::Day);
        assert_eq!(r.hours, 8.0);
        assert!(r.is_working());

        let off = ShiftRecord::off(day(1));
        assert_eq!(off.shift, "OFF");
        assert_eq!(off.hours, 0.0);
        assert!(off.start_time.is_empty());
        assert_ne!(r.id, off.id);
    }

    #[test]
    fn test_counts() {
        let s = sample_schedule();
        assert_eq!(s.nurse_count(), 2);
        assert_eq!(s.count_on(0, ShiftCategory::Day), 1);
        assert_eq!(s.count_on(0, ShiftCategory::Off), 1);
        assert_eq!(s.count_on(5, ShiftCategory::Day), 0);
        assert_eq!(s.working_shifts("Kim"), 1);
        assert_eq!(s.total_working_shifts(), 2);
        assert_eq!(s.total_hours("Lee"), 8.0);
        assert_eq!(s.total_hours("nobody"), 0.0);
    }

    #[test]
    fn test_insert_replaces() {
        let mut s = sample_schedule();
        s.insert("Kim", vec![ShiftRecord::off(day(1)), ShiftRecord::off(day(2))]);
        assert_eq!(s.nurse_count(), 2);
        assert_eq!(s.working_shifts("Kim"), 0);
    }

    #[test]
    fn test_to_grid() {
        let grid = sample_schedule().to_grid();
        assert_eq!(grid["Kim"], vec!["07", "OFF"]);
        assert_eq!(grid["Lee"], vec!["OFF", "07"]);
    }

    #[test]
    fn test_json_shape_and_order() {
        let s = sample_schedule();
        let json = serde_json::to_value(&s).unwrap();
        let kim = &json["Kim"][0];
        assert_eq!(kim["shift"], "07");
        assert_eq!(kim["shiftType"], "day");
        assert_eq!(kim["date"], "2024-01-01");
        assert_eq!(kim["startTime"], "07:00");
        assert_eq!(json["Lee"][0]["shiftType"], "off");

        let text = serde_json::to_string(&s).unwrap();
        assert!(text.find("Kim").unwrap() < text.find("Lee").unwrap());

        let back: Schedule = serde_json::from_str(&text).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_violation_severity() {
        let v = Violation::new(ViolationType::Coverage, "2024-01-01", "short");
        assert_eq!(v.severity, 90);
        assert_eq!(v.entity_id, "2024-01-01");
    }
}
