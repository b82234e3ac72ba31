//! Per-nurse, per-day shift requests ("assignments").
//!
//! A request is soft: the solver tries to honor it but may override it at
//! a penalty. `null`, `""` and `"OFF"` all mean "no preference" and are
//! never enforced.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::shift::OFF;
use crate::error::{RotaError, RotaResult};

/// Shift requests keyed by nurse name.
///
/// Names that are not on the roster are kept here but ignored by the
/// solver and the fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Preferences {
    entries: BTreeMap<String, Vec<Option<String>>>,
}

impl Preferences {
    /// Creates an empty preference map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a nurse's per-day codes; empty strings mean no preference.
    pub fn with_nurse<S: AsRef<str>>(mut self, nurse: impl Into<String>, codes: &[S]) -> Self {
        let days = codes
            .iter()
            .map(|c| {
                let c = c.as_ref();
                (!c.is_empty()).then(|| c.to_string())
            })
            .collect();
        self.entries.insert(nurse.into(), days);
        self
    }

    /// Parses `{nurse: [code | null, ...]}`.
    ///
    /// Entries other than strings and `null` are rejected with the nurse
    /// name and day index.
    pub fn from_json_value(value: &Value) -> RotaResult<Self> {
        let Value::Object(map) = value else {
            return Err(RotaError::Config(
                "assignments must be an object of nurse name to shift codes".into(),
            ));
        };
        let mut entries = BTreeMap::new();
        for (nurse, days) in map {
            let Value::Array(days) = days else {
                return Err(RotaError::Config(format!(
                    "assignments for nurse {nurse} must be a list"
                )));
            };
            let mut codes = Vec::with_capacity(days.len());
            for (day, entry) in days.iter().enumerate() {
                match entry {
                    Value::Null => codes.push(None),
                    Value::String(s) if s.is_empty() => codes.push(None),
                    Value::String(s) => codes.push(Some(s.clone())),
                    other => {
                        return Err(RotaError::PreferenceCode {
                            nurse: nurse.clone(),
                            day,
                            value: other.to_string(),
                        })
                    }
                }
            }
            entries.insert(nurse.clone(), codes);
        }
        Ok(Self { entries })
    }

    /// Parses preferences from a JSON string.
    pub fn from_json(json: &str) -> RotaResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    /// Raw per-day codes for a nurse.
    pub fn get(&self, nurse: &str) -> Option<&[Option<String>]> {
        self.entries.get(nurse).map(Vec::as_slice)
    }

    /// The enforceable request of `nurse` on `day`, if any.
    ///
    /// Returns `None` for missing entries and for the `"OFF"` sentinel.
    pub fn request(&self, nurse: &str, day: usize) -> Option<&str> {
        self.entries
            .get(nurse)?
            .get(day)?
            .as_deref()
            .filter(|code| !code.is_empty() && *code != OFF)
    }

    /// Iterates `(nurse, codes)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<String>])> {
        self.entries
            .iter()
            .map(|(name, codes)| (name.as_str(), codes.as_slice()))
    }

    /// Number of nurses with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no nurse has an entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
