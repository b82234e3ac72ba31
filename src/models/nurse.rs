//! Nurse (roster member) model.

use serde::{Deserialize, Serialize};

/// A nurse on the roster.
///
/// Only `name` and `is_chemo_certified` drive the solver. The remaining
/// attributes feed the compliance checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nurse {
    /// Unique roster name.
    pub name: String,
    /// Holds chemotherapy certification.
    #[serde(default)]
    pub is_chemo_certified: bool,
    /// Head nurse (must lead exactly one day shift, never nights).
    #[serde(default)]
    pub is_head_nurse: bool,
    /// Contracted hours over the scheduling period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contracted_hours: Option<f64>,
    /// Full-time or part-time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<EmploymentType>,
}

/// Employment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmploymentType {
    FullTime,
    PartTime,
}

impl Nurse {
    /// Creates an uncertified nurse.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_chemo_certified: false,
            is_head_nurse: false,
            contracted_hours: None,
            employment_type: None,
        }
    }

    /// Creates a chemo-certified nurse.
    pub fn certified(name: impl Into<String>) -> Self {
        Self::new(name).with_certification(true)
    }

    /// Sets the certification flag.
    pub fn with_certification(mut self, certified: bool) -> Self {
        self.is_chemo_certified = certified;
        self
    }

    /// Marks the nurse as head nurse.
    pub fn as_head_nurse(mut self) -> Self {
        self.is_head_nurse = true;
        self
    }

    /// Sets contracted hours.
    pub fn with_contracted_hours(mut self, hours: f64) -> Self {
        self.contracted_hours = Some(hours);
        self
    }

    /// Sets the employment type.
    pub fn with_employment(mut self, employment: EmploymentType) -> Self {
        self.employment_type = Some(employment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let n = Nurse::certified("Kim")
            .as_head_nurse()
            .with_contracted_hours(80.0)
            .with_employment(EmploymentType::FullTime);
        assert!(n.is_chemo_certified);
        assert!(n.is_head_nurse);
        assert_eq!(n.contracted_hours, Some(80.0));
        assert_eq!(n.employment_type, Some(EmploymentType::FullTime));
    }

    #[test]
    fn test_deserialize_minimal() {
        let n: Nurse = serde_json::from_str(r#"{"name":"Lee","isChemoCertified":true}"#).unwrap();
        assert_eq!(n.name, "Lee");
        assert!(n.is_chemo_certified);
        assert!(!n.is_head_nurse);
        assert!(n.contracted_hours.is_none());
    }

    #[test]
    fn test_deserialize_full() {
        let n: Nurse = serde_json::from_str(
            r#"{"name":"Park","isHeadNurse":true,"contractedHours":72.5,"employmentType":"partTime"}"#,
        )
        .unwrap();
        assert!(!n.is_chemo_certified);
        assert!(n.is_head_nurse);
        assert_eq!(n.employment_type, Some(EmploymentType::PartTime));
    }
}
