//! Error types for rota construction and solving.
//!
//! Three families of failure reach the caller:
//! - configuration errors (bad input shape, empty roster, preference length),
//! - resource shortfalls detected before the search starts,
//! - I/O-free JSON decoding errors, folded into configuration errors.
//!
//! A search that finds no solution is *not* an error: the solver degrades
//! to the greedy fallback and reports it in the solve report.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result alias used throughout the crate.
pub type RotaResult<T> = Result<T, RotaError>;

/// Errors raised by the rota engine.
#[derive(Error, Debug)]
pub enum RotaError {
    /// Input could not be interpreted (missing keys, wrong types).
    #[error("configuration error: {0}")]
    Config(String),

    /// Structural input checks failed; all findings are listed.
    #[error("invalid input: {}", join_messages(.0))]
    InvalidInput(Vec<ValidationError>),

    /// A preference entry is neither a string nor null.
    #[error("invalid shift code {value} for nurse {nurse} on day {day}")]
    PreferenceCode {
        nurse: String,
        day: usize,
        value: String,
    },

    /// Not enough certified nurses to cover the certified minimums.
    #[error(
        "insufficient chemo-certified nurses: required {required} total across {days} days, \
         but only {available} available"
    )]
    InsufficientCertified {
        required: u64,
        available: u64,
        days: usize,
    },

    /// Not enough nurse-days to cover the headcount requirements.
    #[error(
        "not enough nurse capacity to meet shift requirements: need {required}, \
         but have {possible} possible assignments"
    )]
    InsufficientCapacity { required: u64, possible: u64 },
}

impl RotaError {
    /// Whether this error comes from the pre-solve resource checks.
    pub fn is_resource_shortfall(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCertified { .. } | Self::InsufficientCapacity { .. }
        )
    }
}

impl From<serde_json::Error> for RotaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
