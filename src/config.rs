//! Solver configuration.
//!
//! Every field has a default, so `{}` is a valid configuration document.
//!
//! ```json
//! {"timeLimitSecs": 30, "workers": 4, "fallback": {"seed": 7}}
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cp::{SearchParams, DEFAULT_FAIRNESS_WEIGHT, DEFAULT_PREFERENCE_PENALTY};
use crate::error::{RotaError, RotaResult};

/// Longest accepted time limit: one day.
pub const MAX_TIME_LIMIT_SECS: f64 = 86_400.0;

/// Assignment solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    /// Wall-clock cap for the search, in seconds.
    pub time_limit_secs: f64,
    /// Parallel search workers.
    pub workers: usize,
    /// Penalty per violated shift request.
    pub preference_penalty: i64,
    /// Weight of `max_shifts - min_shifts`.
    pub fairness_weight: i64,
    /// Base seed of the search workers.
    pub seed: u64,
    /// Greedy fallback settings.
    pub fallback: FallbackConfig,
}

/// Greedy fallback settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackConfig {
    /// Shuffle repair candidates with this seed; roster order when `None`.
    pub seed: Option<u64>,
    /// Skip repair candidates that would break the rest rules.
    pub respect_rest_rules: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 120.0,
            workers: 8,
            preference_penalty: DEFAULT_PREFERENCE_PENALTY,
            fairness_weight: DEFAULT_FAIRNESS_WEIGHT,
            seed: 0,
            fallback: FallbackConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> RotaResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the time limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_secs = limit.as_secs_f64();
        self
    }

    /// Sets the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets objective weights.
    pub fn with_weights(mut self, preference_penalty: i64, fairness_weight: i64) -> Self {
        self.preference_penalty = preference_penalty;
        self.fairness_weight = fairness_weight;
        self
    }

    /// Sets the search seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets fallback settings.
    pub fn with_fallback(mut self, fallback: FallbackConfig) -> Self {
        self.fallback = fallback;
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// [`RotaError::Config`] for a time limit outside
    /// `(0, MAX_TIME_LIMIT_SECS]`, zero workers, negative weights, or a
    /// preference penalty that does not exceed the fairness weight.
    pub fn validate(&self) -> RotaResult<()> {
        if !(self.time_limit_secs > 0.0 && self.time_limit_secs <= MAX_TIME_LIMIT_SECS) {
            return Err(RotaError::Config(format!(
                "timeLimitSecs must be in (0, {MAX_TIME_LIMIT_SECS}], got {}",
                self.time_limit_secs
            )));
        }
        if self.workers == 0 {
            return Err(RotaError::Config("workers must be at least 1".into()));
        }
        if self.fairness_weight < 0 {
            return Err(RotaError::Config(format!(
                "fairnessWeight must not be negative, got {}",
                self.fairness_weight
            )));
        }
        if self.preference_penalty <= self.fairness_weight {
            return Err(RotaError::Config(format!(
                "preferencePenalty ({}) must exceed fairnessWeight ({})",
                self.preference_penalty, self.fairness_weight
            )));
        }
        Ok(())
    }

    /// Time limit as a [`Duration`], clamped to `[0, MAX_TIME_LIMIT_SECS]`.
    pub fn time_limit(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_limit_secs.clamp(0.0, MAX_TIME_LIMIT_SECS))
            .unwrap_or(Duration::ZERO)
    }

    /// Search limits for the CP solver.
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            time_limit: self.time_limit(),
            workers: self.workers,
            seed: self.seed,
        }
    }
}

impl FallbackConfig {
    /// Shuffles repair candidates with `seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enforces the consecutive-day and night-to-day rules during repair.
    pub fn respecting_rest_rules(mut self) -> Self {
        self.respect_rest_rules = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.time_limit(), Duration::from_secs(120));
        assert_eq!(config.workers, 8);
        assert_eq!(config.preference_penalty, 100);
        assert_eq!(config.fairness_weight, 10);
        assert!(config.fallback.seed.is_none());
        assert!(!config.fallback.respect_rest_rules);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config =
            SolverConfig::from_json_str(r#"{"timeLimitSecs": 2.5, "fallback": {"seed": 9}}"#)
                .unwrap();
        assert_eq!(config.time_limit(), Duration::from_millis(2500));
        assert_eq!(config.workers, 8);
        assert_eq!(config.fallback.seed, Some(9));
        assert_eq!(config.search_params().time_limit, Duration::from_millis(2500));
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(SolverConfig::from_json_str("{}").unwrap(), SolverConfig::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(SolverConfig::default().with_workers(0).validate().is_err());
        assert!(SolverConfig::default()
            .with_time_limit(Duration::ZERO)
            .validate()
            .is_err());
        let err = SolverConfig::default().with_weights(10, 10).validate().unwrap_err();
        assert!(err.to_string().contains("preferencePenalty"));
        assert!(SolverConfig::default().with_weights(100, -1).validate().is_err());
    }

    #[test]
    fn test_huge_time_limit_rejected_without_panic() {
        let err = SolverConfig::from_json_str(r#"{"timeLimitSecs": 1e30}"#).unwrap_err();
        assert!(matches!(err, RotaError::Config(_)));

        let config = SolverConfig {
            time_limit_secs: 1e30,
            ..SolverConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.time_limit(), Duration::from_secs(86_400));

        let config = SolverConfig {
            time_limit_secs: f64::NAN,
            ..SolverConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.search_params().time_limit, Duration::ZERO);
        assert!(SolverConfig {
            time_limit_secs: f64::INFINITY,
            ..SolverConfig::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_wrong_type_is_config_error() {
        let err = SolverConfig::from_json_str(r#"{"workers": "many"}"#).unwrap_err();
        assert!(matches!(err, RotaError::Config(_)));
    }
}
