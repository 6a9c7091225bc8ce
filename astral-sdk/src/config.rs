//! Evaluator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use astral_core::{AstralError, AstralResult, CorrelationConfig};

/// What to do when a plugin fails during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort on the first failure and drop outstanding verifications.
    #[default]
    FailFast,
    /// Let every verification finish, log every failure, then report the
    /// lowest-index one.
    CollectAll,
}

/// Evaluator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Deadline for the verification fan-in. `None` waits indefinitely.
    #[serde(with = "duration_ms")]
    pub timeout: Option<Duration>,
    pub failure_policy: FailurePolicy,
    /// Largest stamp batch accepted by one evaluation call.
    pub max_stamps: usize,
    pub correlation: CorrelationConfig,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            failure_policy: FailurePolicy::FailFast,
            max_stamps: 64,
            correlation: CorrelationConfig::default(),
        }
    }
}

impl EvaluatorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_max_stamps(mut self, max_stamps: usize) -> Self {
        self.max_stamps = max_stamps;
        self
    }

    pub fn with_correlation(mut self, correlation: CorrelationConfig) -> Self {
        self.correlation = correlation;
        self
    }

    /// Reject parameters the scoring functions cannot use.
    pub fn validate(&self) -> AstralResult<()> {
        if self.max_stamps == 0 {
            return Err(AstralError::Validation("max_stamps must be at least 1".to_string()));
        }
        if let Some(timeout) = self.timeout {
            if timeout < Duration::from_millis(1) {
                return Err(AstralError::Validation("timeout must be at least 1 ms".to_string()));
            }
            if u64::try_from(timeout.as_millis()).is_err() {
                return Err(AstralError::Validation(format!(
                    "timeout of {} ms does not fit in 64 bits",
                    timeout.as_millis()
                )));
            }
        }
        let factor = self.correlation.agreement_radius_factor;
        if !factor.is_finite() || factor <= 0.0 {
            return Err(AstralError::Validation(format!(
                "agreement_radius_factor must be positive, got {}",
                factor
            )));
        }
        let weight = self.correlation.independence_weight;
        if !(0.0..=1.0).contains(&weight) {
            return Err(AstralError::Validation(format!(
                "independence_weight must be within [0, 1], got {}",
                weight
            )));
        }
        Ok(())
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Optional durations as integer milliseconds in JSON.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&super::saturating_millis(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = EvaluatorConfig::default();
        assert!(config.timeout.is_none());
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.max_stamps, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_config() {
        let config = EvaluatorConfig::default()
            .with_timeout(Duration::from_millis(1500))
            .with_failure_policy(FailurePolicy::CollectAll)
            .with_max_stamps(4);

        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.failure_policy, FailurePolicy::CollectAll);
        assert_eq!(config.max_stamps, 4);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EvaluatorConfig =
            serde_json::from_str(r#"{"timeout": 250, "failure_policy": "collect_all"}"#).unwrap();
        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.failure_policy, FailurePolicy::CollectAll);
        assert_eq!(config.max_stamps, 64);
        assert_eq!(config.correlation, CorrelationConfig::default());

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"timeout\":250"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(EvaluatorConfig::default().with_max_stamps(0).validate().is_err());
        assert!(EvaluatorConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(EvaluatorConfig::default()
            .with_correlation(CorrelationConfig {
                agreement_radius_factor: 1.0,
                independence_weight: 1.5,
            })
            .validate()
            .is_err());
        assert!(EvaluatorConfig::default()
            .with_correlation(CorrelationConfig {
                agreement_radius_factor: -2.0,
                independence_weight: 0.25,
            })
            .validate()
            .is_err());
    }

    #[test]
    fn oversized_timeouts_are_rejected_not_truncated() {
        let huge = Duration::from_secs(u64::MAX);
        assert_eq!(saturating_millis(huge), u64::MAX);
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);

        let err = EvaluatorConfig::default().with_timeout(huge).validate().unwrap_err();
        assert!(err.to_string().contains("64 bits"));
        assert!(EvaluatorConfig::default()
            .with_timeout(Duration::from_micros(500))
            .validate()
            .is_err());
        assert!(EvaluatorConfig::default()
            .with_timeout(Duration::from_millis(u64::MAX))
            .validate()
            .is_ok());
    }
}
