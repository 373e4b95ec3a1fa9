//! Strategy configuration.

use serde::{Deserialize, Serialize};
use vigil_types::Cost;

/// Tunables shared by the built-in strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisproofConfig {
    /// Lookback and lookahead around the suspected time (or incident start).
    pub window_mins: i64,

    /// Minimum relative change of a metric across the suspected time for the
    /// temporal test to count it as a real shift.
    pub min_relative_shift: f64,

    /// How far after the incident start a suspected cause may sit before it
    /// is considered to follow its own effect.
    pub causality_slack_mins: i64,

    /// Estimated spend per strategy run, reserved before the run.
    pub estimated_costs: StrategyCostConfig,
}

impl Default for DisproofConfig {
    fn default() -> Self {
        Self {
            window_mins: 60,
            min_relative_shift: 0.2,
            causality_slack_mins: 5,
            estimated_costs: StrategyCostConfig::default(),
        }
    }
}

impl DisproofConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.window_mins.max(0))
    }

    pub fn causality_slack(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.causality_slack_mins.max(0))
    }
}

/// Estimated cost of one run of each strategy, in budget currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyCostConfig {
    pub temporal_contradiction: f64,
    pub scope_verification: f64,
    pub metric_threshold_validation: f64,
}

impl Default for StrategyCostConfig {
    fn default() -> Self {
        Self {
            temporal_contradiction: 0.10,
            scope_verification: 0.05,
            metric_threshold_validation: 0.10,
        }
    }
}

impl StrategyCostConfig {
    pub fn temporal(&self) -> Cost {
        Cost::from_units(self.temporal_contradiction)
    }

    pub fn scope(&self) -> Cost {
        Cost::from_units(self.scope_verification)
    }

    pub fn threshold(&self) -> Cost {
        Cost::from_units(self.metric_threshold_validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_one_hour_window() {
        let config = DisproofConfig::default();
        assert_eq!(config.window(), chrono::Duration::hours(1));
        assert_eq!(config.min_relative_shift, 0.2);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: DisproofConfig =
            serde_json::from_str(r#"{"window_mins": 30, "estimated_costs": {"scope_verification": 0.5}}"#)
                .unwrap();
        assert_eq!(config.window_mins, 30);
        assert_eq!(config.estimated_costs.scope(), Cost::from_units(0.5));
        assert_eq!(config.estimated_costs.threshold(), Cost::from_units(0.10));
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        let config = DisproofConfig {
            window_mins: -5,
            ..Default::default()
        };
        assert_eq!(config.window(), chrono::Duration::zero());
    }
}
