//! Configuration for Vigil.
//!
//! Layered as defaults, then an optional file, then `VIGIL_`-prefixed
//! environment variables (`VIGIL_ORCHESTRATOR__WORKER_TIMEOUT_SECS=10`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vigil_budget::DEFAULT_WARNING_PERCENT;
use vigil_disproof::DisproofConfig;
use vigil_types::Cost;

use crate::error::{OrchestratorError, OrchestratorResult};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub disproof: DisproofConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VigilConfig {
    /// Load configuration from file and environment.
    pub fn load(path: Option<&str>) -> OrchestratorResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&VigilConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("VIGIL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: VigilConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no investigation could run with.
    pub fn validate(&self) -> OrchestratorResult<()> {
        self.orchestrator.validate()?;
        if !(0.0..=100.0).contains(&self.budget.warning_percent) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "budget.warning_percent must be within 0..=100, got {}",
                self.budget.warning_percent
            )));
        }
        if self.disproof.window_mins <= 0 {
            return Err(OrchestratorError::InvalidConfig(
                "disproof.window_mins must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// How hypotheses with identical content from different workers are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Test every hypothesis, paying for each.
    #[default]
    TestIndependently,
    /// Keep only the best-ranked of hypotheses whose normalised statement
    /// and metadata are identical.
    CollapseExact,
}

/// Orchestrator tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Per-worker timeout for the Observe call.
    #[serde(default = "default_worker_timeout")]
    pub worker_timeout_secs: u64,

    /// Per-worker timeout for hypothesis drafting.
    #[serde(default = "default_draft_timeout")]
    pub draft_timeout_secs: u64,

    /// Timeout for the decision port.
    #[serde(default = "default_decision_timeout")]
    pub decision_timeout_secs: u64,

    /// Per-run timeout for a disproof strategy.
    #[serde(default = "default_strategy_timeout")]
    pub strategy_timeout_secs: u64,

    /// Workers observed at once.
    #[serde(default = "default_observe_concurrency")]
    pub observe_concurrency: usize,

    #[serde(default = "default_max_selected")]
    pub max_selected_hypotheses: usize,

    /// Confidence a surviving hypothesis needs for RESOLVED.
    #[serde(default = "default_resolution_threshold")]
    pub resolution_threshold: f64,

    /// Reserved per worker before observing, in budget units.
    #[serde(default = "default_observe_cost")]
    pub estimated_observe_cost: f64,

    /// Reserved per worker before drafting, in budget units.
    #[serde(default = "default_draft_cost")]
    pub estimated_draft_cost: f64,

    /// How far before the incident start workers look.
    #[serde(default = "default_lookback")]
    pub observation_lookback_mins: i64,

    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_timeout_secs: default_worker_timeout(),
            draft_timeout_secs: default_draft_timeout(),
            decision_timeout_secs: default_decision_timeout(),
            strategy_timeout_secs: default_strategy_timeout(),
            observe_concurrency: default_observe_concurrency(),
            max_selected_hypotheses: default_max_selected(),
            resolution_threshold: default_resolution_threshold(),
            estimated_observe_cost: default_observe_cost(),
            estimated_draft_cost: default_draft_cost(),
            observation_lookback_mins: default_lookback(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }

    pub fn draft_timeout(&self) -> Duration {
        Duration::from_secs(self.draft_timeout_secs)
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_secs(self.decision_timeout_secs)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_secs(self.strategy_timeout_secs)
    }

    pub fn estimated_observe_cost(&self) -> Cost {
        Cost::from_units(self.estimated_observe_cost)
    }

    pub fn estimated_draft_cost(&self) -> Cost {
        Cost::from_units(self.estimated_draft_cost)
    }

    pub fn observation_lookback(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.observation_lookback_mins.max(0))
    }

    pub fn validate(&self) -> OrchestratorResult<()> {
        let timeouts = [
            ("worker_timeout_secs", self.worker_timeout_secs),
            ("draft_timeout_secs", self.draft_timeout_secs),
            ("decision_timeout_secs", self.decision_timeout_secs),
            ("strategy_timeout_secs", self.strategy_timeout_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, secs)| *secs == 0) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "orchestrator.{name} must be positive"
            )));
        }
        if self.observe_concurrency == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "orchestrator.observe_concurrency must be positive".into(),
            ));
        }
        if self.max_selected_hypotheses == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "orchestrator.max_selected_hypotheses must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.resolution_threshold) {
            return Err(OrchestratorError::InvalidConfig(format!(
                "orchestrator.resolution_threshold must be within 0..=1, got {}",
                self.resolution_threshold
            )));
        }
        let estimates = [
            ("estimated_observe_cost", self.estimated_observe_cost),
            ("estimated_draft_cost", self.estimated_draft_cost),
        ];
        if let Some((name, _)) = estimates
            .iter()
            .find(|(_, cost)| !cost.is_finite() || *cost < 0.0)
        {
            return Err(OrchestratorError::InvalidConfig(format!(
                "orchestrator.{name} must be a non-negative number"
            )));
        }
        Ok(())
    }
}

/// Ledger settings applied to every investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Utilization (percent) at which a threshold event is emitted.
    #[serde(default = "default_warning_percent")]
    pub warning_percent: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            warning_percent: default_warning_percent(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_worker_timeout() -> u64 {
    30
}

fn default_draft_timeout() -> u64 {
    60
}

fn default_decision_timeout() -> u64 {
    300
}

fn default_strategy_timeout() -> u64 {
    30
}

fn default_observe_concurrency() -> usize {
    4
}

fn default_max_selected() -> usize {
    3
}

fn default_resolution_threshold() -> f64 {
    0.7
}

fn default_observe_cost() -> f64 {
    0.02
}

fn default_draft_cost() -> f64 {
    0.05
}

fn default_lookback() -> i64 {
    60
}

fn default_warning_percent() -> f64 {
    DEFAULT_WARNING_PERCENT
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VigilConfig::default();
        assert_eq!(config.orchestrator.worker_timeout(), Duration::from_secs(30));
        assert_eq!(config.orchestrator.max_selected_hypotheses, 3);
        assert_eq!(config.orchestrator.resolution_threshold, 0.7);
        assert_eq!(config.orchestrator.duplicate_policy, DuplicatePolicy::TestIndependently);
        assert_eq!(config.budget.warning_percent, 80.0);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = VigilConfig::load(None).unwrap();
        assert_eq!(config.orchestrator.strategy_timeout_secs, 30);
        assert_eq!(config.disproof.window_mins, 60);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: VigilConfig = serde_json::from_str(
            r#"{"orchestrator": {"observe_concurrency": 8, "duplicate_policy": "collapse_exact"}}"#,
        )
        .unwrap();
        assert_eq!(config.orchestrator.observe_concurrency, 8);
        assert_eq!(config.orchestrator.duplicate_policy, DuplicatePolicy::CollapseExact);
        assert_eq!(config.orchestrator.draft_timeout_secs, 60);
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        let mut config = VigilConfig::default();
        config.orchestrator.strategy_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(OrchestratorError::InvalidConfig(msg)) if msg.contains("strategy_timeout_secs")
        ));

        let mut config = VigilConfig::default();
        config.orchestrator.resolution_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = VigilConfig::default();
        config.orchestrator.observe_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = VigilConfig::default();
        config.orchestrator.estimated_observe_cost = -0.1;
        assert!(matches!(
            config.validate(),
            Err(OrchestratorError::InvalidConfig(msg)) if msg.contains("estimated_observe_cost")
        ));

        let mut config = VigilConfig::default();
        config.budget.warning_percent = 120.0;
        assert!(config.validate().is_err());
    }
}
