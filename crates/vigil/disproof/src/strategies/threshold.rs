//! Metric threshold validation.
//!
//! Checks whether the named metric actually crossed the claimed threshold
//! inside the claimed window (suspected time, else incident start, ± window).

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use vigil_types::{metadata_keys, Cost, DisproofAttempt, Evidence, EvidenceQuality, Hypothesis, TimeRange};

use super::required_str;
use crate::config::DisproofConfig;
use crate::error::{DisproofError, DisproofResult};
use crate::source::MetricSample;
use crate::strategy::{DisproofContext, DisproofReport, DisproofStrategy, StrategyKind};

const REQUIRED: &[&str] = &[metadata_keys::METRIC, metadata_keys::THRESHOLD];

/// Which side of the threshold the hypothesis claims the metric went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdDirection {
    Above,
    Below,
}

impl ThresholdDirection {
    fn from_hypothesis(hypothesis: &Hypothesis) -> DisproofResult<Self> {
        match hypothesis.metadata_str(metadata_keys::DIRECTION) {
            None => Ok(Self::Above),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "above" | "over" | "gt" => Ok(Self::Above),
                "below" | "under" | "lt" => Ok(Self::Below),
                other => Err(DisproofError::InvalidMetadata {
                    key: metadata_keys::DIRECTION.into(),
                    reason: format!("expected 'above' or 'below', got '{other}'"),
                }),
            },
        }
    }

    fn crosses(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Above => value > threshold,
            Self::Below => value < threshold,
        }
    }

    /// The sample furthest in the claimed direction.
    fn extreme<'s>(&self, samples: &'s [MetricSample]) -> Option<&'s MetricSample> {
        let cmp = |a: &&MetricSample, b: &&MetricSample| a.value.total_cmp(&b.value);
        match self {
            Self::Above => samples.iter().max_by(cmp),
            Self::Below => samples.iter().min_by(cmp),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

/// Tests "metric X crossed threshold T" claims.
#[derive(Debug, Clone)]
pub struct MetricThresholdValidation {
    config: DisproofConfig,
    estimated_cost: Cost,
}

impl MetricThresholdValidation {
    pub fn new(config: DisproofConfig) -> Self {
        let estimated_cost = config.estimated_costs.threshold();
        Self {
            config,
            estimated_cost,
        }
    }

    pub fn with_estimated_cost(mut self, cost: Cost) -> Self {
        self.estimated_cost = cost;
        self
    }
}

impl Default for MetricThresholdValidation {
    fn default() -> Self {
        Self::new(DisproofConfig::default())
    }
}

#[async_trait]
impl DisproofStrategy for MetricThresholdValidation {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MetricThresholdValidation
    }

    fn required_metadata_fields(&self) -> &'static [&'static str] {
        REQUIRED
    }

    fn estimated_cost(&self, _hypothesis: &Hypothesis) -> Cost {
        self.estimated_cost
    }

    async fn test(
        &self,
        hypothesis: &Hypothesis,
        ctx: &DisproofContext<'_>,
    ) -> DisproofResult<DisproofReport> {
        let metric = required_str(hypothesis, metadata_keys::METRIC)?;
        let threshold = hypothesis
            .metadata_f64(metadata_keys::THRESHOLD)
            .ok_or_else(|| DisproofError::InvalidMetadata {
                key: metadata_keys::THRESHOLD.into(),
                reason: "expected a number".into(),
            })?;
        let direction = ThresholdDirection::from_hypothesis(hypothesis)?;

        let center = hypothesis
            .metadata_time(metadata_keys::SUSPECTED_TIME)
            .unwrap_or(ctx.incident.started_at);
        let window = TimeRange::around(center, self.config.window());

        let series = ctx.source.metric_series(metric, window).await?;
        let samples = series.value;
        let source = format!("metrics:{metric}");

        debug!(
            hypothesis = %hypothesis.id(),
            metric,
            threshold,
            samples = samples.len(),
            "Validating metric threshold"
        );

        let Some(extreme) = direction.extreme(&samples).copied() else {
            let attempt = DisproofAttempt::inconclusive(
                self.name(),
                format!("no samples for '{metric}' between {} and {}", window.start, window.end),
            );
            return Ok(DisproofReport::new(attempt, Vec::new(), series.cost));
        };

        let crossings = samples
            .iter()
            .filter(|s| direction.crosses(s.value, threshold))
            .count();
        let data = json!({
            "metric": metric,
            "threshold": threshold,
            "direction": direction.label(),
            "extreme": extreme.value,
            "extreme_at": extreme.at,
            "samples": samples.len(),
            "crossings": crossings,
        });

        let report = if crossings > 0 {
            DisproofReport::new(
                DisproofAttempt::survived(
                    self.name(),
                    format!(
                        "'{metric}' went {} {threshold} in {crossings} of {} samples (extreme {} at {})",
                        direction.label(),
                        samples.len(),
                        extreme.value,
                        extreme.at
                    ),
                ),
                vec![Evidence::supporting(source, EvidenceQuality::Direct, data)],
                series.cost,
            )
        } else {
            DisproofReport::new(
                DisproofAttempt::disproven(
                    self.name(),
                    format!(
                        "'{metric}' never went {} {threshold} in the claimed window (extreme {})",
                        direction.label(),
                        extreme.value
                    ),
                ),
                vec![Evidence::contradicting(source, EvidenceQuality::Direct, data)],
                series.cost,
            )
        };
        Ok(report)
    }
}
