//! Temporal contradiction.
//!
//! A cause has to precede its effect, and the metric it names has to move
//! around the time it is said to have happened. Either failing contradicts
//! the hypothesis.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use vigil_types::{metadata_keys, Cost, DisproofAttempt, Evidence, EvidenceQuality, Hypothesis, TimeRange};

use super::{mean, required_str};
use crate::config::DisproofConfig;
use crate::error::{DisproofError, DisproofResult};
use crate::strategy::{DisproofContext, DisproofReport, DisproofStrategy, StrategyKind};

const REQUIRED: &[&str] = &[metadata_keys::SUSPECTED_TIME, metadata_keys::METRIC];

/// Tests "X happened at time T and caused the incident" claims.
#[derive(Debug, Clone)]
pub struct TemporalContradiction {
    config: DisproofConfig,
    estimated_cost: Cost,
}

impl TemporalContradiction {
    pub fn new(config: DisproofConfig) -> Self {
        let estimated_cost = config.estimated_costs.temporal();
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

impl Default for TemporalContradiction {
    fn default() -> Self {
        Self::new(DisproofConfig::default())
    }
}

#[async_trait]
impl DisproofStrategy for TemporalContradiction {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TemporalContradiction
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
        let suspected = hypothesis
            .metadata_time(metadata_keys::SUSPECTED_TIME)
            .ok_or_else(|| DisproofError::InvalidMetadata {
                key: metadata_keys::SUSPECTED_TIME.into(),
                reason: "expected an RFC 3339 timestamp or unix seconds".into(),
            })?;
        let metric = required_str(hypothesis, metadata_keys::METRIC)?;
        let incident_start = ctx.incident.started_at;

        if suspected > incident_start + self.config.causality_slack() {
            let attempt = DisproofAttempt::disproven(
                self.name(),
                format!("suspected cause at {suspected} follows the incident start at {incident_start}"),
            );
            let evidence = Evidence::contradicting(
                "incident:timeline",
                EvidenceQuality::Direct,
                json!({
                    "suspected_time": suspected,
                    "incident_start": incident_start,
                    "lag_secs": (suspected - incident_start).num_seconds(),
                }),
            );
            return Ok(DisproofReport::new(attempt, vec![evidence], Cost::ZERO));
        }

        let window = TimeRange::around(suspected, self.config.window());
        let series = ctx.source.metric_series(metric, window).await?;
        let (before, after): (Vec<_>, Vec<_>) =
            series.value.into_iter().partition(|s| s.at < suspected);

        debug!(
            hypothesis = %hypothesis.id(),
            metric,
            before = before.len(),
            after = after.len(),
            "Checking metric shift around suspected time"
        );

        let (Some(before_mean), Some(after_mean)) = (mean(&before), mean(&after)) else {
            let attempt = DisproofAttempt::inconclusive(
                self.name(),
                format!("not enough '{metric}' samples on both sides of {suspected}"),
            );
            return Ok(DisproofReport::new(attempt, Vec::new(), series.cost));
        };

        let baseline = before_mean.abs().max(f64::EPSILON);
        let shift = (after_mean - before_mean).abs() / baseline;
        let data = json!({
            "metric": metric,
            "suspected_time": suspected,
            "before_mean": before_mean,
            "after_mean": after_mean,
            "relative_shift": shift,
        });
        let source = format!("metrics:{metric}");

        let report = if shift >= self.config.min_relative_shift {
            DisproofReport::new(
                DisproofAttempt::survived(
                    self.name(),
                    format!(
                        "'{metric}' moved from {before_mean:.3} to {after_mean:.3} around {suspected}"
                    ),
                ),
                vec![Evidence::supporting(source, EvidenceQuality::Indirect, data)],
                series.cost,
            )
        } else {
            DisproofReport::new(
                DisproofAttempt::disproven(
                    self.name(),
                    format!(
                        "'{metric}' stayed flat around {suspected} ({before_mean:.3} -> {after_mean:.3})"
                    ),
                ),
                vec![Evidence::contradicting(source, EvidenceQuality::Indirect, data)],
                series.cost,
            )
        };
        Ok(report)
    }
}
