//! The disproof strategy capability.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vigil_types::{Cost, DisproofAttempt, Evidence, Hypothesis, Incident};

use crate::error::DisproofResult;
use crate::source::EvidenceSource;

/// The built-in kinds of disproof test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    TemporalContradiction,
    ScopeVerification,
    MetricThresholdValidation,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        Self::TemporalContradiction,
        Self::ScopeVerification,
        Self::MetricThresholdValidation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TemporalContradiction => "temporal_contradiction",
            Self::ScopeVerification => "scope_verification",
            Self::MetricThresholdValidation => "metric_threshold_validation",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a strategy gets to work with besides the hypothesis.
#[derive(Clone)]
pub struct DisproofContext<'a> {
    pub incident: &'a Incident,
    pub source: Arc<dyn EvidenceSource>,
}

/// Result of one strategy run.
#[derive(Clone, Debug)]
pub struct DisproofReport {
    /// The verdict, carrying the evidence it rests on.
    pub attempt: DisproofAttempt,
    /// What the run actually spent.
    pub cost: Cost,
}

impl DisproofReport {
    /// `evidence` is attached to `attempt` in collection order.
    pub fn new(attempt: DisproofAttempt, evidence: Vec<Evidence>, cost: Cost) -> Self {
        Self {
            attempt: attempt.with_evidence(evidence),
            cost,
        }
    }

    pub fn evidence(&self) -> &[Evidence] {
        &self.attempt.evidence
    }
}

/// A test that tries to falsify a hypothesis.
#[async_trait]
pub trait DisproofStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Metadata keys that must be present on the hypothesis.
    fn required_metadata_fields(&self) -> &'static [&'static str];

    /// Spend to reserve before running against `hypothesis`.
    fn estimated_cost(&self, hypothesis: &Hypothesis) -> Cost;

    async fn test(
        &self,
        hypothesis: &Hypothesis,
        ctx: &DisproofContext<'_>,
    ) -> DisproofResult<DisproofReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(StrategyKind::TemporalContradiction.to_string(), "temporal_contradiction");
        assert_eq!(StrategyKind::ScopeVerification.name(), "scope_verification");
        assert_eq!(
            serde_json::to_string(&StrategyKind::MetricThresholdValidation).unwrap(),
            "\"metric_threshold_validation\""
        );
    }
}
