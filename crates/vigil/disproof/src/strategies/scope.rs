//! Scope verification.
//!
//! Compares the services a hypothesis claims are affected against the
//! services that actually show impact around the incident start.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use vigil_types::{metadata_keys, Cost, DisproofAttempt, Evidence, EvidenceQuality, Hypothesis, TimeRange};

use crate::config::DisproofConfig;
use crate::error::{DisproofError, DisproofResult};
use crate::strategy::{DisproofContext, DisproofReport, DisproofStrategy, StrategyKind};

const REQUIRED: &[&str] = &[metadata_keys::CLAIMED_SCOPE];

/// Tests "impact is confined to these services" claims.
#[derive(Debug, Clone)]
pub struct ScopeVerification {
    config: DisproofConfig,
    estimated_cost: Cost,
}

impl ScopeVerification {
    pub fn new(config: DisproofConfig) -> Self {
        let estimated_cost = config.estimated_costs.scope();
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

impl Default for ScopeVerification {
    fn default() -> Self {
        Self::new(DisproofConfig::default())
    }
}

#[async_trait]
impl DisproofStrategy for ScopeVerification {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ScopeVerification
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
        let claimed: BTreeSet<String> = hypothesis
            .metadata_list(metadata_keys::CLAIMED_SCOPE)
            .into_iter()
            .collect();
        if claimed.is_empty() {
            return Err(DisproofError::InvalidMetadata {
                key: metadata_keys::CLAIMED_SCOPE.into(),
                reason: "expected a service name or a list of service names".into(),
            });
        }

        let window = TimeRange::around(ctx.incident.started_at, self.config.window());
        let impact = ctx.source.impacted_services(window).await?;
        let actual = impact.value;

        debug!(
            hypothesis = %hypothesis.id(),
            claimed = claimed.len(),
            actual = actual.len(),
            "Verifying claimed scope"
        );

        if actual.is_empty() {
            let attempt = DisproofAttempt::inconclusive(
                self.name(),
                "no impact data available for the incident window",
            );
            return Ok(DisproofReport::new(attempt, Vec::new(), impact.cost));
        }

        let unclaimed: Vec<&String> = actual.difference(&claimed).collect();
        let unaffected: Vec<&String> = claimed.difference(&actual).collect();
        let data = json!({
            "claimed": claimed,
            "actual": actual,
            "unclaimed": unclaimed,
            "unaffected": unaffected,
        });

        let verdict = match (unclaimed.is_empty(), unaffected.is_empty()) {
            (true, true) => None,
            (false, true) => Some(format!(
                "impact is broader than claimed: {} also affected",
                join(&unclaimed)
            )),
            (true, false) => Some(format!(
                "impact is narrower than claimed: {} unaffected",
                join(&unaffected)
            )),
            (false, false) => Some(format!(
                "impact differs from claim: {} affected but unclaimed, {} claimed but unaffected",
                join(&unclaimed),
                join(&unaffected)
            )),
        };

        let report = match verdict {
            None => DisproofReport::new(
                DisproofAttempt::survived(
                    self.name(),
                    format!("impact matches the claimed scope ({})", join(&claimed.iter().collect::<Vec<_>>())),
                ),
                vec![Evidence::supporting("impact:services", EvidenceQuality::Corroborated, data)],
                impact.cost,
            ),
            Some(reasoning) => DisproofReport::new(
                DisproofAttempt::disproven(self.name(), reasoning),
                vec![Evidence::contradicting("impact:services", EvidenceQuality::Corroborated, data)],
                impact.cost,
            ),
        };
        Ok(report)
    }
}

fn join(names: &[&String]) -> String {
    names.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryEvidenceSource;
    use crate::strategies::fixtures::{context, hypothesis, incident};
    use vigil_types::DisproofOutcome;

    fn run_with(
        impacted: &[&str],
        claim: serde_json::Value,
    ) -> (Hypothesis, InMemoryEvidenceSource) {
        let source = InMemoryEvidenceSource::new()
            .with_impacted_services(impacted.iter().copied())
            .with_query_cost(Cost::from_units(0.01));
        let h = hypothesis().with_metadata(metadata_keys::CLAIMED_SCOPE, claim);
        (h, source)
    }

    #[tokio::test]
    async fn exact_match_survives() {
        let incident = incident();
        let (h, source) = run_with(&["checkout", "payments"], json!(["payments", "checkout"]));
        let ctx = context(&incident, source);

        let report = ScopeVerification::default().test(&h, &ctx).await.unwrap();
        assert_eq!(report.attempt.outcome, DisproofOutcome::Survived);
        assert_eq!(report.evidence()[0].quality, EvidenceQuality::Corroborated);
        assert_eq!(report.cost, Cost::from_units(0.01));
    }

    #[tokio::test]
    async fn broader_impact_disproves() {
        let incident = incident();
        let (h, source) = run_with(&["checkout", "payments", "search"], json!("checkout"));
        let ctx = context(&incident, source);

        let report = ScopeVerification::default().test(&h, &ctx).await.unwrap();
        assert_eq!(report.attempt.outcome, DisproofOutcome::Disproven);
        assert!(report.attempt.reasoning.contains("broader"));
        assert!(report.attempt.reasoning.contains("payments, search"));
    }

    #[tokio::test]
    async fn narrower_impact_disproves() {
        let incident = incident();
        let (h, source) = run_with(&["checkout"], json!(["checkout", "payments"]));
        let ctx = context(&incident, source);

        let report = ScopeVerification::default().test(&h, &ctx).await.unwrap();
        assert_eq!(report.attempt.outcome, DisproofOutcome::Disproven);
        assert!(report.attempt.reasoning.contains("narrower"));
    }

    #[tokio::test]
    async fn no_impact_data_is_inconclusive() {
        let incident = incident();
        let (h, source) = run_with(&[], json!(["checkout"]));
        let ctx = context(&incident, source);

        let report = ScopeVerification::default().test(&h, &ctx).await.unwrap();
        assert_eq!(report.attempt.outcome, DisproofOutcome::Inconclusive);
        assert!(report.evidence().is_empty());
    }

    #[tokio::test]
    async fn non_string_scope_is_invalid() {
        let incident = incident();
        let (h, source) = run_with(&["checkout"], json!(42));
        let ctx = context(&incident, source);

        assert!(ScopeVerification::default().test(&h, &ctx).await.is_err());
    }
}
