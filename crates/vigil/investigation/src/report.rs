//! Serializable end-of-investigation summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_types::{
    withstood_disproof, Cost, DisproofAttempt, DisproofOutcome, Hypothesis, HypothesisId,
    IncidentId, InvestigationId, OodaPhase, WorkerId,
};

use crate::investigation::TransitionRecord;
use crate::status::InvestigationStatus;

/// Everything needed to explain why an investigation ended where it did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvestigationReport {
    pub investigation_id: InvestigationId,
    pub incident_id: IncidentId,
    pub status: InvestigationStatus,
    pub terminal_reason: Option<String>,
    pub budget_limit: Cost,
    pub total_cost: Cost,
    pub phase_costs: BTreeMap<OodaPhase, Cost>,
    /// Share of workers that contributed observations.
    pub observe_confidence: Option<f64>,
    pub observation_count: usize,
    /// In rank order.
    pub hypotheses: Vec<HypothesisReport>,
    pub transitions: Vec<TransitionRecord>,
    pub created_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

impl InvestigationReport {
    /// Selected hypotheses that survived at least one disproof attempt and
    /// were never disproven, in rank order.
    pub fn surviving(&self) -> impl Iterator<Item = &HypothesisReport> {
        self.hypotheses
            .iter()
            .filter(|h| h.selected && h.withstood_disproof())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HypothesisReport {
    pub id: HypothesisId,
    pub owner: WorkerId,
    pub statement: String,
    pub initial_confidence: f64,
    pub current_confidence: f64,
    pub selected: bool,
    pub evidence_count: usize,
    pub attempts: Vec<DisproofAttempt>,
}

impl HypothesisReport {
    pub fn from_hypothesis(hypothesis: &Hypothesis, selected: bool) -> Self {
        Self {
            id: hypothesis.id().clone(),
            owner: hypothesis.owner().clone(),
            statement: hypothesis.statement().to_string(),
            initial_confidence: hypothesis.initial_confidence(),
            current_confidence: hypothesis.current_confidence(),
            selected,
            evidence_count: hypothesis.evidence().count(),
            attempts: hypothesis.disproof_attempts().cloned().collect(),
        }
    }

    pub fn last_outcome(&self) -> Option<DisproofOutcome> {
        self.attempts.last().map(|a| a.outcome)
    }

    pub fn withstood_disproof(&self) -> bool {
        withstood_disproof(&self.attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_hypothesis_counts_history() {
        let mut h = Hypothesis::new(WorkerId::new("app"), "deploy 4512 broke checkout", 0.7).unwrap();
        h.record_disproof_attempt(DisproofAttempt::inconclusive("scope_verification", "no data"));
        let report = HypothesisReport::from_hypothesis(&h, true);
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.evidence_count, 0);
        assert_eq!(report.last_outcome(), Some(DisproofOutcome::Inconclusive));
        assert_eq!(report.current_confidence, 0.7);
        assert!(!report.withstood_disproof());
    }

    #[test]
    fn earlier_disproof_is_not_forgiven() {
        let mut h = Hypothesis::new(WorkerId::new("db"), "orders-db lock contention", 0.6).unwrap();
        h.record_disproof_attempt(DisproofAttempt::disproven("temporal_contradiction", "flat"));
        h.record_disproof_attempt(DisproofAttempt::survived("scope_verification", "matched"));
        let report = HypothesisReport::from_hypothesis(&h, true);
        assert_eq!(report.last_outcome(), Some(DisproofOutcome::Survived));
        assert!(!report.withstood_disproof());
    }
}
