//! The decision capability: who picks which hypotheses get tested.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vigil_types::{Hypothesis, HypothesisId, Incident, InvestigationId};

/// Two hypotheses from different workers blaming overlapping systems.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisConflict {
    /// The better-ranked of the two.
    pub left: HypothesisId,
    pub right: HypothesisId,
    pub shared_systems: Vec<String>,
}

/// Pairwise conflicts among `ranked`, in rank order of the left side.
pub fn detect_conflicts(ranked: &[Hypothesis]) -> Vec<HypothesisConflict> {
    let mut conflicts = Vec::new();
    for (i, left) in ranked.iter().enumerate() {
        let left_systems: BTreeSet<&String> = left.affected_systems().iter().collect();
        for right in &ranked[i + 1..] {
            if left.owner() == right.owner() {
                continue;
            }
            let shared: Vec<String> = right
                .affected_systems()
                .iter()
                .filter(|s| left_systems.contains(s))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .cloned()
                .collect();
            if !shared.is_empty() {
                conflicts.push(HypothesisConflict {
                    left: left.id().clone(),
                    right: right.id().clone(),
                    shared_systems: shared,
                });
            }
        }
    }
    conflicts
}

/// Everything a decider sees.
#[derive(Clone, Debug)]
pub struct DecisionRequest {
    pub investigation_id: InvestigationId,
    pub incident: Incident,
    /// Best first.
    pub ranked: Vec<Hypothesis>,
    pub conflicts: Vec<HypothesisConflict>,
    /// Upper bound on how many will be tested.
    pub max_selections: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Test these. Extra or unknown ids are dropped by the orchestrator.
    Selected(Vec<HypothesisId>),
    /// No decision can be made now (e.g. no interactive channel). The
    /// investigation waits in AWAITING_HUMAN.
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecisionError {
    #[error("decision failed: {0}")]
    Failed(String),
}

/// Human or automated selection of hypotheses to test.
#[async_trait]
pub trait DecisionPort: Send + Sync {
    async fn decide(&self, request: &DecisionRequest) -> Result<Decision, DecisionError>;
}

/// Automated policy: take the best-ranked hypotheses.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopRankedDecision {
    limit: Option<usize>,
}

impl TopRankedDecision {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select at most `limit`, even if the orchestrator would allow more.
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}

#[async_trait]
impl DecisionPort for TopRankedDecision {
    async fn decide(&self, request: &DecisionRequest) -> Result<Decision, DecisionError> {
        let take = self
            .limit
            .map_or(request.max_selections, |l| l.min(request.max_selections));
        Ok(Decision::Selected(
            request.ranked.iter().take(take).map(|h| h.id().clone()).collect(),
        ))
    }
}

/// Always reports that nobody is available to decide.
#[derive(Debug, Clone)]
pub struct UnavailableDecision {
    reason: String,
}

impl UnavailableDecision {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnavailableDecision {
    fn default() -> Self {
        Self::new("no interactive decision channel")
    }
}

#[async_trait]
impl DecisionPort for UnavailableDecision {
    async fn decide(&self, _request: &DecisionRequest) -> Result<Decision, DecisionError> {
        Ok(Decision::Unavailable(self.reason.clone()))
    }
}
