//! Outcomes of attempts to disprove a hypothesis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evidence::Evidence;

/// What a disproof attempt concluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisproofOutcome {
    /// The hypothesis withstood the test.
    Survived,
    /// The test contradicted the hypothesis.
    Disproven,
    /// The test could not reach a verdict.
    Inconclusive,
}

impl std::fmt::Display for DisproofOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Survived => write!(f, "SURVIVED"),
            Self::Disproven => write!(f, "DISPROVEN"),
            Self::Inconclusive => write!(f, "INCONCLUSIVE"),
        }
    }
}

/// Record of one strategy run against one hypothesis.
///
/// `evidence` is the data the strategy based its verdict on. It is part of
/// the verdict, so it never moves confidence on its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisproofAttempt {
    pub strategy_name: String,
    pub outcome: DisproofOutcome,
    pub reasoning: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    pub timestamp: DateTime<Utc>,
}

impl DisproofAttempt {
    pub fn new(
        strategy_name: impl Into<String>,
        outcome: DisproofOutcome,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            outcome,
            reasoning: reasoning.into(),
            evidence: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach the data backing the verdict.
    pub fn with_evidence(mut self, evidence: impl IntoIterator<Item = Evidence>) -> Self {
        self.evidence.extend(evidence);
        self
    }

    pub fn survived(strategy_name: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self::new(strategy_name, DisproofOutcome::Survived, reasoning)
    }

    pub fn disproven(strategy_name: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self::new(strategy_name, DisproofOutcome::Disproven, reasoning)
    }

    pub fn inconclusive(strategy_name: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self::new(strategy_name, DisproofOutcome::Inconclusive, reasoning)
    }
}

/// True when at least one attempt reached SURVIVED and none DISPROVEN.
///
/// INCONCLUSIVE attempts (missing metadata, strategy errors, timeouts) do
/// not count as having withstood anything.
pub fn withstood_disproof<'a>(attempts: impl IntoIterator<Item = &'a DisproofAttempt>) -> bool {
    let mut survived = false;
    for attempt in attempts {
        match attempt.outcome {
            DisproofOutcome::Disproven => return false,
            DisproofOutcome::Survived => survived = true,
            DisproofOutcome::Inconclusive => {}
        }
    }
    survived
}
