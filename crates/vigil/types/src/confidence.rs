//! Confidence revision.
//!
//! The only place hypothesis confidence is computed. `Hypothesis` routes
//! every evidence append and disproof attempt through [`ConfidenceUpdater`],
//! and a hypothesis' current confidence is always the fold of the updater
//! over its initial confidence and its ordered history.

use crate::disproof::DisproofOutcome;
use crate::evidence::Evidence;
use crate::hypothesis::HypothesisEntry;

/// Upper bound reachable through survival or supporting evidence.
pub const CONFIDENCE_CEILING: f64 = 0.95;

/// Confidence assigned to a disproven hypothesis. Kept above zero so later
/// contradicting evidence against the disproof can reopen it.
pub const DISPROVEN_CONFIDENCE: f64 = 0.2;

/// Relative boost applied when a hypothesis survives a disproof attempt.
pub const SURVIVAL_BOOST: f64 = 1.15;

/// Fraction of the distance to the target that fully weighted (DIRECT)
/// evidence moves confidence.
pub const EVIDENCE_PULL: f64 = 0.5;

/// Direction of a confidence change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateDirection {
    Strengthened,
    Weakened,
    Unchanged,
}

impl UpdateDirection {
    pub fn between(prior: f64, posterior: f64) -> Self {
        if (posterior - prior).abs() < f64::EPSILON {
            Self::Unchanged
        } else if posterior > prior {
            Self::Strengthened
        } else {
            Self::Weakened
        }
    }
}

/// Deterministic confidence updater.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfidenceUpdater;

impl ConfidenceUpdater {
    /// Revise confidence after a disproof attempt.
    ///
    /// - SURVIVED: `min(0.95, current * 1.15)`
    /// - DISPROVEN: `0.2`
    /// - INCONCLUSIVE: unchanged
    pub fn after_outcome(&self, current: f64, outcome: DisproofOutcome) -> f64 {
        let next = match outcome {
            DisproofOutcome::Survived => (current * SURVIVAL_BOOST).min(CONFIDENCE_CEILING),
            DisproofOutcome::Disproven => DISPROVEN_CONFIDENCE,
            DisproofOutcome::Inconclusive => current,
        };
        clamp_unit(next)
    }

    /// Nudge confidence by one piece of evidence.
    ///
    /// Supporting evidence pulls toward the ceiling and contradicting
    /// evidence toward the disproven floor, each by
    /// `distance * weight * EVIDENCE_PULL`. Evidence never pushes confidence
    /// away from its own target.
    pub fn after_evidence(&self, current: f64, evidence: &Evidence) -> f64 {
        let current = clamp_unit(current);
        let pull = evidence.quality.weight() * EVIDENCE_PULL;
        let next = if evidence.supports_hypothesis {
            if current < CONFIDENCE_CEILING {
                current + (CONFIDENCE_CEILING - current) * pull
            } else {
                current
            }
        } else if current > DISPROVEN_CONFIDENCE {
            current - (current - DISPROVEN_CONFIDENCE) * pull
        } else {
            current
        };
        clamp_unit(next)
    }

    /// Apply a single history entry.
    pub fn apply(&self, current: f64, entry: &HypothesisEntry) -> f64 {
        match entry {
            HypothesisEntry::Evidence(evidence) => self.after_evidence(current, evidence),
            HypothesisEntry::DisproofAttempt(attempt) => {
                self.after_outcome(current, attempt.outcome)
            }
        }
    }

    /// Re-derive confidence from the initial value and the full history.
    pub fn replay<'a>(
        &self,
        initial: f64,
        history: impl IntoIterator<Item = &'a HypothesisEntry>,
    ) -> f64 {
        history
            .into_iter()
            .fold(clamp_unit(initial), |c, entry| self.apply(c, entry))
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
