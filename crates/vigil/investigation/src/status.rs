//! Investigation lifecycle states and the edges between them.
//!
//! ```text
//!   CREATED ─► OBSERVING ─► HYPOTHESIS_GENERATION ─► AWAITING_HUMAN ─► VALIDATING ─┬─► RESOLVED
//!                                                                                  └─► INCONCLUSIVE
//!   any non-terminal ─► CANCELLED
//! ```

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvestigationStatus {
    Created,
    Observing,
    HypothesisGeneration,
    AwaitingHuman,
    Validating,
    Resolved,
    Inconclusive,
    Cancelled,
}

impl InvestigationStatus {
    pub const ALL: [InvestigationStatus; 8] = [
        Self::Created,
        Self::Observing,
        Self::HypothesisGeneration,
        Self::AwaitingHuman,
        Self::Validating,
        Self::Resolved,
        Self::Inconclusive,
        Self::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Inconclusive | Self::Cancelled)
    }

    /// Whether `self -> to` is one of the listed lifecycle edges.
    ///
    /// The budget abort (any non-terminal state to INCONCLUSIVE) is not a
    /// listed edge and is only reachable through
    /// [`Investigation::abort_on_budget`](crate::Investigation::abort_on_budget).
    pub fn can_transition_to(&self, to: InvestigationStatus) -> bool {
        use InvestigationStatus::*;
        match (self, to) {
            (Created, Observing)
            | (Observing, HypothesisGeneration)
            | (HypothesisGeneration, AwaitingHuman)
            | (AwaitingHuman, Validating)
            | (Validating, Resolved)
            | (Validating, Inconclusive) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Observing => "OBSERVING",
            Self::HypothesisGeneration => "HYPOTHESIS_GENERATION",
            Self::AwaitingHuman => "AWAITING_HUMAN",
            Self::Validating => "VALIDATING",
            Self::Resolved => "RESOLVED",
            Self::Inconclusive => "INCONCLUSIVE",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for InvestigationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InvestigationStatus::*;

    #[test]
    fn happy_path_edges() {
        assert!(Created.can_transition_to(Observing));
        assert!(Observing.can_transition_to(HypothesisGeneration));
        assert!(HypothesisGeneration.can_transition_to(AwaitingHuman));
        assert!(AwaitingHuman.can_transition_to(Validating));
        assert!(Validating.can_transition_to(Resolved));
        assert!(Validating.can_transition_to(Inconclusive));
    }

    #[test]
    fn no_skipping_or_going_back() {
        assert!(!Created.can_transition_to(HypothesisGeneration));
        assert!(!Observing.can_transition_to(Created));
        assert!(!Validating.can_transition_to(Observing));
        assert!(!Observing.can_transition_to(Inconclusive));
        assert!(!Created.can_transition_to(Created));
    }

    #[test]
    fn cancel_only_from_non_terminal() {
        for status in InvestigationStatus::ALL {
            assert_eq!(status.can_transition_to(Cancelled), !status.is_terminal());
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [Resolved, Inconclusive, Cancelled] {
            for to in InvestigationStatus::ALL {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn serde_uses_screaming_case() {
        let json = serde_json::to_string(&HypothesisGeneration).unwrap();
        assert_eq!(json, "\"HYPOTHESIS_GENERATION\"");
    }
}
