//! Error types for the investigation aggregate.

use thiserror::Error;
use vigil_budget::BudgetError;
use vigil_types::HypothesisId;

use crate::status::InvestigationStatus;

/// Errors raised by [`Investigation`](crate::Investigation) mutations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    /// The requested edge is not in the lifecycle graph. Indicates a caller
    /// bug; the investigation is left unchanged.
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        from: InvestigationStatus,
        to: InvestigationStatus,
    },

    /// The budget ledger rejected a charge. The investigation has already
    /// been moved to a terminal state when this is returned.
    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error("unknown hypothesis: {0}")]
    UnknownHypothesis(HypothesisId),
}

impl StateError {
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(self, Self::Budget(BudgetError::Exceeded { .. }))
    }
}

/// Result type for investigation operations.
pub type StateResult<T> = Result<T, StateError>;
