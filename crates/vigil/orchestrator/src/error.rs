//! Error types for the orchestrator.
//!
//! Only budget and state-machine violations reach callers. Worker and
//! strategy failures, timeouts and missing metadata are absorbed where they
//! happen and show up as degraded results instead.

use thiserror::Error;
use vigil_budget::BudgetError;
use vigil_investigation::{InvestigationStatus, StateError};
use vigil_types::HypothesisId;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The shared ledger refused a charge. The investigation has been moved
    /// to INCONCLUSIVE with the budget reason recorded.
    #[error(transparent)]
    BudgetExceeded(BudgetError),

    /// A lifecycle edge outside the state graph was requested.
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        from: InvestigationStatus,
        to: InvestigationStatus,
    },

    #[error("unknown hypothesis: {0}")]
    UnknownHypothesis(HypothesisId),

    /// A phase was invoked on an investigation in the wrong state.
    #[error("cannot run {phase} while investigation is {status}")]
    WrongPhase {
        phase: &'static str,
        status: InvestigationStatus,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<StateError> for OrchestratorError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::IllegalTransition { from, to } => Self::IllegalTransition { from, to },
            StateError::Budget(err) => Self::BudgetExceeded(err),
            StateError::UnknownHypothesis(id) => Self::UnknownHypothesis(id),
        }
    }
}

impl From<BudgetError> for OrchestratorError {
    fn from(err: BudgetError) -> Self {
        Self::BudgetExceeded(err)
    }
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::Cost;

    #[test]
    fn state_errors_map_onto_taxonomy() {
        let err: OrchestratorError = StateError::IllegalTransition {
            from: InvestigationStatus::Created,
            to: InvestigationStatus::Resolved,
        }
        .into();
        assert!(matches!(err, OrchestratorError::IllegalTransition { .. }));

        let budget = BudgetError::Exceeded {
            requested: Cost::from_units(0.5),
            spent: Cost::from_units(0.8),
            reserved: Cost::ZERO,
            limit: Cost::from_units(1.0),
        };
        let err: OrchestratorError = StateError::Budget(budget).into();
        assert!(err.to_string().starts_with("budget exceeded: requested 0.50"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OrchestratorError>();
    }
}
