//! Error types for the budget ledger.

use thiserror::Error;
use vigil_types::Cost;

/// Errors raised by the budget ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BudgetError {
    /// The operation would take spend past the investigation's limit.
    #[error("budget exceeded: requested {requested}, spent {spent}, reserved {reserved}, limit {limit}")]
    Exceeded {
        requested: Cost,
        spent: Cost,
        reserved: Cost,
        limit: Cost,
    },

    /// The reservation was not issued by this ledger or was already settled.
    #[error("unknown reservation {0}")]
    UnknownReservation(u64),
}

/// Result type for ledger operations.
pub type BudgetResult<T> = Result<T, BudgetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceeded_message_names_amounts() {
        let err = BudgetError::Exceeded {
            requested: Cost::from_units(0.5),
            spent: Cost::from_units(0.8),
            reserved: Cost::ZERO,
            limit: Cost::from_units(1.0),
        };
        assert_eq!(
            err.to_string(),
            "budget exceeded: requested 0.50, spent 0.80, reserved 0.00, limit 1.00"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BudgetError>();
    }
}
