//! Error types for disproof strategies.

use thiserror::Error;

use crate::strategy::StrategyKind;

/// Errors raised while selecting or running a disproof strategy.
///
/// None of these are fatal to an investigation: the orchestrator converts
/// each of them into an INCONCLUSIVE disproof attempt.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DisproofError {
    /// The hypothesis lacks metadata the strategy needs.
    #[error("required metadata missing for {strategy}: {}", missing.join(", "))]
    MissingMetadata {
        strategy: StrategyKind,
        missing: Vec<String>,
    },

    /// Metadata is present but unusable (e.g. a non-numeric threshold).
    #[error("invalid metadata '{key}': {reason}")]
    InvalidMetadata { key: String, reason: String },

    /// The evidence backend failed.
    #[error("evidence source error: {0}")]
    Source(String),

    /// No strategy of this kind is registered.
    #[error("strategy not registered: {0}")]
    StrategyNotRegistered(StrategyKind),
}

/// Result type for disproof operations.
pub type DisproofResult<T> = Result<T, DisproofError>;
