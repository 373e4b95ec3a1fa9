//! Error types for the core data model.

use thiserror::Error;

/// Errors raised when constructing or validating core values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    /// A confidence value fell outside `[0, 1]` or was not a number.
    #[error("confidence {0} is outside [0, 1]")]
    InvalidConfidence(f64),

    /// A hypothesis statement was empty or whitespace.
    #[error("hypothesis statement is empty")]
    EmptyStatement,

    /// A time range ends before it starts.
    #[error("invalid time range: end precedes start")]
    InvalidTimeRange,
}

/// Result type for core value construction.
pub type TypesResult<T> = Result<T, TypesError>;
