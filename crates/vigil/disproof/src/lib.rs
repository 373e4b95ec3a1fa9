//! # vigil-disproof
//!
//! Disproof strategies for Vigil hypotheses.
//!
//! ```text
//!   Hypothesis ──► StrategySelector ──► StrategyRegistry::preflight
//!                                             │
//!                                             ▼
//!                     DisproofStrategy::test(hypothesis, ctx)
//!                                             │
//!                               EvidenceSource (metrics, impact)
//!                                             │
//!                                             ▼
//!                 DisproofReport { attempt (+ its evidence), cost }
//! ```
//!
//! Strategies only ever try to falsify. A strategy that cannot reach a
//! verdict returns an INCONCLUSIVE attempt; a strategy that cannot run at
//! all returns a [`DisproofError`] that the orchestrator turns into one.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod selector;
pub mod source;
pub mod strategies;
pub mod strategy;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use config::{DisproofConfig, StrategyCostConfig};
pub use error::{DisproofError, DisproofResult};
pub use selector::{missing_metadata, StrategyRegistry, StrategySelector};
pub use source::{EvidenceSource, InMemoryEvidenceSource, Metered, MetricSample};
pub use strategies::{
    MetricThresholdValidation, ScopeVerification, TemporalContradiction, ThresholdDirection,
};
pub use strategy::{DisproofContext, DisproofReport, DisproofStrategy, StrategyKind};
