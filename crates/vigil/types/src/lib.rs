//! # vigil-types
//!
//! Core data model for Vigil incident investigations.
//!
//! ```text
//!   Incident ──► Observation[] ──► Hypothesis ──► Evidence / DisproofAttempt
//!                                      │
//!                                      └── ConfidenceUpdater (only path that
//!                                          changes current confidence)
//! ```
//!
//! All values are plain data. The investigation aggregate that owns them
//! lives in `vigil-investigation`; shared mutable state (the budget) lives
//! in `vigil-budget`.

#![deny(unsafe_code)]

pub mod confidence;
pub mod cost;
pub mod disproof;
pub mod error;
pub mod evidence;
pub mod hypothesis;
pub mod ids;
pub mod incident;
pub mod observation;
pub mod phase;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use confidence::{
    ConfidenceUpdater, UpdateDirection, CONFIDENCE_CEILING, DISPROVEN_CONFIDENCE,
    EVIDENCE_PULL, SURVIVAL_BOOST,
};
pub use cost::Cost;
pub use disproof::{withstood_disproof, DisproofAttempt, DisproofOutcome};
pub use error::{TypesError, TypesResult};
pub use evidence::{Evidence, EvidenceQuality};
pub use hypothesis::{metadata_keys, Hypothesis, HypothesisEntry};
pub use ids::{HypothesisId, IncidentId, InvestigationId, WorkerId};
pub use incident::{Incident, Severity, TimeRange};
pub use observation::Observation;
pub use phase::OodaPhase;
