//! # vigil-investigation
//!
//! The investigation aggregate: one incident, its lifecycle, everything
//! learned about it, and the shared budget ledger it charges.
//!
//! ```text
//!   Investigation
//!   ├── status ──── InvestigationStatus (listed edges only, audited)
//!   ├── observations
//!   ├── hypotheses (ranked) ── selected ids
//!   ├── Arc<BudgetLedger>  ◄── shared with costed operations
//!   └── report() ─► InvestigationReport
//! ```
//!
//! A charge the ledger refuses forces the investigation to INCONCLUSIVE
//! before the error reaches the caller, so it is never left mid-phase with
//! an unrecorded overage.

#![deny(unsafe_code)]

pub mod error;
pub mod investigation;
pub mod report;
pub mod status;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use error::{StateError, StateResult};
pub use investigation::{Investigation, TransitionRecord};
pub use report::{HypothesisReport, InvestigationReport};
pub use status::InvestigationStatus;
