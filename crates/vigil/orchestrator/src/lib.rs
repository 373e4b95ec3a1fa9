//! # vigil-orchestrator
//!
//! Runs an incident investigation through the OODA loop:
//!
//! ```text
//!   ┌─────────┐   ┌────────┐   ┌────────┐   ┌──────────────────┐
//!   │ Observe │──►│ Orient │──►│ Decide │──►│ Act (disproof)   │
//!   └────┬────┘   └───┬────┘   └───┬────┘   └────────┬─────────┘
//!        │            │            │                 │
//!     Workers      Workers    DecisionPort   StrategyRegistry + EvidenceSource
//!        │            │            │                 │
//!        └────────────┴─── Investigation (status, Arc<BudgetLedger>) ───┘
//! ```
//!
//! Worker and strategy failures degrade results; budget and lifecycle
//! violations are returned as [`OrchestratorError`]. Progress is published
//! as [`InvestigationEvent`]s through an [`EventSink`].

#![deny(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod decision;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod telemetry;
pub mod worker;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use cancel::{CancellationHandle, CancellationSignal};
pub use config::{BudgetConfig, DuplicatePolicy, LoggingConfig, OrchestratorConfig, VigilConfig};
pub use decision::{
    detect_conflicts, Decision, DecisionError, DecisionPort, DecisionRequest, HypothesisConflict,
    TopRankedDecision, UnavailableDecision,
};
pub use error::{OrchestratorError, OrchestratorResult};
pub use events::{
    BroadcastEventSink, EventKind, EventSink, InvestigationEvent, MemoryEventSink, NoopEventSink,
};
pub use orchestrator::{DecideOutcome, ObserveOutcome, Orchestrator};
pub use telemetry::init_tracing;
pub use worker::{
    DraftContext, DraftedHypotheses, ObservationBatch, ObserveContext, Worker, WorkerError,
    WorkerOutcome, WorkerResult,
};
