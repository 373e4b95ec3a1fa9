//! The worker capability.
//!
//! A worker is a domain specialist (application, network, database, ...)
//! that can survey an incident and draft hypotheses. Workers get read-only
//! context and return new values; they never touch the investigation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vigil_types::{Cost, Hypothesis, Incident, InvestigationId, Observation, TimeRange, WorkerId};

/// Errors a worker may report. Always absorbed by the orchestrator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorkerError {
    #[error("worker failed: {0}")]
    Failed(String),

    #[error("worker backend unavailable: {0}")]
    Unavailable(String),
}

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Read-only input to [`Worker::observe`].
#[derive(Clone, Debug)]
pub struct ObserveContext {
    pub investigation_id: InvestigationId,
    pub incident: Incident,
    pub window: TimeRange,
}

/// Read-only input to [`Worker::draft_hypotheses`].
#[derive(Clone, Debug)]
pub struct DraftContext {
    pub investigation_id: InvestigationId,
    pub incident: Incident,
    /// Observations from every worker, not just the drafting one.
    pub observations: Arc<Vec<Observation>>,
}

/// What one worker saw, and what seeing it cost.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObservationBatch {
    pub observations: Vec<Observation>,
    pub cost: Cost,
}

impl ObservationBatch {
    pub fn new(observations: Vec<Observation>, cost: Cost) -> Self {
        Self { observations, cost }
    }
}

/// Hypotheses drafted by one worker, and what drafting cost.
#[derive(Clone, Debug, PartialEq)]
pub struct DraftedHypotheses {
    pub hypotheses: Vec<Hypothesis>,
    pub cost: Cost,
}

impl DraftedHypotheses {
    pub fn new(hypotheses: Vec<Hypothesis>, cost: Cost) -> Self {
        Self { hypotheses, cost }
    }
}

/// A domain specialist taking part in an investigation.
#[async_trait]
pub trait Worker: Send + Sync {
    fn id(&self) -> WorkerId;

    /// Survey the incident window.
    async fn observe(&self, ctx: &ObserveContext) -> WorkerResult<ObservationBatch>;

    /// Draft falsifiable hypotheses from the collected observations. May call
    /// out to a language model.
    async fn draft_hypotheses(&self, ctx: &DraftContext) -> WorkerResult<DraftedHypotheses>;
}

/// How one worker's call went.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkerOutcome {
    Succeeded { worker: WorkerId, produced: usize },
    Failed { worker: WorkerId, error: String },
    TimedOut { worker: WorkerId, after_secs: u64 },
}

impl WorkerOutcome {
    pub fn worker(&self) -> &WorkerId {
        match self {
            Self::Succeeded { worker, .. }
            | Self::Failed { worker, .. }
            | Self::TimedOut { worker, .. } => worker,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Human-readable reason for a degraded outcome.
    pub fn degradation(&self) -> Option<String> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { error, .. } => Some(error.clone()),
            Self::TimedOut { after_secs, .. } => Some(format!("timed out after {after_secs}s")),
        }
    }
}
