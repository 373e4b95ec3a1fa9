//! Structured investigation events for external observers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use vigil_disproof::StrategyKind;
use vigil_investigation::InvestigationStatus;
use vigil_types::{Cost, DisproofOutcome, HypothesisId, InvestigationId, OodaPhase, WorkerId};

/// One event, keyed by the investigation it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvestigationEvent {
    pub investigation_id: InvestigationId,
    pub at: DateTime<Utc>,
    pub kind: EventKind,
}

impl InvestigationEvent {
    pub fn new(investigation_id: InvestigationId, kind: EventKind) -> Self {
        Self {
            investigation_id,
            at: Utc::now(),
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    PhaseStarted {
        phase: OodaPhase,
    },
    PhaseCompleted {
        phase: OodaPhase,
        duration_ms: u64,
        cost: Cost,
    },
    StateTransition {
        from: InvestigationStatus,
        to: InvestigationStatus,
        reason: Option<String>,
    },
    BudgetThresholdCrossed {
        utilization_percent: f64,
        spent: Cost,
        limit: Cost,
    },
    WorkerDegraded {
        worker: WorkerId,
        phase: OodaPhase,
        reason: String,
    },
    HypothesisRejected {
        worker: WorkerId,
        reason: String,
    },
    DisproofOutcome {
        hypothesis: HypothesisId,
        strategy: Option<StrategyKind>,
        outcome: DisproofOutcome,
        confidence: f64,
        cost: Cost,
    },
    BudgetExhausted {
        reason: String,
    },
}

/// Receiver of investigation events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: InvestigationEvent);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn emit(&self, _event: InvestigationEvent) {}
}

/// In-memory event sink for testing and reports
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: RwLock<Vec<InvestigationEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InvestigationEvent> {
        self.events.read().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.read().iter().map(|e| e.kind.clone()).collect()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn emit(&self, event: InvestigationEvent) {
        self.events.write().push(event);
    }
}

/// Fans events out to live subscribers over a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<InvestigationEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvestigationEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventSink for BroadcastEventSink {
    async fn emit(&self, event: InvestigationEvent) {
        // no subscribers is fine
        let _ = self.sender.send(event);
    }
}
