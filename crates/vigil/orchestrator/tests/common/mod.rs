//! Shared fakes for orchestrator integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use vigil_disproof::{
    DisproofConfig, DisproofContext, DisproofReport, DisproofResult, DisproofStrategy,
    InMemoryEvidenceSource, MetricSample, StrategyKind, StrategyRegistry,
};
use vigil_orchestrator::{
    CancellationHandle, Decision, DecisionError, DecisionPort, DecisionRequest, DraftContext,
    DraftedHypotheses, ObservationBatch, ObserveContext, OrchestratorConfig, Worker, WorkerError,
    WorkerResult,
};
use vigil_types::{
    metadata_keys, Cost, DisproofAttempt, Hypothesis, HypothesisId, Incident, Observation,
    Severity, WorkerId,
};

pub fn incident_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap()
}

pub fn incident() -> Incident {
    Incident::new("INC-1001", incident_start(), ["checkout", "payments"], Severity::Critical)
}

/// Config with free observing and drafting estimates so budgets only cover
/// what workers and strategies report.
pub fn config() -> OrchestratorConfig {
    OrchestratorConfig {
        estimated_observe_cost: 0.0,
        estimated_draft_cost: 0.0,
        ..OrchestratorConfig::default()
    }
}

pub fn hypothesis(owner: &str, statement: &str, confidence: f64) -> Hypothesis {
    Hypothesis::new(WorkerId::new(owner), statement, confidence).unwrap()
}

/// Threshold claim on `p99_latency_ms`, which the canned source shows
/// spiking to 800 around the incident start.
pub fn latency_claim(owner: &str, confidence: f64, threshold: f64) -> Hypothesis {
    hypothesis(owner, &format!("p99 latency exceeded {threshold}ms"), confidence)
        .with_metadata(metadata_keys::METRIC, "p99_latency_ms")
        .with_metadata(metadata_keys::THRESHOLD, threshold)
}

/// Temporal claim on `lock_waits`, which the canned source shows stepping
/// up ten minutes before the incident.
pub fn lock_claim(owner: &str, confidence: f64) -> Hypothesis {
    hypothesis(owner, "lock contention on orders-db started at 13:50", confidence)
        .with_metadata(metadata_keys::METRIC, "lock_waits")
        .with_metadata(
            metadata_keys::SUSPECTED_TIME,
            (incident_start() - chrono::Duration::minutes(10)).to_rfc3339(),
        )
}

pub fn evidence_source(query_cost: Cost) -> InMemoryEvidenceSource {
    let from = incident_start() - chrono::Duration::minutes(30);
    let minutes = |f: &dyn Fn(i64) -> f64| -> Vec<MetricSample> {
        (0..60)
            .map(|m| MetricSample::new(from + chrono::Duration::minutes(m), f(m)))
            .collect()
    };
    InMemoryEvidenceSource::new()
        .with_series(
            "p99_latency_ms",
            minutes(&|m| if (25..40).contains(&m) { 800.0 } else { 200.0 }),
        )
        .with_series("lock_waits", minutes(&|m| if m < 20 { 10.0 } else { 90.0 }))
        .with_impacted_services(["checkout", "payments"])
        .with_query_cost(query_cost)
}

pub fn registry() -> StrategyRegistry {
    StrategyRegistry::standard(&DisproofConfig::default())
}

// ── Workers ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub enum Behaviour {
    Ok,
    Fail(String),
    Hang,
}

/// Worker returning canned observations and hypotheses.
pub struct ScriptedWorker {
    id: WorkerId,
    observe: Behaviour,
    draft: Behaviour,
    observe_cost: Cost,
    draft_cost: Cost,
    hypotheses: Vec<Hypothesis>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedWorker {
    pub fn new(id: &str) -> Self {
        Self {
            id: WorkerId::new(id),
            observe: Behaviour::Ok,
            draft: Behaviour::Ok,
            observe_cost: Cost::ZERO,
            draft_cost: Cost::ZERO,
            hypotheses: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn observing(mut self, behaviour: Behaviour) -> Self {
        self.observe = behaviour;
        self
    }

    pub fn drafting(mut self, behaviour: Behaviour) -> Self {
        self.draft = behaviour;
        self
    }

    pub fn with_observe_cost(mut self, cost: Cost) -> Self {
        self.observe_cost = cost;
        self
    }

    pub fn with_draft_cost(mut self, cost: Cost) -> Self {
        self.draft_cost = cost;
        self
    }

    pub fn proposing(mut self, hypothesis: Hypothesis) -> Self {
        self.hypotheses.push(hypothesis);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    async fn act(&self, behaviour: &Behaviour) -> WorkerResult<()> {
        match behaviour {
            Behaviour::Ok => Ok(()),
            Behaviour::Fail(msg) => Err(WorkerError::Failed(msg.clone())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(WorkerError::Unavailable("hung".into()))
            }
        }
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn id(&self) -> WorkerId {
        self.id.clone()
    }

    async fn observe(&self, ctx: &ObserveContext) -> WorkerResult<ObservationBatch> {
        self.calls.lock().push("observe");
        self.act(&self.observe).await?;
        let observation = Observation::new(
            self.id.clone(),
            format!("{} anomalies around {}", self.id, ctx.incident.started_at),
            json!({"window_start": ctx.window.start, "window_end": ctx.window.end}),
            0.8,
        );
        Ok(ObservationBatch::new(vec![observation], self.observe_cost))
    }

    async fn draft_hypotheses(&self, _ctx: &DraftContext) -> WorkerResult<DraftedHypotheses> {
        self.calls.lock().push("draft");
        self.act(&self.draft).await?;
        Ok(DraftedHypotheses::new(self.hypotheses.clone(), self.draft_cost))
    }
}

// ── Decisions ───────────────────────────────────────────────────────────

/// Selects a fixed list of ids and records every request it saw.
pub struct FixedDecision {
    ids: Vec<HypothesisId>,
    requests: Mutex<Vec<DecisionRequest>>,
}

impl FixedDecision {
    pub fn new(ids: Vec<HypothesisId>) -> Self {
        Self {
            ids,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<DecisionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl DecisionPort for FixedDecision {
    async fn decide(&self, request: &DecisionRequest) -> Result<Decision, DecisionError> {
        self.requests.lock().push(request.clone());
        Ok(Decision::Selected(self.ids.clone()))
    }
}

pub struct FailingDecision;

#[async_trait]
impl DecisionPort for FailingDecision {
    async fn decide(&self, _request: &DecisionRequest) -> Result<Decision, DecisionError> {
        Err(DecisionError::Failed("chat backend returned 503".into()))
    }
}

// ── Strategies ──────────────────────────────────────────────────────────

/// Strategy that never returns.
pub struct StuckStrategy {
    pub estimate: Cost,
}

#[async_trait]
impl DisproofStrategy for StuckStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ScopeVerification
    }

    fn required_metadata_fields(&self) -> &'static [&'static str] {
        &[metadata_keys::CLAIMED_SCOPE]
    }

    fn estimated_cost(&self, _hypothesis: &Hypothesis) -> Cost {
        self.estimate
    }

    async fn test(
        &self,
        _hypothesis: &Hypothesis,
        _ctx: &DisproofContext<'_>,
    ) -> DisproofResult<DisproofReport> {
        std::future::pending().await
    }
}

/// Scope strategy that cancels the investigation while it runs, then
/// reports the claim as surviving.
pub struct CancellingStrategy {
    pub handle: Arc<CancellationHandle>,
    pub cost: Cost,
}

#[async_trait]
impl DisproofStrategy for CancellingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ScopeVerification
    }

    fn required_metadata_fields(&self) -> &'static [&'static str] {
        &[metadata_keys::CLAIMED_SCOPE]
    }

    fn estimated_cost(&self, _hypothesis: &Hypothesis) -> Cost {
        self.cost
    }

    async fn test(
        &self,
        _hypothesis: &Hypothesis,
        _ctx: &DisproofContext<'_>,
    ) -> DisproofResult<DisproofReport> {
        self.handle.cancel();
        Ok(DisproofReport::new(
            DisproofAttempt::survived(self.name(), "impact matches the claimed scope"),
            Vec::new(),
            self.cost,
        ))
    }
}

pub fn scope_claim(owner: &str, confidence: f64) -> Hypothesis {
    hypothesis(owner, "only checkout and payments are affected", confidence)
        .with_metadata(metadata_keys::CLAIMED_SCOPE, json!(["checkout", "payments"]))
}

pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
