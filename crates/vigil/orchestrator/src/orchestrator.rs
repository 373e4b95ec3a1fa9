//! The OODA orchestrator.
//!
//! ```text
//!   observe ──► generate_hypotheses ──► decide ──► test_hypotheses
//!   (fan-out,     (draft, validate,      (port)     (preflight, reserve,
//!    timeouts)     rank, dedup)            │          test, commit)
//!                                          └─► AWAITING_HUMAN ─► resume
//! ```
//!
//! Each phase takes the investigation by `&mut` so the caller keeps it,
//! with its status already updated, even when a phase returns an error.
//! Cancellation is checked at every phase boundary and before each
//! hypothesis test.

use std::sync::Arc;

use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use vigil_budget::{BudgetCommit, BudgetLedger};
use vigil_disproof::{DisproofContext, DisproofError, EvidenceSource, StrategyRegistry};
use vigil_investigation::{Investigation, InvestigationStatus, StateError};
use vigil_types::{
    Cost, DisproofAttempt, DisproofOutcome, Hypothesis, HypothesisId, Incident, Observation,
    OodaPhase, WorkerId,
};

use crate::cancel::CancellationSignal;
use crate::config::{BudgetConfig, DuplicatePolicy, OrchestratorConfig, VigilConfig};
use crate::decision::{detect_conflicts, Decision, DecisionPort, DecisionRequest};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::events::{EventKind, EventSink, InvestigationEvent, NoopEventSink};
use crate::worker::{DraftContext, ObserveContext, Worker, WorkerOutcome};

/// Result of the Observe phase.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObserveOutcome {
    pub observations: Vec<Observation>,
    /// `successful workers / total workers`.
    pub confidence: f64,
    /// One entry per worker, in declaration order.
    pub workers: Vec<WorkerOutcome>,
}

impl ObserveOutcome {
    pub fn successful_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.is_success()).count()
    }
}

/// Result of the Decide phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecideOutcome {
    /// The investigation is VALIDATING these, in rank order.
    Selected(Vec<HypothesisId>),
    /// The investigation waits in AWAITING_HUMAN.
    AwaitingHuman { reason: String },
    Cancelled,
}

struct PhaseTimer {
    phase: OodaPhase,
    started: Instant,
    spent_before: Cost,
}

/// Drives one investigation through Observe, Orient, Decide and Act.
pub struct Orchestrator {
    config: OrchestratorConfig,
    budget: BudgetConfig,
    workers: Vec<Arc<dyn Worker>>,
    registry: StrategyRegistry,
    evidence: Arc<dyn EvidenceSource>,
    events: Arc<dyn EventSink>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        registry: StrategyRegistry,
        evidence: Arc<dyn EvidenceSource>,
    ) -> Self {
        Self {
            config,
            budget: BudgetConfig::default(),
            workers: Vec::new(),
            registry,
            evidence,
            events: Arc::new(NoopEventSink),
        }
    }

    /// Orchestrator with the built-in strategies configured from `config`.
    pub fn from_config(config: &VigilConfig, evidence: Arc<dyn EvidenceSource>) -> Self {
        let mut orchestrator = Self::new(
            config.orchestrator.clone(),
            StrategyRegistry::standard(&config.disproof),
            evidence,
        );
        orchestrator.budget = config.budget.clone();
        orchestrator
    }

    /// Add a worker. Declaration order breaks ranking ties.
    pub fn with_worker(mut self, worker: Arc<dyn Worker>) -> Self {
        self.workers.push(worker);
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn workers(&self) -> &[Arc<dyn Worker>] {
        &self.workers
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// New investigation with a ledger using the configured warning threshold.
    pub fn start(&self, incident: Incident, budget_limit: Cost) -> Investigation {
        let ledger = BudgetLedger::with_warning_threshold(budget_limit, self.budget.warning_percent);
        Investigation::with_ledger(incident, Arc::new(ledger))
    }

    // ── Full runs ────────────────────────────────────────────────────

    /// Run every phase from CREATED. Returns the status the investigation
    /// stopped in: terminal, or AWAITING_HUMAN.
    #[instrument(skip_all, fields(investigation = %inv.id()))]
    pub async fn run(
        &self,
        inv: &mut Investigation,
        decision: &dyn DecisionPort,
        cancel: &CancellationSignal,
    ) -> OrchestratorResult<InvestigationStatus> {
        self.observe(inv, cancel).await?;
        if inv.is_terminal() {
            return Ok(inv.status());
        }
        self.generate_hypotheses(inv, cancel).await?;
        if inv.is_terminal() {
            return Ok(inv.status());
        }
        self.decide_and_test(inv, decision, cancel).await
    }

    /// Continue an investigation parked in AWAITING_HUMAN.
    #[instrument(skip_all, fields(investigation = %inv.id()))]
    pub async fn resume(
        &self,
        inv: &mut Investigation,
        decision: &dyn DecisionPort,
        cancel: &CancellationSignal,
    ) -> OrchestratorResult<InvestigationStatus> {
        if inv.status() != InvestigationStatus::AwaitingHuman {
            return Err(OrchestratorError::WrongPhase {
                phase: "resume",
                status: inv.status(),
            });
        }
        info!(investigation = %inv.id(), "Resuming investigation");
        self.decide_and_test(inv, decision, cancel).await
    }

    async fn decide_and_test(
        &self,
        inv: &mut Investigation,
        decision: &dyn DecisionPort,
        cancel: &CancellationSignal,
    ) -> OrchestratorResult<InvestigationStatus> {
        match self.decide(inv, decision, cancel).await? {
            DecideOutcome::Selected(_) => self.test_hypotheses(inv, cancel).await,
            DecideOutcome::AwaitingHuman { .. } | DecideOutcome::Cancelled => Ok(inv.status()),
        }
    }

    // ── Observe ──────────────────────────────────────────────────────

    /// Ask every worker to survey the incident window.
    ///
    /// Each worker's estimated cost is reserved before any worker runs. A
    /// worker that errors or times out contributes nothing, pays its
    /// estimate and is logged; the rest carry on.
    #[instrument(skip_all, fields(investigation = %inv.id()))]
    pub async fn observe(
        &self,
        inv: &mut Investigation,
        cancel: &CancellationSignal,
    ) -> OrchestratorResult<ObserveOutcome> {
        self.expect_status(inv, "observe", &[InvestigationStatus::Created])?;
        if self.cancelled(inv, cancel, "before observe").await? {
            return Ok(ObserveOutcome::default());
        }
        self.transition(inv, InvestigationStatus::Observing, None).await?;
        let timer = self.begin_phase(inv, OodaPhase::Observe).await;

        let lookback = self.config.observation_lookback();
        let ctx = ObserveContext {
            investigation_id: inv.id().clone(),
            incident: inv.incident().clone(),
            window: inv.incident().observation_window(lookback, lookback),
        };
        let phase_status = InvestigationStatus::Observing;
        let estimate = self.config.estimated_observe_cost();
        let mut reservations = Vec::with_capacity(self.workers.len());
        for _ in &self.workers {
            match inv.reserve(estimate) {
                Ok(reservation) => reservations.push(reservation),
                Err(err) => {
                    for reservation in reservations {
                        let _ = inv.release(reservation);
                    }
                    return Err(self.fail(inv, phase_status, err).await);
                }
            }
        }

        let timeout = self.config.worker_timeout();
        let ctx_ref = &ctx;
        let results: Vec<_> = stream::iter(self.workers.iter())
            .map(|worker| async move {
                let id = worker.id();
                (id, tokio::time::timeout(timeout, worker.observe(ctx_ref)).await)
            })
            .buffered(self.config.observe_concurrency.max(1))
            .collect()
            .await;

        // every worker has already run, so each result is recorded and
        // settled even after the ledger refuses one of them
        let mut outcome = ObserveOutcome::default();
        let mut overrun = None;
        for ((worker, result), reservation) in results.into_iter().zip(reservations) {
            let actual = match &result {
                Ok(Ok(batch)) => batch.cost,
                // failed calls may still have been billed
                _ => estimate,
            };
            if overrun.is_some() {
                let _ = inv.release(reservation);
            } else {
                match inv.commit(reservation, actual, OodaPhase::Observe) {
                    Ok(commit) => self.note_commit(inv, &commit).await,
                    Err(err) => overrun = Some(err),
                }
            }
            let worker_outcome = match result {
                Ok(Ok(batch)) => {
                    debug!(
                        worker = %worker,
                        observations = batch.observations.len(),
                        cost = %batch.cost,
                        "Worker observed"
                    );
                    let produced = batch.observations.len();
                    inv.record_observations(batch.observations.iter().cloned());
                    outcome.observations.extend(batch.observations);
                    WorkerOutcome::Succeeded { worker, produced }
                }
                Ok(Err(err)) => WorkerOutcome::Failed {
                    worker,
                    error: err.to_string(),
                },
                Err(_) => WorkerOutcome::TimedOut {
                    worker,
                    after_secs: timeout.as_secs(),
                },
            };
            if let Some(reason) = worker_outcome.degradation() {
                self.degraded(inv, worker_outcome.worker().clone(), OodaPhase::Observe, reason)
                    .await;
            }
            outcome.workers.push(worker_outcome);
        }

        outcome.confidence = if outcome.workers.is_empty() {
            0.0
        } else {
            outcome.successful_workers() as f64 / outcome.workers.len() as f64
        };
        inv.set_observe_confidence(outcome.confidence);
        if let Some(err) = overrun {
            return Err(self.fail(inv, phase_status, err).await);
        }

        info!(
            investigation = %inv.id(),
            workers = outcome.workers.len(),
            succeeded = outcome.successful_workers(),
            observations = outcome.observations.len(),
            confidence = outcome.confidence,
            "Observe phase complete"
        );
        self.end_phase(inv, timer).await;
        Ok(outcome)
    }

    // ── Orient ───────────────────────────────────────────────────────

    /// Have every worker draft hypotheses, validate them and rank them by
    /// initial confidence (ties keep worker declaration order).
    #[instrument(skip_all, fields(investigation = %inv.id()))]
    pub async fn generate_hypotheses(
        &self,
        inv: &mut Investigation,
        cancel: &CancellationSignal,
    ) -> OrchestratorResult<Vec<Hypothesis>> {
        self.expect_status(inv, "generate_hypotheses", &[InvestigationStatus::Observing])?;
        if self.cancelled(inv, cancel, "before orient").await? {
            return Ok(Vec::new());
        }
        let phase_status = InvestigationStatus::HypothesisGeneration;
        self.transition(inv, phase_status, None).await?;
        let timer = self.begin_phase(inv, OodaPhase::Orient).await;

        let estimate = self.config.estimated_draft_cost();
        let mut reservations = Vec::with_capacity(self.workers.len());
        for _ in &self.workers {
            match inv.reserve(estimate) {
                Ok(reservation) => reservations.push(reservation),
                Err(err) => {
                    for reservation in reservations {
                        let _ = inv.release(reservation);
                    }
                    return Err(self.fail(inv, phase_status, err).await);
                }
            }
        }

        let ctx = DraftContext {
            investigation_id: inv.id().clone(),
            incident: inv.incident().clone(),
            observations: Arc::new(inv.observations().to_vec()),
        };
        let timeout = self.config.draft_timeout();
        let ctx_ref = &ctx;
        let drafts: Vec<_> = stream::iter(self.workers.iter())
            .map(|worker| async move {
                let id = worker.id();
                (id, tokio::time::timeout(timeout, worker.draft_hypotheses(ctx_ref)).await)
            })
            .buffered(self.config.observe_concurrency.max(1))
            .collect()
            .await;

        let mut candidates = Vec::new();
        let mut pending = reservations.into_iter();
        for (worker, result) in drafts {
            let Some(reservation) = pending.next() else {
                break;
            };
            // failed drafts may still have been billed, so they pay the estimate
            let (actual, drafted) = match result {
                Ok(Ok(drafted)) => (drafted.cost, drafted.hypotheses),
                Ok(Err(err)) => {
                    self.degraded(inv, worker.clone(), OodaPhase::Orient, err.to_string()).await;
                    (estimate, Vec::new())
                }
                Err(_) => {
                    let reason = format!("timed out after {}s", timeout.as_secs());
                    self.degraded(inv, worker.clone(), OodaPhase::Orient, reason).await;
                    (estimate, Vec::new())
                }
            };
            match inv.commit(reservation, actual, OodaPhase::Orient) {
                Ok(commit) => self.note_commit(inv, &commit).await,
                Err(err) => {
                    for reservation in pending {
                        let _ = inv.release(reservation);
                    }
                    return Err(self.fail(inv, phase_status, err).await);
                }
            }
            for hypothesis in drafted {
                match self.validate(hypothesis) {
                    Ok(hypothesis) => candidates.push(hypothesis),
                    Err(reason) => self.rejected(inv, worker.clone(), reason).await,
                }
            }
        }

        candidates.sort_by(|a, b| b.initial_confidence().total_cmp(&a.initial_confidence()));
        let ranked = match self.config.duplicate_policy {
            DuplicatePolicy::TestIndependently => candidates,
            DuplicatePolicy::CollapseExact => self.collapse_duplicates(inv, candidates).await,
        };

        info!(
            investigation = %inv.id(),
            hypotheses = ranked.len(),
            top_confidence = ranked.first().map(|h| h.initial_confidence()),
            "Orient phase complete"
        );
        inv.set_ranked_hypotheses(ranked.clone());
        self.end_phase(inv, timer).await;
        Ok(ranked)
    }

    fn validate(&self, mut hypothesis: Hypothesis) -> Result<Hypothesis, String> {
        if hypothesis.statement().trim().is_empty() {
            return Err("empty statement".into());
        }
        let confidence = hypothesis.initial_confidence();
        if !(0.0..=1.0).contains(&confidence) {
            return Err(format!("initial confidence {confidence} outside [0, 1]"));
        }
        let stripped = hypothesis.strip_empty_metadata();
        if !stripped.is_empty() {
            debug!(
                hypothesis = %hypothesis.id(),
                keys = ?stripped,
                "Dropped empty metadata"
            );
        }
        if let Err(DisproofError::MissingMetadata { strategy, missing }) =
            self.registry.preflight(&hypothesis)
        {
            warn!(
                hypothesis = %hypothesis.id(),
                strategy = %strategy,
                missing = ?missing,
                "Hypothesis cannot be tested as drafted"
            );
        }
        Ok(hypothesis)
    }

    async fn collapse_duplicates(
        &self,
        inv: &Investigation,
        ranked: Vec<Hypothesis>,
    ) -> Vec<Hypothesis> {
        let mut kept: Vec<Hypothesis> = Vec::with_capacity(ranked.len());
        for hypothesis in ranked {
            let duplicate_of = kept
                .iter()
                .find(|k| same_content(k, &hypothesis))
                .map(|k| k.id().clone());
            match duplicate_of {
                Some(original) => {
                    let reason = format!("duplicate of {original}");
                    self.rejected(inv, hypothesis.owner().clone(), reason).await;
                }
                None => kept.push(hypothesis),
            }
        }
        kept
    }

    // ── Decide ───────────────────────────────────────────────────────

    /// Ask the decision port which ranked hypotheses to test.
    ///
    /// An unavailable port, a port error or a timeout parks the
    /// investigation in AWAITING_HUMAN.
    #[instrument(skip_all, fields(investigation = %inv.id()))]
    pub async fn decide(
        &self,
        inv: &mut Investigation,
        decision: &dyn DecisionPort,
        cancel: &CancellationSignal,
    ) -> OrchestratorResult<DecideOutcome> {
        self.expect_status(
            inv,
            "decide",
            &[InvestigationStatus::HypothesisGeneration, InvestigationStatus::AwaitingHuman],
        )?;
        if self.cancelled(inv, cancel, "before decide").await? {
            return Ok(DecideOutcome::Cancelled);
        }
        let timer = self.begin_phase(inv, OodaPhase::Decide).await;
        if inv.status() == InvestigationStatus::HypothesisGeneration {
            self.transition(inv, InvestigationStatus::AwaitingHuman, None).await?;
        }

        let ranked = inv.hypotheses().to_vec();
        let conflicts = detect_conflicts(&ranked);
        if !conflicts.is_empty() {
            debug!(investigation = %inv.id(), conflicts = conflicts.len(), "Conflicting hypotheses");
        }
        let request = DecisionRequest {
            investigation_id: inv.id().clone(),
            incident: inv.incident().clone(),
            ranked,
            conflicts,
            max_selections: self.config.max_selected_hypotheses,
        };

        let timeout = self.config.decision_timeout();
        let decision = match tokio::time::timeout(timeout, decision.decide(&request)).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(err)) => Decision::Unavailable(err.to_string()),
            Err(_) => Decision::Unavailable(format!("decision timed out after {}s", timeout.as_secs())),
        };

        let outcome = match decision {
            Decision::Unavailable(reason) => {
                info!(investigation = %inv.id(), reason = %reason, "Awaiting human decision");
                DecideOutcome::AwaitingHuman { reason }
            }
            Decision::Selected(ids) => {
                let unknown: Vec<_> = ids.iter().filter(|id| inv.hypothesis(id).is_none()).collect();
                if !unknown.is_empty() {
                    warn!(investigation = %inv.id(), unknown = ?unknown, "Decision named unknown hypotheses");
                }
                let chosen: Vec<HypothesisId> = inv
                    .hypotheses()
                    .iter()
                    .map(|h| h.id())
                    .filter(|id| ids.contains(id))
                    .take(self.config.max_selected_hypotheses)
                    .cloned()
                    .collect();
                inv.select(&chosen)?;
                self.transition(inv, InvestigationStatus::Validating, None).await?;
                info!(investigation = %inv.id(), selected = chosen.len(), "Hypotheses selected");
                DecideOutcome::Selected(chosen)
            }
        };
        self.end_phase(inv, timer).await;
        Ok(outcome)
    }

    // ── Act ──────────────────────────────────────────────────────────

    /// Try to disprove each selected hypothesis in rank order, then settle
    /// the investigation as RESOLVED or INCONCLUSIVE.
    ///
    /// Strategy errors, timeouts and missing metadata become INCONCLUSIVE
    /// attempts. A refused reservation stops testing and ends the
    /// investigation as INCONCLUSIVE.
    #[instrument(skip_all, fields(investigation = %inv.id()))]
    pub async fn test_hypotheses(
        &self,
        inv: &mut Investigation,
        cancel: &CancellationSignal,
    ) -> OrchestratorResult<InvestigationStatus> {
        self.expect_status(inv, "test_hypotheses", &[InvestigationStatus::Validating])?;
        let timer = self.begin_phase(inv, OodaPhase::Act).await;

        let selected = inv.selected().to_vec();
        if selected.is_empty() {
            self.transition(
                inv,
                InvestigationStatus::Inconclusive,
                Some("no hypotheses selected".into()),
            )
            .await?;
            self.end_phase(inv, timer).await;
            return Ok(inv.status());
        }

        let incident = inv.incident().clone();
        let ctx = DisproofContext {
            incident: &incident,
            source: Arc::clone(&self.evidence),
        };
        for id in &selected {
            if self.cancelled(inv, cancel, "before hypothesis test").await? {
                self.end_phase(inv, timer).await;
                return Ok(inv.status());
            }
            let hypothesis = inv
                .hypothesis(id)
                .cloned()
                .ok_or_else(|| OrchestratorError::UnknownHypothesis(id.clone()))?;
            self.test_one(inv, &hypothesis, &ctx).await?;
        }

        let status = self.conclude(inv).await?;
        self.end_phase(inv, timer).await;
        Ok(status)
    }

    async fn test_one(
        &self,
        inv: &mut Investigation,
        hypothesis: &Hypothesis,
        ctx: &DisproofContext<'_>,
    ) -> OrchestratorResult<()> {
        let id = hypothesis.id();
        let strategy = match self.registry.preflight(hypothesis) {
            Ok(strategy) => strategy,
            Err(err) => {
                let (kind, reasoning) = match &err {
                    DisproofError::MissingMetadata { strategy, missing } => (
                        Some(*strategy),
                        format!("required metadata missing: {}", missing.join(", ")),
                    ),
                    DisproofError::StrategyNotRegistered(kind) => (Some(*kind), err.to_string()),
                    other => (None, other.to_string()),
                };
                warn!(hypothesis = %id, reason = %reasoning, "Skipping strategy execution");
                let name = kind.map_or("preflight", |k| k.name());
                let confidence =
                    inv.record_disproof_attempt(id, DisproofAttempt::inconclusive(name, reasoning))?;
                self.emit(
                    inv,
                    EventKind::DisproofOutcome {
                        hypothesis: id.clone(),
                        strategy: kind,
                        outcome: DisproofOutcome::Inconclusive,
                        confidence,
                        cost: Cost::ZERO,
                    },
                )
                .await;
                return Ok(());
            }
        };

        let kind = strategy.kind();
        let estimate = strategy.estimated_cost(hypothesis);
        let reservation = match inv.reserve(estimate) {
            Ok(reservation) => reservation,
            Err(err) => return Err(self.fail(inv, InvestigationStatus::Validating, err).await),
        };

        let timeout = self.config.strategy_timeout();
        // the strategy's own evidence rides on the attempt and is not
        // recorded separately, so one run revises confidence once
        let (attempt, actual) =
            match tokio::time::timeout(timeout, strategy.test(hypothesis, ctx)).await {
                Ok(Ok(report)) => (report.attempt, report.cost),
                Ok(Err(err)) => {
                    warn!(hypothesis = %id, strategy = %kind, error = %err, "Strategy failed");
                    let attempt =
                        DisproofAttempt::inconclusive(kind.name(), format!("strategy error: {err}"));
                    (attempt, estimate)
                }
                Err(_) => {
                    warn!(hypothesis = %id, strategy = %kind, "Strategy timed out");
                    let attempt = DisproofAttempt::inconclusive(
                        kind.name(),
                        format!("strategy timed out after {}s", timeout.as_secs()),
                    );
                    (attempt, estimate)
                }
            };

        let outcome = attempt.outcome;
        let confidence = inv.record_disproof_attempt(id, attempt)?;
        debug!(
            hypothesis = %id,
            strategy = %kind,
            outcome = ?outcome,
            confidence,
            cost = %actual,
            "Disproof attempt recorded"
        );
        self.emit(
            inv,
            EventKind::DisproofOutcome {
                hypothesis: id.clone(),
                strategy: Some(kind),
                outcome,
                confidence,
                cost: actual,
            },
        )
        .await;

        match inv.commit(reservation, actual, OodaPhase::Act) {
            Ok(commit) => {
                self.note_commit(inv, &commit).await;
                Ok(())
            }
            Err(err) => Err(self.fail(inv, InvestigationStatus::Validating, err).await),
        }
    }

    async fn conclude(&self, inv: &mut Investigation) -> OrchestratorResult<InvestigationStatus> {
        let threshold = self.config.resolution_threshold;
        let mut best: Option<&Hypothesis> = None;
        for hypothesis in inv.selected_hypotheses() {
            if !hypothesis.withstood_disproof() || hypothesis.current_confidence() < threshold {
                continue;
            }
            if best.map_or(true, |b| hypothesis.current_confidence() > b.current_confidence()) {
                best = Some(hypothesis);
            }
        }

        let (to, reason) = match best {
            Some(h) => (
                InvestigationStatus::Resolved,
                format!(
                    "{} survived disproof at confidence {:.3}: {}",
                    h.id(),
                    h.current_confidence(),
                    h.statement()
                ),
            ),
            None => (
                InvestigationStatus::Inconclusive,
                format!(
                    "no selected hypothesis survived disproof with confidence {threshold:.2} or more"
                ),
            ),
        };
        self.transition(inv, to, Some(reason)).await?;
        info!(investigation = %inv.id(), status = %to, cost = %inv.total_cost(), "Investigation concluded");
        Ok(to)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn expect_status(
        &self,
        inv: &Investigation,
        phase: &'static str,
        allowed: &[InvestigationStatus],
    ) -> OrchestratorResult<()> {
        if allowed.contains(&inv.status()) {
            Ok(())
        } else {
            Err(OrchestratorError::WrongPhase {
                phase,
                status: inv.status(),
            })
        }
    }

    async fn emit(&self, inv: &Investigation, kind: EventKind) {
        self.events
            .emit(InvestigationEvent::new(inv.id().clone(), kind))
            .await;
    }

    async fn transition(
        &self,
        inv: &mut Investigation,
        to: InvestigationStatus,
        reason: Option<String>,
    ) -> OrchestratorResult<()> {
        let from = inv.status();
        match &reason {
            Some(reason) => inv.transition_with_reason(to, reason.clone())?,
            None => inv.transition_to(to)?,
        }
        self.emit(inv, EventKind::StateTransition { from, to, reason }).await;
        Ok(())
    }

    /// Cancel `inv` if cancellation was requested. Returns whether the
    /// caller should stop.
    async fn cancelled(
        &self,
        inv: &mut Investigation,
        cancel: &CancellationSignal,
        at: &str,
    ) -> OrchestratorResult<bool> {
        if !cancel.is_cancelled() {
            return Ok(false);
        }
        if inv.is_terminal() {
            return Ok(true);
        }
        info!(investigation = %inv.id(), at, "Investigation cancelled");
        self.transition(inv, InvestigationStatus::Cancelled, Some(format!("cancelled {at}")))
            .await?;
        Ok(true)
    }

    /// Report a failed budget-checked call and convert the error.
    async fn fail(
        &self,
        inv: &Investigation,
        from: InvestigationStatus,
        err: StateError,
    ) -> OrchestratorError {
        if err.is_budget_exceeded() {
            let reason = err.to_string();
            self.emit(inv, EventKind::BudgetExhausted { reason: reason.clone() })
                .await;
            if inv.status() != from {
                self.emit(
                    inv,
                    EventKind::StateTransition {
                        from,
                        to: inv.status(),
                        reason: Some(reason),
                    },
                )
                .await;
            }
        }
        err.into()
    }

    async fn note_commit(&self, inv: &Investigation, commit: &BudgetCommit) {
        if commit.warning_crossed {
            warn!(
                investigation = %inv.id(),
                utilization = commit.utilization_percent,
                spent = %commit.spent,
                "Budget warning threshold crossed"
            );
            self.emit(
                inv,
                EventKind::BudgetThresholdCrossed {
                    utilization_percent: commit.utilization_percent,
                    spent: commit.spent,
                    limit: inv.budget_limit(),
                },
            )
            .await;
        }
    }

    async fn degraded(&self, inv: &Investigation, worker: WorkerId, phase: OodaPhase, reason: String) {
        warn!(investigation = %inv.id(), worker = %worker, phase = %phase, reason = %reason, "Worker degraded");
        self.emit(inv, EventKind::WorkerDegraded { worker, phase, reason })
            .await;
    }

    async fn rejected(&self, inv: &Investigation, worker: WorkerId, reason: String) {
        warn!(investigation = %inv.id(), worker = %worker, reason = %reason, "Hypothesis rejected");
        self.emit(inv, EventKind::HypothesisRejected { worker, reason })
            .await;
    }

    async fn begin_phase(&self, inv: &Investigation, phase: OodaPhase) -> PhaseTimer {
        self.emit(inv, EventKind::PhaseStarted { phase }).await;
        PhaseTimer {
            phase,
            started: Instant::now(),
            spent_before: phase_spend(inv, phase),
        }
    }

    async fn end_phase(&self, inv: &Investigation, timer: PhaseTimer) {
        let cost = phase_spend(inv, timer.phase).saturating_sub(timer.spent_before);
        let duration_ms = timer.started.elapsed().as_millis() as u64;
        self.emit(
            inv,
            EventKind::PhaseCompleted {
                phase: timer.phase,
                duration_ms,
                cost,
            },
        )
        .await;
    }
}

fn phase_spend(inv: &Investigation, phase: OodaPhase) -> Cost {
    inv.budget()
        .snapshot()
        .by_phase
        .get(&phase)
        .copied()
        .unwrap_or(Cost::ZERO)
}

/// Same claim: statements equal after case and whitespace folding, and
/// identical metadata.
fn same_content(a: &Hypothesis, b: &Hypothesis) -> bool {
    normalise(a.statement()) == normalise(b.statement()) && a.metadata() == b.metadata()
}

fn normalise(statement: &str) -> String {
    statement
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
