//! The investigation aggregate root.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vigil_budget::{BudgetCommit, BudgetError, BudgetLedger, Reservation};
use vigil_types::{
    Cost, DisproofAttempt, Evidence, Hypothesis, HypothesisId, Incident, InvestigationId,
    Observation, OodaPhase,
};

use crate::error::{StateError, StateResult};
use crate::report::{HypothesisReport, InvestigationReport};
use crate::status::InvestigationStatus;

/// One successful status change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: InvestigationStatus,
    pub to: InvestigationStatus,
    /// Milliseconds since the investigation was created.
    pub elapsed_ms: u64,
    pub at: DateTime<Utc>,
    /// Set for budget aborts, cancellations and reasoned terminal moves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Lifecycle of one incident investigation.
///
/// Owns its observations and hypotheses by value. Workers never see it;
/// the orchestrator folds their results in. The budget ledger is shared
/// (`Arc`) so costed operations running on other tasks charge the same
/// limit.
#[derive(Debug)]
pub struct Investigation {
    id: InvestigationId,
    incident: Incident,
    status: InvestigationStatus,
    budget: Arc<BudgetLedger>,
    observations: Vec<Observation>,
    /// Ranked, best first.
    hypotheses: Vec<Hypothesis>,
    selected: Vec<HypothesisId>,
    transitions: Vec<TransitionRecord>,
    terminal_reason: Option<String>,
    observe_confidence: Option<f64>,
    created_at: DateTime<Utc>,
}

impl Investigation {
    /// New investigation in CREATED with nothing spent.
    pub fn create(incident: Incident, budget_limit: Cost) -> Self {
        Self::with_ledger(incident, Arc::new(BudgetLedger::new(budget_limit)))
    }

    /// New investigation charging an existing ledger.
    pub fn with_ledger(incident: Incident, budget: Arc<BudgetLedger>) -> Self {
        let investigation = Self {
            id: InvestigationId::new(),
            incident,
            status: InvestigationStatus::Created,
            budget,
            observations: Vec::new(),
            hypotheses: Vec::new(),
            selected: Vec::new(),
            transitions: Vec::new(),
            terminal_reason: None,
            observe_confidence: None,
            created_at: Utc::now(),
        };
        debug!(
            investigation = %investigation.id,
            incident = %investigation.incident.id,
            limit = %investigation.budget.limit(),
            "Investigation created"
        );
        investigation
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn id(&self) -> &InvestigationId {
        &self.id
    }

    pub fn incident(&self) -> &Incident {
        &self.incident
    }

    pub fn status(&self) -> InvestigationStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn budget(&self) -> &Arc<BudgetLedger> {
        &self.budget
    }

    pub fn budget_limit(&self) -> Cost {
        self.budget.limit()
    }

    /// Committed spend so far.
    pub fn total_cost(&self) -> Cost {
        self.budget.spent()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Hypotheses in rank order.
    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    pub fn hypothesis(&self, id: &HypothesisId) -> Option<&Hypothesis> {
        self.hypotheses.iter().find(|h| h.id() == id)
    }

    /// Ids chosen in the Decide phase, in rank order.
    pub fn selected(&self) -> &[HypothesisId] {
        &self.selected
    }

    pub fn selected_hypotheses(&self) -> impl Iterator<Item = &Hypothesis> {
        self.selected.iter().filter_map(|id| self.hypothesis(id))
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn terminal_reason(&self) -> Option<&str> {
        self.terminal_reason.as_deref()
    }

    pub fn observe_confidence(&self) -> Option<f64> {
        self.observe_confidence
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Move along a listed edge. Anything else is rejected and leaves the
    /// investigation unchanged.
    pub fn transition_to(&mut self, to: InvestigationStatus) -> StateResult<()> {
        self.apply_transition(to, None)
    }

    /// Like [`transition_to`](Self::transition_to), recording why.
    pub fn transition_with_reason(
        &mut self,
        to: InvestigationStatus,
        reason: impl Into<String>,
    ) -> StateResult<()> {
        self.apply_transition(to, Some(reason.into()))
    }

    /// External cancellation. Committed cost and recorded hypotheses stay.
    pub fn cancel(&mut self, reason: impl Into<String>) -> StateResult<()> {
        self.transition_with_reason(InvestigationStatus::Cancelled, reason)
    }

    /// Forced move to INCONCLUSIVE from any non-terminal state after the
    /// budget refused a charge.
    pub fn abort_on_budget(&mut self, reason: impl Into<String>) -> StateResult<()> {
        let to = InvestigationStatus::Inconclusive;
        if self.status.is_terminal() {
            return Err(StateError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        let reason = reason.into();
        warn!(
            investigation = %self.id,
            from = %self.status,
            reason = %reason,
            "Investigation aborted on budget"
        );
        self.record(to, Some(reason));
        Ok(())
    }

    fn apply_transition(
        &mut self,
        to: InvestigationStatus,
        reason: Option<String>,
    ) -> StateResult<()> {
        if !self.status.can_transition_to(to) {
            warn!(
                investigation = %self.id,
                from = %self.status,
                to = %to,
                "Illegal investigation transition rejected"
            );
            return Err(StateError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        debug!(investigation = %self.id, from = %self.status, to = %to, "Investigation transition");
        self.record(to, reason);
        Ok(())
    }

    fn record(&mut self, to: InvestigationStatus, reason: Option<String>) {
        let at = Utc::now();
        let elapsed_ms = (at - self.created_at).num_milliseconds().max(0) as u64;
        self.transitions.push(TransitionRecord {
            from: self.status,
            to,
            elapsed_ms,
            at,
            reason: reason.clone(),
        });
        if to.is_terminal() {
            self.terminal_reason = reason;
        }
        self.status = to;
    }

    // ── Budget ───────────────────────────────────────────────────────

    /// Charge `amount` against the shared ledger (reserve then commit).
    ///
    /// On rejection nothing is spent and the investigation is forced to
    /// INCONCLUSIVE before the error is returned.
    pub fn add_cost(&mut self, amount: Cost, phase: OodaPhase) -> StateResult<BudgetCommit> {
        let result = self
            .budget
            .check_and_reserve(amount)
            .and_then(|reservation| self.budget.commit(reservation, amount, phase));
        self.settle(result)
    }

    /// Hold `estimated` ahead of a costed operation.
    pub fn reserve(&mut self, estimated: Cost) -> StateResult<Reservation> {
        let result = self.budget.check_and_reserve(estimated);
        self.settle(result)
    }

    /// Settle a hold with the actual cost of the operation.
    pub fn commit(
        &mut self,
        reservation: Reservation,
        actual: Cost,
        phase: OodaPhase,
    ) -> StateResult<BudgetCommit> {
        let result = self.budget.commit(reservation, actual, phase);
        self.settle(result)
    }

    /// Give back a hold whose operation spent nothing.
    pub fn release(&mut self, reservation: Reservation) -> StateResult<()> {
        Ok(self.budget.release(reservation)?)
    }

    fn settle<T>(&mut self, result: Result<T, BudgetError>) -> StateResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                if matches!(err, BudgetError::Exceeded { .. }) && !self.status.is_terminal() {
                    self.abort_on_budget(err.to_string())?;
                }
                Err(StateError::Budget(err))
            }
        }
    }

    // ── Contents ─────────────────────────────────────────────────────

    pub fn record_observations(&mut self, observations: impl IntoIterator<Item = Observation>) {
        self.observations.extend(observations);
    }

    /// Share of workers that contributed during Observe.
    pub fn set_observe_confidence(&mut self, confidence: f64) {
        self.observe_confidence = Some(confidence.clamp(0.0, 1.0));
    }

    /// Replace the hypothesis list with a ranked one. Any previous
    /// selection is cleared.
    pub fn set_ranked_hypotheses(&mut self, ranked: Vec<Hypothesis>) {
        self.hypotheses = ranked;
        self.selected.clear();
    }

    /// Record the Decide phase outcome. Ids are kept in rank order and
    /// must all belong to this investigation.
    pub fn select(&mut self, ids: &[HypothesisId]) -> StateResult<()> {
        if let Some(unknown) = ids.iter().find(|id| self.hypothesis(id).is_none()) {
            return Err(StateError::UnknownHypothesis(unknown.clone()));
        }
        self.selected = self
            .hypotheses
            .iter()
            .map(|h| h.id())
            .filter(|id| ids.contains(id))
            .cloned()
            .collect();
        Ok(())
    }

    pub fn record_evidence(&mut self, id: &HypothesisId, evidence: Evidence) -> StateResult<f64> {
        Ok(self.hypothesis_mut(id)?.add_evidence(evidence))
    }

    pub fn record_disproof_attempt(
        &mut self,
        id: &HypothesisId,
        attempt: DisproofAttempt,
    ) -> StateResult<f64> {
        Ok(self.hypothesis_mut(id)?.record_disproof_attempt(attempt))
    }

    fn hypothesis_mut(&mut self, id: &HypothesisId) -> StateResult<&mut Hypothesis> {
        self.hypotheses
            .iter_mut()
            .find(|h| h.id() == id)
            .ok_or_else(|| StateError::UnknownHypothesis(id.clone()))
    }

    // ── Reporting ────────────────────────────────────────────────────

    pub fn report(&self) -> InvestigationReport {
        let budget = self.budget.snapshot();
        InvestigationReport {
            investigation_id: self.id.clone(),
            incident_id: self.incident.id.clone(),
            status: self.status,
            terminal_reason: self.terminal_reason.clone(),
            budget_limit: budget.limit,
            total_cost: budget.spent,
            phase_costs: budget.by_phase,
            observe_confidence: self.observe_confidence,
            observation_count: self.observations.len(),
            hypotheses: self
                .hypotheses
                .iter()
                .map(|h| HypothesisReport::from_hypothesis(h, self.selected.contains(h.id())))
                .collect(),
            transitions: self.transitions.clone(),
            created_at: self.created_at,
            generated_at: Utc::now(),
        }
    }
}
