use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vigil_types::{Cost, OodaPhase};

use crate::error::{BudgetError, BudgetResult};

/// Default utilization (percent) at which the ledger raises a warning.
pub const DEFAULT_WARNING_PERCENT: f64 = 80.0;

/// Shared running-cost tracker for one investigation.
///
/// The ledger is the only shared mutable state in an investigation. One
/// instance is created per investigation and shared by reference (`Arc`)
/// with every participant, so the limit applies to the investigation as a
/// whole and never per worker.
///
/// Invariants, under any interleaving of callers:
/// - `spent` never decreases
/// - `spent + reserved <= limit`
/// - a rejected request leaves `spent` untouched
#[derive(Debug)]
pub struct BudgetLedger {
    ledger_id: uuid::Uuid,
    limit: Cost,
    warning_percent: f64,
    state: Mutex<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    spent: Cost,
    reserved: Cost,
    outstanding: HashMap<u64, Cost>,
    next_reservation: u64,
    by_phase: BTreeMap<OodaPhase, Cost>,
    warning_signalled: bool,
}

/// A hold on part of the budget, returned by [`BudgetLedger::check_and_reserve`].
///
/// Settle it with [`BudgetLedger::commit`] once the operation's real cost is
/// known, or [`BudgetLedger::release`] if the operation never spent anything.
/// Not `Clone`: a reservation settles exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reservation holds budget until it is committed or released"]
pub struct Reservation {
    ledger_id: uuid::Uuid,
    id: u64,
    amount: Cost,
}

impl Reservation {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn amount(&self) -> Cost {
        self.amount
    }
}

/// Structured result of a successful commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetCommit {
    pub charged: Cost,
    pub spent: Cost,
    pub remaining: Cost,
    pub utilization_percent: f64,
    /// `true` exactly once per ledger: on the commit that first takes
    /// utilization to or past the warning threshold.
    pub warning_crossed: bool,
}

/// Point-in-time view of the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub limit: Cost,
    pub spent: Cost,
    pub reserved: Cost,
    pub remaining: Cost,
    pub utilization_percent: f64,
    pub by_phase: BTreeMap<OodaPhase, Cost>,
}

impl BudgetLedger {
    pub fn new(limit: Cost) -> Self {
        Self::with_warning_threshold(limit, DEFAULT_WARNING_PERCENT)
    }

    /// Ledger with a custom warning threshold, in percent of the limit.
    pub fn with_warning_threshold(limit: Cost, warning_percent: f64) -> Self {
        let warning_percent = if warning_percent.is_finite() {
            warning_percent.clamp(0.0, 100.0)
        } else {
            DEFAULT_WARNING_PERCENT
        };
        Self {
            ledger_id: uuid::Uuid::new_v4(),
            limit,
            warning_percent,
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn limit(&self) -> Cost {
        self.limit
    }

    pub fn spent(&self) -> Cost {
        self.state.lock().spent
    }

    pub fn reserved(&self) -> Cost {
        self.state.lock().reserved
    }

    /// Budget neither spent nor held by outstanding reservations.
    pub fn remaining(&self) -> Cost {
        let state = self.state.lock();
        self.limit
            .saturating_sub(state.spent)
            .saturating_sub(state.reserved)
    }

    /// Committed spend as a percentage of the limit.
    pub fn utilization_percent(&self) -> f64 {
        self.state.lock().spent.percent_of(self.limit)
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Hold `estimated` against the limit before a costed operation.
    ///
    /// Rejects with [`BudgetError::Exceeded`] when
    /// `spent + reserved + estimated > limit`, without mutating anything.
    pub fn check_and_reserve(&self, estimated: Cost) -> BudgetResult<Reservation> {
        let mut state = self.state.lock();
        let projected = state
            .spent
            .checked_add(state.reserved)
            .and_then(|c| c.checked_add(estimated));

        match projected {
            Some(projected) if projected <= self.limit => {}
            _ => {
                warn!(
                    requested = %estimated,
                    spent = %state.spent,
                    reserved = %state.reserved,
                    limit = %self.limit,
                    "Budget reservation rejected"
                );
                return Err(BudgetError::Exceeded {
                    requested: estimated,
                    spent: state.spent,
                    reserved: state.reserved,
                    limit: self.limit,
                });
            }
        }

        let id = state.next_reservation;
        state.next_reservation += 1;
        state.reserved += estimated;
        state.outstanding.insert(id, estimated);

        debug!(
            reservation = id,
            amount = %estimated,
            remaining = %self.limit.saturating_sub(state.spent).saturating_sub(state.reserved),
            "Budget reserved"
        );

        Ok(Reservation {
            ledger_id: self.ledger_id,
            id,
            amount: estimated,
        })
    }

    /// Settle a reservation with the operation's actual cost.
    ///
    /// The hold is released either way. If `actual` would take
    /// `spent + other reservations` past the limit the charge is rejected
    /// and `spent` is left unchanged.
    pub fn commit(
        &self,
        reservation: Reservation,
        actual: Cost,
        phase: OodaPhase,
    ) -> BudgetResult<BudgetCommit> {
        let mut state = self.state.lock();
        Self::take_hold(&mut state, self.ledger_id, &reservation)?;

        let projected = state
            .spent
            .checked_add(state.reserved)
            .and_then(|c| c.checked_add(actual));
        match projected {
            Some(projected) if projected <= self.limit => {}
            _ => {
                warn!(
                    reservation = reservation.id,
                    estimated = %reservation.amount,
                    actual = %actual,
                    spent = %state.spent,
                    limit = %self.limit,
                    "Budget commit rejected: actual cost overruns limit"
                );
                return Err(BudgetError::Exceeded {
                    requested: actual,
                    spent: state.spent,
                    reserved: state.reserved,
                    limit: self.limit,
                });
            }
        }

        state.spent += actual;
        *state.by_phase.entry(phase).or_insert(Cost::ZERO) += actual;

        let utilization_percent = state.spent.percent_of(self.limit);
        let warning_crossed =
            !state.warning_signalled && utilization_percent >= self.warning_percent;
        if warning_crossed {
            state.warning_signalled = true;
        }

        debug!(
            reservation = reservation.id,
            phase = %phase,
            charged = %actual,
            spent = %state.spent,
            utilization = utilization_percent,
            "Budget committed"
        );

        Ok(BudgetCommit {
            charged: actual,
            spent: state.spent,
            remaining: self.limit.saturating_sub(state.spent).saturating_sub(state.reserved),
            utilization_percent,
            warning_crossed,
        })
    }

    /// Give a reservation back unspent.
    pub fn release(&self, reservation: Reservation) -> BudgetResult<()> {
        let mut state = self.state.lock();
        Self::take_hold(&mut state, self.ledger_id, &reservation)?;
        debug!(
            reservation = reservation.id,
            amount = %reservation.amount,
            "Budget reservation released"
        );
        Ok(())
    }

    /// Reserve and immediately commit `amount`.
    pub fn charge(&self, amount: Cost, phase: OodaPhase) -> BudgetResult<BudgetCommit> {
        let reservation = self.check_and_reserve(amount)?;
        self.commit(reservation, amount, phase)
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        let state = self.state.lock();
        BudgetSnapshot {
            limit: self.limit,
            spent: state.spent,
            reserved: state.reserved,
            remaining: self.limit.saturating_sub(state.spent).saturating_sub(state.reserved),
            utilization_percent: state.spent.percent_of(self.limit),
            by_phase: state.by_phase.clone(),
        }
    }

    fn take_hold(
        state: &mut LedgerState,
        ledger_id: uuid::Uuid,
        reservation: &Reservation,
    ) -> BudgetResult<()> {
        if reservation.ledger_id != ledger_id {
            return Err(BudgetError::UnknownReservation(reservation.id));
        }
        let held = state
            .outstanding
            .remove(&reservation.id)
            .ok_or(BudgetError::UnknownReservation(reservation.id))?;
        state.reserved = state.reserved.saturating_sub(held);
        Ok(())
    }
}
