//! # vigil-budget
//!
//! Per-investigation cost ledger.
//!
//! Every operation that spends money (a language-model draft, a paid
//! observability query) first calls [`BudgetLedger::check_and_reserve`] with
//! its estimate and then settles the returned [`Reservation`] with
//! [`BudgetLedger::commit`] (actual cost) or [`BudgetLedger::release`]
//! (nothing spent). Crossing the limit is always a hard
//! [`BudgetError::Exceeded`]; crossing the warning threshold is reported in
//! the structured [`BudgetCommit`] so the caller can log or emit it.

#![deny(unsafe_code)]

pub mod error;
pub mod ledger;

pub use error::{BudgetError, BudgetResult};
pub use ledger::{BudgetCommit, BudgetLedger, BudgetSnapshot, Reservation, DEFAULT_WARNING_PERCENT};
