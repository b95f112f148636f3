//! # onebook-ledger
//!
//! **Balance ledger for the Onebook matching engine.**
//!
//! The ledger is the source of truth for all balance state. It tracks
//! per-(user, instrument) available/reserved amounts and exposes the
//! atomic operations the engine composes trades from:
//!
//! - `deposit` / `withdraw` — admin-initiated supply changes
//! - `reserve` — available → reserved, when an order is accepted
//! - `release` — reserved → available, on cancel or over-reservation
//! - `settle` — one user's reserved → another user's available
//!
//! Every supply change is recorded by the [`Conservation`] auditor, so
//! that Σ(available + reserved) per asset can be verified against
//! deposits − withdrawals at any point.

pub mod conservation;
pub mod ledger;

pub use conservation::Conservation;
pub use ledger::Ledger;
