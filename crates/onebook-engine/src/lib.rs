//! # onebook-engine
//!
//! **Matching engine and venue facade for Onebook.**
//!
//! This crate ties the order book and the ledger together into a complete
//! trading venue:
//!
//! - [`InstrumentPipeline`] — the serialized per-instrument command
//!   pipeline: validate, reserve, match at the maker's price in price-time
//!   priority, settle both legs, handle the residual
//! - [`TradeTape`] — append-only per-instrument trade history
//! - [`Venue`] — the thread-safe facade: users, instruments, balances,
//!   order entry, cancellation, market data, and admin cascades
//!
//! Concurrency: one mutex per instrument pipeline plus a shared ledger
//! mutex. Commands on one instrument are linearizable; commands on
//! different instruments run in parallel.

pub mod pipeline;
pub mod tape;
pub mod venue;

pub use pipeline::InstrumentPipeline;
pub use tape::TradeTape;
pub use venue::Venue;
