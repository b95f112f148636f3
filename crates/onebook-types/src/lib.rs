//! # onebook-types
//!
//! Shared types, errors, and configuration for the **Onebook** matching engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`UserId`], [`TradeId`], [`Ticker`]
//! - **Instrument model**: [`Instrument`], [`InstrumentKind`]
//! - **User model**: [`User`], [`Role`]
//! - **Order model**: [`Order`], [`OrderSide`], [`OrderKind`], [`OrderStatus`], [`OrderResult`]
//! - **Trade model**: [`Trade`]
//! - **Balance model**: [`BalanceEntry`]
//! - **Book views**: [`BookSnapshot`], [`BookLevel`]
//! - **Configuration**: [`VenueConfig`]
//! - **Errors**: [`OnebookError`] with `OB_ERR_` prefix codes
//! - **Constants**: venue-wide limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod instrument;
pub mod order;
pub mod snapshot;
pub mod trade;
pub mod user;

// Re-export all primary types at crate root for ergonomic imports:
//   use onebook_types::{Order, OrderSide, Trade, BalanceEntry, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use instrument::*;
pub use order::*;
pub use snapshot::*;
pub use trade::*;
pub use user::*;

// Constants are accessed via `onebook_types::constants::FOO`
// (not re-exported to avoid name collisions).
