//! # onebook-matchcore
//!
//! **Per-instrument price-time order book for Onebook.**
//!
//! The book holds resting limit orders only. It knows nothing about
//! balances or users — funding and settlement live in the engine and
//! ledger. It provides:
//!
//! - **Price-time priority**: `BTreeMap` price levels, FIFO deques within
//!   a level
//! - **O(log n) insert and cancel** via an order-id index
//! - **FIFO front access** for the engine's continuous match loop
//! - **Sweep costing** for market-buy reservation
//! - **Aggregated depth snapshots** as bounded, read-only copies

pub mod book;
pub mod price_level;

pub use book::OrderBook;
pub use price_level::PriceLevel;
