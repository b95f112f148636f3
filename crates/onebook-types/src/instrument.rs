//! Tradable instrument definitions.
//!
//! Every instrument trades against the venue's configured quote asset.
//! The quote asset itself is registered as an instrument so balances in it
//! are ordinary ledger entries.

use serde::{Deserialize, Serialize};

use crate::Ticker;

/// Broad instrument classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    Currency,
    Stock,
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Currency => write!(f, "CURRENCY"),
            Self::Stock => write!(f, "STOCK"),
        }
    }
}

/// A tradable instrument, keyed by its [`Ticker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub ticker: Ticker,
    pub kind: InstrumentKind,
}

impl Instrument {
    #[must_use]
    pub fn new(ticker: impl Into<Ticker>, kind: InstrumentKind) -> Self {
        Self {
            ticker: ticker.into(),
            kind,
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.ticker, self.kind)
    }
}
