//! Configuration for a Onebook venue.

use serde::{Deserialize, Serialize};

use crate::{Ticker, constants};

/// Configuration for a single venue instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// The quote asset every instrument trades against.
    pub quote_asset: Ticker,
    /// Upper bound on snapshot depth requests.
    pub max_snapshot_depth: usize,
    /// Upper bound on trade-history requests.
    pub max_trade_history: usize,
    /// Maximum open orders per user per instrument.
    pub max_open_orders_per_user: usize,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            quote_asset: Ticker::new(constants::DEFAULT_QUOTE_ASSET),
            max_snapshot_depth: constants::MAX_SNAPSHOT_DEPTH,
            max_trade_history: constants::MAX_TRADE_HISTORY_LIMIT,
            max_open_orders_per_user: constants::DEFAULT_MAX_OPEN_ORDERS_PER_USER,
        }
    }
}
