//! Venue-wide constants for the Onebook matching engine.

/// Default quote asset every instrument trades against.
pub const DEFAULT_QUOTE_ASSET: &str = "RUB";

/// Default number of aggregated price levels in a book snapshot.
pub const DEFAULT_SNAPSHOT_DEPTH: usize = 10;

/// Maximum number of aggregated price levels a snapshot may request.
pub const MAX_SNAPSHOT_DEPTH: usize = 25;

/// Default number of trades returned by a trade-history query.
pub const DEFAULT_TRADE_HISTORY_LIMIT: usize = 10;

/// Maximum number of trades a trade-history query may request.
pub const MAX_TRADE_HISTORY_LIMIT: usize = 100;

/// Maximum open orders per user per instrument.
pub const DEFAULT_MAX_OPEN_ORDERS_PER_USER: usize = 200;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Onebook";
