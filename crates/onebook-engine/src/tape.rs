//! Append-only trade history for one instrument.
//!
//! Trades are appended in execution order and never mutated. The only
//! removals are cascade deletions when an instrument or user is purged.

use onebook_types::{Trade, UserId};

/// Append-only tape of executed trades, oldest first.
#[derive(Debug, Default)]
pub struct TradeTape {
    trades: Vec<Trade>,
    next_seq: u64,
}

impl TradeTape {
    /// Create a new empty tape.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trades: Vec::new(),
            next_seq: 0,
        }
    }

    /// Sequence number the next appended trade must carry.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.next_seq
    }

    /// Append a trade in execution order.
    pub fn append(&mut self, trade: Trade) {
        self.next_seq = trade.sequence + 1;
        self.trades.push(trade);
    }

    /// The most recent `limit` trades, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<Trade> {
        self.trades.iter().rev().take(limit).cloned().collect()
    }

    /// Remove every trade a user participated in (user cascade deletion).
    pub fn purge_user(&mut self, user_id: UserId) {
        self.trades.retain(|t| !t.involves(user_id));
    }

    /// Number of trades on the tape.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// Whether the tape is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}
