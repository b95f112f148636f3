//! Trade records produced by the matching engine.
//!
//! A [`Trade`] is the immutable record of one fill between a taker and a
//! maker. Execution is always at the maker's resting price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderSide, Ticker, TradeId, UserId};

/// A single fill between a taker and a maker order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Deterministic from (ticker, sequence).
    pub id: TradeId,
    pub ticker: Ticker,
    /// The aggressive (incoming) order.
    pub taker_order_id: OrderId,
    pub taker_user_id: UserId,
    /// The passive (resting) order; the trade executes at its price.
    pub maker_order_id: OrderId,
    pub maker_user_id: UserId,
    /// Execution price — always the maker's price.
    pub price: Decimal,
    /// Executed quantity in base asset.
    pub quantity: Decimal,
    /// Quote amount = price × quantity.
    pub quote_amount: Decimal,
    pub taker_side: OrderSide,
    /// Per-instrument trade sequence; defines tape order.
    pub sequence: u64,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Notional value of the fill in quote asset.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        self.quote_amount
    }

    /// Returns `true` if the taker was buying.
    #[must_use]
    pub fn taker_is_buyer(&self) -> bool {
        self.taker_side == OrderSide::Buy
    }

    /// (buyer, seller) user ids for this fill.
    #[must_use]
    pub fn parties(&self) -> (UserId, UserId) {
        if self.taker_is_buyer() {
            (self.taker_user_id, self.maker_user_id)
        } else {
            (self.maker_user_id, self.taker_user_id)
        }
    }

    /// Whether the given user participated in this trade.
    #[must_use]
    pub fn involves(&self, user_id: UserId) -> bool {
        self.taker_user_id == user_id || self.maker_user_id == user_id
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} {} @ {} = {}",
            self.id, self.ticker, self.taker_side, self.quantity, self.price, self.quote_amount,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trade(taker_side: OrderSide) -> Trade {
        let ticker = Ticker::new("USD");
        Trade {
            id: TradeId::deterministic(&ticker, 0),
            ticker,
            taker_order_id: OrderId::new(),
            taker_user_id: UserId::new(),
            maker_order_id: OrderId::new(),
            maker_user_id: UserId::new(),
            price: Decimal::new(100, 0),
            quantity: Decimal::new(5, 0),
            quote_amount: Decimal::new(500, 0),
            taker_side,
            sequence: 0,
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn trade_notional() {
        let t = make_trade(OrderSide::Buy);
        assert_eq!(t.notional(), Decimal::new(500, 0));
    }

    #[test]
    fn parties_resolve_by_taker_side() {
        let t = make_trade(OrderSide::Buy);
        assert_eq!(t.parties(), (t.taker_user_id, t.maker_user_id));

        let t = make_trade(OrderSide::Sell);
        assert_eq!(t.parties(), (t.maker_user_id, t.taker_user_id));
    }

    #[test]
    fn involves_both_parties() {
        let t = make_trade(OrderSide::Buy);
        assert!(t.involves(t.taker_user_id));
        assert!(t.involves(t.maker_user_id));
        assert!(!t.involves(UserId::new()));
    }

    #[test]
    fn trade_display() {
        let t = make_trade(OrderSide::Buy);
        let s = format!("{t}");
        assert!(s.contains("USD"));
        assert!(s.contains("100"));
    }

    #[test]
    fn trade_serde_roundtrip() {
        let trade = make_trade(OrderSide::Sell);
        let json = serde_json::to_string(&trade).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade.id, back.id);
        assert_eq!(trade.price, back.price);
        assert_eq!(trade.quantity, back.quantity);
    }
}
