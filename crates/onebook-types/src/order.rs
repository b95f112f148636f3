//! Order types for the Onebook matching engine.
//!
//! An order's `reserved` field tracks the portion of the owner's ledger
//! reservation still held against it: quote asset for buys, base asset for
//! sells. The engine keeps it in sync with the ledger on every fill and
//! releases it in full on cancellation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, Ticker, TradeId, UserId};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The side an incoming order matches against.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// The type of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderKind {
    Limit,
    Market,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Limit => write!(f, "LIMIT"),
            Self::Market => write!(f, "MARKET"),
        }
    }
}

/// Lifecycle status of an order.
///
/// `New → (PartiallyFilled ↔ matching) → Filled | Cancelled`.
/// Terminal states (`Filled`, `Cancelled`) are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Core order struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub ticker: Ticker,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub status: OrderStatus,
    /// Limit price. `Some` iff `kind == Limit`.
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub remaining_qty: Decimal,
    /// Ledger reservation still held against this order
    /// (quote asset for buys, base asset for sells).
    pub reserved: Decimal,
    /// Per-instrument arrival sequence; FIFO tie-break at equal price.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether this order would trade against a resting order at `maker_price`.
    ///
    /// Market orders cross unconditionally. A limit buy crosses when its
    /// price is at or above the maker's; a limit sell when at or below.
    #[must_use]
    pub fn crosses(&self, maker_price: Decimal) -> bool {
        match (self.kind, self.price) {
            (OrderKind::Market, _) | (OrderKind::Limit, None) => self.kind == OrderKind::Market,
            (OrderKind::Limit, Some(limit)) => match self.side {
                OrderSide::Buy => limit >= maker_price,
                OrderSide::Sell => limit <= maker_price,
            },
        }
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.remaining_qty.is_zero()
    }

    #[must_use]
    pub fn filled_qty(&self) -> Decimal {
        self.quantity - self.remaining_qty
    }

    /// Whether the order currently rests in a book (only limit orders rest).
    #[must_use]
    pub fn is_resting(&self) -> bool {
        self.kind == OrderKind::Limit
            && !self.status.is_terminal()
            && self.remaining_qty > Decimal::ZERO
    }
}

/// Result of a submitted order: the final order record and the fills it
/// produced, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub order: Order,
    pub trade_ids: Vec<TradeId>,
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy_limit(side: OrderSide, price: Decimal, qty: Decimal) -> Self {
        Self::dummy_limit_for_user(UserId::new(), side, price, qty)
    }

    pub fn dummy_limit_for_user(
        user_id: UserId,
        side: OrderSide,
        price: Decimal,
        qty: Decimal,
    ) -> Self {
        let reserved = match side {
            OrderSide::Buy => price * qty,
            OrderSide::Sell => qty,
        };
        Self {
            id: OrderId::new(),
            user_id,
            ticker: Ticker::new("USD"),
            side,
            kind: OrderKind::Limit,
            status: OrderStatus::New,
            price: Some(price),
            quantity: qty,
            remaining_qty: qty,
            reserved,
            sequence: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
