//! The order book for a single instrument.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<Decimal>, PriceLevel>` -- highest price first
//! - **Asks** (sells): `BTreeMap<Decimal, PriceLevel>` -- lowest price first
//!
//! An auxiliary `HashMap<OrderId, (Side, Price)>` enables O(log N) cancellation.
//! Only resting limit orders with remaining quantity occupy the book.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use onebook_types::{
    BookLevel, BookSnapshot, OnebookError, Order, OrderId, OrderKind, OrderSide, Result, Ticker,
};
use rust_decimal::Decimal;

use crate::price_level::PriceLevel;

/// The order book for a single instrument.
#[derive(Debug)]
pub struct OrderBook {
    /// The instrument this book serves.
    pub ticker: Ticker,
    /// Buy side: highest price first (`Reverse` key).
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    /// Sell side: lowest price first.
    asks: BTreeMap<Decimal, PriceLevel>,
    /// Fast lookup: `OrderId -> (side, price)` for O(log N) cancel.
    index: HashMap<OrderId, (OrderSide, Decimal)>,
}

impl OrderBook {
    /// Create a new empty order book for the given instrument.
    #[must_use]
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    // =================================================================
    // Insertion
    // =================================================================

    /// Insert a resting limit order at its limit price.
    ///
    /// # Errors
    /// - `InvalidOrder` for market orders, missing prices, or zero remainder
    /// - `DuplicateOrder` if the id is already resting
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if order.kind != OrderKind::Limit {
            return Err(OnebookError::InvalidOrder {
                reason: "only limit orders may rest in the book".into(),
            });
        }
        let Some(price) = order.price else {
            return Err(OnebookError::InvalidOrder {
                reason: "resting order has no price".into(),
            });
        };
        if order.remaining_qty <= Decimal::ZERO {
            return Err(OnebookError::InvalidOrder {
                reason: "resting order has no remaining quantity".into(),
            });
        }
        if self.index.contains_key(&order.id) {
            return Err(OnebookError::DuplicateOrder(order.id));
        }

        self.index.insert(order.id, (order.side, price));
        match order.side {
            OrderSide::Buy => {
                self.bids
                    .entry(Reverse(price))
                    .or_insert_with(|| PriceLevel::new(price))
                    .enqueue(order);
            }
            OrderSide::Sell => {
                self.asks
                    .entry(price)
                    .or_insert_with(|| PriceLevel::new(price))
                    .enqueue(order);
            }
        }
        Ok(())
    }

    // =================================================================
    // Removal
    // =================================================================

    /// Remove a resting order by ID (cancellation path). Returns the order.
    ///
    /// # Errors
    /// Returns `OrderNotFound` if the order is not resting in this book.
    pub fn remove(&mut self, order_id: &OrderId) -> Result<Order> {
        let (side, price) = self
            .index
            .remove(order_id)
            .ok_or(OnebookError::OrderNotFound(*order_id))?;

        let order = match side {
            OrderSide::Buy => {
                let level = self
                    .bids
                    .get_mut(&Reverse(price))
                    .ok_or(OnebookError::OrderNotFound(*order_id))?;
                let order = level
                    .extract(order_id)
                    .ok_or(OnebookError::OrderNotFound(*order_id))?;
                if level.is_empty() {
                    self.bids.remove(&Reverse(price));
                }
                order
            }
            OrderSide::Sell => {
                let level = self
                    .asks
                    .get_mut(&price)
                    .ok_or(OnebookError::OrderNotFound(*order_id))?;
                let order = level
                    .extract(order_id)
                    .ok_or(OnebookError::OrderNotFound(*order_id))?;
                if level.is_empty() {
                    self.asks.remove(&price);
                }
                order
            }
        };

        Ok(order)
    }

    /// Drain every resting order (instrument cascade removal).
    pub fn drain_all(&mut self) -> Vec<Order> {
        self.index.clear();
        let mut all = Vec::new();
        for (_, mut level) in std::mem::take(&mut self.bids) {
            while let Some(order) = level.pop_front() {
                all.push(order);
            }
        }
        for (_, mut level) in std::mem::take(&mut self.asks) {
            while let Some(order) = level.pop_front() {
                all.push(order);
            }
        }
        all
    }

    // =================================================================
    // FIFO access for the match loop
    // =================================================================

    /// Best (highest) bid price, or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Best (lowest) ask price, or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// The highest-priority resting order on the given side: best price,
    /// earliest arrival.
    #[must_use]
    pub fn front_of_best(&self, side: OrderSide) -> Option<&Order> {
        match side {
            OrderSide::Buy => self.bids.values().next().and_then(PriceLevel::front),
            OrderSide::Sell => self.asks.values().next().and_then(PriceLevel::front),
        }
    }

    /// Mutable access to the highest-priority resting order, for in-place
    /// fills by the match loop.
    pub fn front_of_best_mut(&mut self, side: OrderSide) -> Option<&mut Order> {
        match side {
            OrderSide::Buy => self.bids.values_mut().next().and_then(PriceLevel::front_mut),
            OrderSide::Sell => self.asks.values_mut().next().and_then(PriceLevel::front_mut),
        }
    }

    /// Remove and return the highest-priority resting order on the given
    /// side (used once the match loop fills it completely).
    pub fn pop_front_of_best(&mut self, side: OrderSide) -> Option<Order> {
        let order = match side {
            OrderSide::Buy => {
                let price = self.best_bid()?;
                let level = self.bids.get_mut(&Reverse(price))?;
                let order = level.pop_front()?;
                if level.is_empty() {
                    self.bids.remove(&Reverse(price));
                }
                order
            }
            OrderSide::Sell => {
                let price = self.best_ask()?;
                let level = self.asks.get_mut(&price)?;
                let order = level.pop_front()?;
                if level.is_empty() {
                    self.asks.remove(&price);
                }
                order
            }
        };
        self.index.remove(&order.id);
        Some(order)
    }

    /// Walk the given side best-first and cost out a fill of up to `qty`
    /// base units: returns `(fillable_qty, quote_cost)`.
    ///
    /// Used to compute the exact quote reservation for a market buy before
    /// matching starts. Both values are zero when the side is empty.
    #[must_use]
    pub fn sweep_cost(&self, side: OrderSide, qty: Decimal) -> (Decimal, Decimal) {
        let mut remaining = qty;
        let mut fillable = Decimal::ZERO;
        let mut cost = Decimal::ZERO;

        let levels: Box<dyn Iterator<Item = &PriceLevel>> = match side {
            OrderSide::Buy => Box::new(self.bids.values()),
            OrderSide::Sell => Box::new(self.asks.values()),
        };
        for level in levels {
            if remaining <= Decimal::ZERO {
                break;
            }
            let take = remaining.min(level.total_quantity());
            fillable += take;
            cost += take * level.price();
            remaining -= take;
        }
        (fillable, cost)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Aggregated price levels up to `depth` per side, best-first.
    ///
    /// A bounded copy: does not mutate book state.
    #[must_use]
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        let bids = self
            .bids
            .values()
            .take(depth)
            .map(|level| BookLevel {
                price: level.price(),
                quantity: level.total_quantity(),
            })
            .collect();
        let asks = self
            .asks
            .values()
            .take(depth)
            .map(|level| BookLevel {
                price: level.price(),
                quantity: level.total_quantity(),
            })
            .collect();
        BookSnapshot { bids, asks }
    }

    /// Total number of orders currently in the book.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Number of distinct bid price levels.
    #[must_use]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of distinct ask price levels.
    #[must_use]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    /// Returns `true` if the book has no orders on either side.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check if an order currently rests in the book.
    #[must_use]
    pub fn contains_order(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }
}
