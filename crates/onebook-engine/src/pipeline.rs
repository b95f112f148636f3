//! The serialized command pipeline for one instrument.
//!
//! Everything that touches one instrument's book, its tape, and the
//! balances of its participants flows through `&mut self` here — the venue
//! wraps each pipeline in its own mutex, which makes matching linearizable
//! per instrument and makes cancel-vs-match races impossible (both are
//! just commands in the same queue).
//!
//! Submitted orders run the state machine:
//!
//! 1. **Validate** — instrument-agnostic input checks
//! 2. **Reserve** — worst-case funding held in the ledger before matching
//! 3. **Match loop** — walk the opposite side in price-time priority,
//!    settling both legs of every fill at the maker's price
//! 4. **Residual** — rest the limit remainder, or release the market
//!    remainder (market orders never rest)
//!
//! Trade execution price is always the maker's resting price, so a taker
//! never trades worse than its own limit.

use std::collections::HashMap;

use chrono::Utc;
use onebook_ledger::Ledger;
use onebook_matchcore::OrderBook;
use onebook_types::{
    BookSnapshot, Instrument, OnebookError, Order, OrderId, OrderKind, OrderResult, OrderSide,
    OrderStatus, Result, Ticker, Trade, TradeId, UserId,
};
use rust_decimal::Decimal;

use crate::tape::TradeTape;

/// Per-instrument state, reachable only through the venue's serialization
/// point for that instrument.
pub struct InstrumentPipeline {
    instrument: Instrument,
    quote_asset: Ticker,
    book: OrderBook,
    /// Every order ever submitted for this instrument, including terminal
    /// ones. Resting orders are mirrored here on every fill.
    orders: HashMap<OrderId, Order>,
    tape: TradeTape,
    /// Arrival sequence for FIFO tie-breaking; assigned under the
    /// pipeline lock, after the reservation succeeds.
    next_order_seq: u64,
    max_open_orders_per_user: usize,
}

impl InstrumentPipeline {
    /// Create a fresh pipeline for an instrument.
    #[must_use]
    pub fn new(instrument: Instrument, quote_asset: Ticker, max_open_orders_per_user: usize) -> Self {
        let book = OrderBook::new(instrument.ticker.clone());
        Self {
            instrument,
            quote_asset,
            book,
            orders: HashMap::new(),
            tape: TradeTape::new(),
            next_order_seq: 0,
            max_open_orders_per_user,
        }
    }

    #[must_use]
    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    // =================================================================
    // Order submission
    // =================================================================

    /// Validate, reserve, match and settle a new order.
    ///
    /// On any validation or reservation failure the order is never
    /// created and no state is mutated.
    pub fn submit_order(
        &mut self,
        ledger: &mut Ledger,
        user_id: UserId,
        side: OrderSide,
        kind: OrderKind,
        price: Option<Decimal>,
        quantity: Decimal,
    ) -> Result<OrderResult> {
        // ---- 1. Validate -------------------------------------------------
        if quantity <= Decimal::ZERO {
            return Err(OnebookError::InvalidOrder {
                reason: format!("quantity must be positive, got {quantity}"),
            });
        }
        match kind {
            OrderKind::Limit => {
                let Some(p) = price else {
                    return Err(OnebookError::InvalidOrder {
                        reason: "limit order requires a price".into(),
                    });
                };
                if p <= Decimal::ZERO {
                    return Err(OnebookError::InvalidOrder {
                        reason: format!("price must be positive, got {p}"),
                    });
                }
            }
            OrderKind::Market => {
                if price.is_some() {
                    return Err(OnebookError::InvalidOrder {
                        reason: "market order carries no price".into(),
                    });
                }
            }
        }
        if self.open_orders_of(user_id) >= self.max_open_orders_per_user {
            return Err(OnebookError::InvalidOrder {
                reason: "open order limit reached for user".into(),
            });
        }

        let base = self.instrument.ticker.clone();
        let quote = self.quote_asset.clone();

        // ---- 2. Reserve --------------------------------------------------
        // Buys hold quote (worst case: limit price, or the exact sweep cost
        // for market buys — the book cannot change under the pipeline lock).
        // Sells hold the base quantity. Market orders with an empty
        // opposite side are rejected before anything is reserved.
        let (reserve_asset, reserve_amount) = match (side, kind) {
            (OrderSide::Buy, OrderKind::Limit) => {
                let limit = price.unwrap_or(Decimal::ZERO);
                (quote.clone(), limit * quantity)
            }
            (OrderSide::Buy, OrderKind::Market) => {
                let (fillable, cost) = self.book.sweep_cost(OrderSide::Sell, quantity);
                if fillable.is_zero() {
                    return Err(OnebookError::Unfillable(base));
                }
                (quote.clone(), cost)
            }
            (OrderSide::Sell, OrderKind::Limit) => (base.clone(), quantity),
            (OrderSide::Sell, OrderKind::Market) => {
                if self.book.best_bid().is_none() {
                    return Err(OnebookError::Unfillable(base));
                }
                (base.clone(), quantity)
            }
        };
        ledger.reserve(user_id, &reserve_asset, reserve_amount)?;

        let now = Utc::now();
        let mut taker = Order {
            id: OrderId::new(),
            user_id,
            ticker: base.clone(),
            side,
            kind,
            status: OrderStatus::New,
            price,
            quantity,
            remaining_qty: quantity,
            reserved: reserve_amount,
            sequence: self.next_order_seq,
            created_at: now,
            updated_at: now,
        };
        self.next_order_seq += 1;

        // ---- 3. Match loop -----------------------------------------------
        let mut trade_ids: Vec<TradeId> = Vec::new();
        let opposite = side.opposite();

        while taker.remaining_qty > Decimal::ZERO {
            let Some((maker_price, maker_id, maker_user)) = self
                .book
                .front_of_best(opposite)
                .and_then(|m| m.price.map(|p| (p, m.id, m.user_id)))
            else {
                break;
            };
            if !taker.crosses(maker_price) {
                break;
            }

            let Some(maker) = self.book.front_of_best_mut(opposite) else {
                break;
            };
            let fill = taker.remaining_qty.min(maker.remaining_qty);
            let notional = maker_price * fill;
            let (buyer, seller) = match side {
                OrderSide::Buy => (user_id, maker_user),
                OrderSide::Sell => (maker_user, user_id),
            };

            // Both legs settle from reserve: base to the buyer, quote to
            // the seller, at the maker's price.
            ledger.settle(seller, buyer, &base, fill)?;
            ledger.settle(buyer, seller, &quote, notional)?;

            // Maker bookkeeping, in place.
            maker.remaining_qty -= fill;
            maker.reserved -= match maker.side {
                OrderSide::Buy => notional,
                OrderSide::Sell => fill,
            };
            maker.status = if maker.remaining_qty.is_zero() {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            maker.updated_at = Utc::now();
            let maker_done = maker.remaining_qty.is_zero();
            let maker_record = maker.clone();
            self.orders.insert(maker_record.id, maker_record);

            if maker_done {
                if let Some(mut done) = self.book.pop_front_of_best(opposite) {
                    // A fully consumed reservation leaves nothing behind;
                    // release anything that would otherwise leak.
                    if done.reserved > Decimal::ZERO {
                        let asset = match done.side {
                            OrderSide::Buy => &quote,
                            OrderSide::Sell => &base,
                        };
                        ledger.release(done.user_id, asset, done.reserved)?;
                        done.reserved = Decimal::ZERO;
                        self.orders.insert(done.id, done);
                    }
                }
            }

            // Taker bookkeeping.
            taker.remaining_qty -= fill;
            match side {
                OrderSide::Buy => {
                    taker.reserved -= notional;
                    // Price improvement: the maker traded below the taker's
                    // limit, so part of the reservation is no longer needed.
                    if let Some(limit) = taker.price {
                        let surplus = (limit - maker_price) * fill;
                        if surplus > Decimal::ZERO {
                            ledger.release(user_id, &quote, surplus)?;
                            taker.reserved -= surplus;
                        }
                    }
                }
                OrderSide::Sell => {
                    taker.reserved -= fill;
                }
            }

            let seq = self.tape.next_sequence();
            let trade = Trade {
                id: TradeId::deterministic(&base, seq),
                ticker: base.clone(),
                taker_order_id: taker.id,
                taker_user_id: user_id,
                maker_order_id: maker_id,
                maker_user_id: maker_user,
                price: maker_price,
                quantity: fill,
                quote_amount: notional,
                taker_side: side,
                sequence: seq,
                executed_at: Utc::now(),
            };
            tracing::debug!(
                ticker = %base,
                trade = %trade.id,
                price = %maker_price,
                qty = %fill,
                taker = %taker.id,
                maker = %maker_id,
                "fill"
            );
            trade_ids.push(trade.id);
            self.tape.append(trade);
        }

        // ---- 4. Residual handling ----------------------------------------
        taker.updated_at = Utc::now();
        if taker.remaining_qty > Decimal::ZERO {
            match kind {
                OrderKind::Limit => {
                    // Rest the remainder; the reservation shrinks to exactly
                    // what the resting portion can still consume.
                    let target = match (side, taker.price) {
                        (OrderSide::Buy, Some(limit)) => limit * taker.remaining_qty,
                        _ => taker.remaining_qty,
                    };
                    let excess = taker.reserved - target;
                    if excess > Decimal::ZERO {
                        ledger.release(user_id, &reserve_asset, excess)?;
                        taker.reserved = target;
                    }
                    taker.status = if trade_ids.is_empty() {
                        OrderStatus::New
                    } else {
                        OrderStatus::PartiallyFilled
                    };
                    self.book.insert(taker.clone())?;
                }
                OrderKind::Market => {
                    // Market orders never rest: release the unused
                    // reservation and close out the executed portion.
                    if taker.reserved > Decimal::ZERO {
                        ledger.release(user_id, &reserve_asset, taker.reserved)?;
                        taker.reserved = Decimal::ZERO;
                    }
                    if trade_ids.is_empty() {
                        return Err(OnebookError::Unfillable(base));
                    }
                    taker.status = OrderStatus::Filled;
                }
            }
        } else {
            taker.status = OrderStatus::Filled;
            if taker.reserved > Decimal::ZERO {
                ledger.release(user_id, &reserve_asset, taker.reserved)?;
                taker.reserved = Decimal::ZERO;
            }
        }

        // Settlement must not have created or destroyed balance.
        if !trade_ids.is_empty() {
            for asset in [&base, &quote] {
                if let Err(err) = ledger.verify_conservation(asset) {
                    tracing::error!(ticker = %base, %err, "conservation check failed after matching");
                    return Err(err);
                }
            }
        }

        tracing::info!(
            ticker = %base,
            order = %taker.id,
            %side,
            %kind,
            status = %taker.status,
            filled = %taker.filled_qty(),
            fills = trade_ids.len(),
            "order processed"
        );
        self.orders.insert(taker.id, taker.clone());
        Ok(OrderResult {
            order: taker,
            trade_ids,
        })
    }

    // =================================================================
    // Cancellation
    // =================================================================

    /// Cancel a resting order, releasing its remaining reservation.
    ///
    /// A foreign order looks like `OrderNotFound` to a non-admin caller so
    /// existence is not leaked. Terminal and market orders are
    /// `OrderNotCancellable`.
    pub fn cancel_order(
        &mut self,
        ledger: &mut Ledger,
        order_id: OrderId,
        caller: UserId,
        is_admin: bool,
    ) -> Result<Order> {
        let Some(record) = self.orders.get(&order_id) else {
            return Err(OnebookError::OrderNotFound(order_id));
        };
        if record.user_id != caller && !is_admin {
            return Err(OnebookError::OrderNotFound(order_id));
        }
        if !record.is_resting() {
            return Err(OnebookError::OrderNotCancellable);
        }

        let mut order = self.book.remove(&order_id)?;
        let asset = match order.side {
            OrderSide::Buy => &self.quote_asset,
            OrderSide::Sell => &self.instrument.ticker,
        };
        ledger.release(order.user_id, asset, order.reserved)?;
        order.reserved = Decimal::ZERO;
        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        self.orders.insert(order_id, order.clone());

        tracing::info!(
            ticker = %self.instrument.ticker,
            order = %order_id,
            owner = %order.user_id,
            "order cancelled"
        );
        Ok(order)
    }

    // =================================================================
    // Cascades
    // =================================================================

    /// Cancel every resting order and release its reservation
    /// (first step of instrument removal).
    pub fn cancel_all_resting(&mut self, ledger: &mut Ledger) -> Result<usize> {
        let drained = self.book.drain_all();
        let count = drained.len();
        for mut order in drained {
            let asset = match order.side {
                OrderSide::Buy => &self.quote_asset,
                OrderSide::Sell => &self.instrument.ticker,
            };
            ledger.release(order.user_id, asset, order.reserved)?;
            order.reserved = Decimal::ZERO;
            order.status = OrderStatus::Cancelled;
            order.updated_at = Utc::now();
            self.orders.insert(order.id, order);
        }
        Ok(count)
    }

    /// Remove one user from this instrument: cancel their resting orders,
    /// release reservations, purge their order records and trades.
    /// Returns the ids of all removed order records.
    pub fn remove_user(&mut self, ledger: &mut Ledger, user_id: UserId) -> Result<Vec<OrderId>> {
        let resting: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.user_id == user_id && o.is_resting())
            .map(|o| o.id)
            .collect();
        for order_id in resting {
            let order = self.book.remove(&order_id)?;
            let asset = match order.side {
                OrderSide::Buy => &self.quote_asset,
                OrderSide::Sell => &self.instrument.ticker,
            };
            ledger.release(order.user_id, asset, order.reserved)?;
        }

        let removed: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .map(|o| o.id)
            .collect();
        for order_id in &removed {
            self.orders.remove(order_id);
        }
        self.tape.purge_user(user_id);
        Ok(removed)
    }

    /// All order ids this pipeline has ever seen (locator cleanup on
    /// instrument removal).
    #[must_use]
    pub fn order_ids(&self) -> Vec<OrderId> {
        self.orders.keys().copied().collect()
    }

    // =================================================================
    // Queries
    // =================================================================

    /// A read-only copy of an order record.
    #[must_use]
    pub fn get_order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    /// All orders a user submitted on this instrument.
    #[must_use]
    pub fn orders_for_user(&self, user_id: UserId) -> Vec<Order> {
        self.orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Number of currently resting orders a user holds here.
    #[must_use]
    pub fn open_orders_of(&self, user_id: UserId) -> usize {
        self.orders
            .values()
            .filter(|o| o.user_id == user_id && o.is_resting())
            .count()
    }

    /// Aggregated book levels up to `depth` per side.
    #[must_use]
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        self.book.snapshot(depth)
    }

    /// Most recent trades, newest first.
    #[must_use]
    pub fn trade_history(&self, limit: usize) -> Vec<Trade> {
        self.tape.recent(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Ticker {
        Ticker::new(s)
    }

    fn setup() -> (InstrumentPipeline, Ledger) {
        let instrument = Instrument::new("USD", onebook_types::InstrumentKind::Currency);
        let pipeline = InstrumentPipeline::new(instrument, t("RUB"), 200);
        (pipeline, Ledger::new())
    }

    fn fund(ledger: &mut Ledger, user: UserId, asset: &str, amount: i64) {
        ledger
            .deposit(user, &t(asset), Decimal::new(amount, 0))
            .unwrap();
    }

    #[test]
    fn zero_quantity_rejected() {
        let (mut pipeline, mut ledger) = setup();
        let err = pipeline
            .submit_order(
                &mut ledger,
                UserId::new(),
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::ZERO,
            )
            .unwrap_err();
        assert!(matches!(err, OnebookError::InvalidOrder { .. }));
    }

    #[test]
    fn limit_without_price_rejected() {
        let (mut pipeline, mut ledger) = setup();
        let err = pipeline
            .submit_order(
                &mut ledger,
                UserId::new(),
                OrderSide::Buy,
                OrderKind::Limit,
                None,
                Decimal::ONE,
            )
            .unwrap_err();
        assert!(matches!(err, OnebookError::InvalidOrder { .. }));
    }

    #[test]
    fn market_with_price_rejected() {
        let (mut pipeline, mut ledger) = setup();
        let err = pipeline
            .submit_order(
                &mut ledger,
                UserId::new(),
                OrderSide::Buy,
                OrderKind::Market,
                Some(Decimal::new(100, 0)),
                Decimal::ONE,
            )
            .unwrap_err();
        assert!(matches!(err, OnebookError::InvalidOrder { .. }));
    }

    #[test]
    fn unfunded_order_rejected_without_state_change() {
        let (mut pipeline, mut ledger) = setup();
        let user = UserId::new();
        let err = pipeline
            .submit_order(
                &mut ledger,
                user,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap_err();
        assert!(matches!(err, OnebookError::InsufficientFunds { .. }));
        assert!(pipeline.snapshot(10).bids.is_empty());
        assert!(ledger.balance(user, &t("RUB")).is_zero());
    }

    #[test]
    fn resting_buy_reserves_quote() {
        let (mut pipeline, mut ledger) = setup();
        let alice = UserId::new();
        fund(&mut ledger, alice, "RUB", 1000);

        let result = pipeline
            .submit_order(
                &mut ledger,
                alice,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();

        assert_eq!(result.order.status, OrderStatus::New);
        assert!(result.trade_ids.is_empty());
        let bal = ledger.balance(alice, &t("RUB"));
        assert_eq!(bal.available, Decimal::new(500, 0));
        assert_eq!(bal.reserved, Decimal::new(500, 0));
    }

    #[test]
    fn crossing_sell_settles_both_legs() {
        let (mut pipeline, mut ledger) = setup();
        let alice = UserId::new();
        let bob = UserId::new();
        fund(&mut ledger, alice, "RUB", 1000);
        fund(&mut ledger, bob, "USD", 20);

        pipeline
            .submit_order(
                &mut ledger,
                alice,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();
        let result = pipeline
            .submit_order(
                &mut ledger,
                bob,
                OrderSide::Sell,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();

        assert_eq!(result.order.status, OrderStatus::Filled);
        assert_eq!(result.trade_ids.len(), 1);

        // Alice paid 500 RUB, got 5 USD; Bob the inverse.
        assert_eq!(ledger.balance(alice, &t("RUB")).available, Decimal::new(500, 0));
        assert_eq!(ledger.balance(alice, &t("RUB")).reserved, Decimal::ZERO);
        assert_eq!(ledger.balance(alice, &t("USD")).available, Decimal::new(5, 0));
        assert_eq!(ledger.balance(bob, &t("RUB")).available, Decimal::new(500, 0));
        assert_eq!(ledger.balance(bob, &t("USD")).available, Decimal::new(15, 0));

        let trade = &pipeline.trade_history(10)[0];
        assert_eq!(trade.price, Decimal::new(100, 0));
        assert_eq!(trade.quantity, Decimal::new(5, 0));
    }

    #[test]
    fn taker_buy_gets_price_improvement() {
        let (mut pipeline, mut ledger) = setup();
        let maker = UserId::new();
        let taker = UserId::new();
        fund(&mut ledger, maker, "USD", 10);
        fund(&mut ledger, taker, "RUB", 1000);

        // Maker asks 90; taker bids 100 — executes at 90.
        pipeline
            .submit_order(
                &mut ledger,
                maker,
                OrderSide::Sell,
                OrderKind::Limit,
                Some(Decimal::new(90, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();
        let result = pipeline
            .submit_order(
                &mut ledger,
                taker,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();

        assert_eq!(result.order.status, OrderStatus::Filled);
        let trade = &pipeline.trade_history(1)[0];
        assert_eq!(trade.price, Decimal::new(90, 0));

        // Taker paid 450, not 500; the 50 surplus was released.
        let bal = ledger.balance(taker, &t("RUB"));
        assert_eq!(bal.available, Decimal::new(550, 0));
        assert_eq!(bal.reserved, Decimal::ZERO);
    }

    #[test]
    fn partial_fill_rests_remainder() {
        let (mut pipeline, mut ledger) = setup();
        let alice = UserId::new();
        let bob = UserId::new();
        fund(&mut ledger, alice, "RUB", 1000);
        fund(&mut ledger, bob, "USD", 3);

        pipeline
            .submit_order(
                &mut ledger,
                bob,
                OrderSide::Sell,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(3, 0),
            )
            .unwrap();
        let result = pipeline
            .submit_order(
                &mut ledger,
                alice,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();

        assert_eq!(result.order.status, OrderStatus::PartiallyFilled);
        assert_eq!(result.order.remaining_qty, Decimal::new(2, 0));
        // 200 still reserved for the resting remainder.
        assert_eq!(ledger.balance(alice, &t("RUB")).reserved, Decimal::new(200, 0));
        // Remainder is visible in the book.
        let snap = pipeline.snapshot(10);
        assert_eq!(snap.bids[0].quantity, Decimal::new(2, 0));
    }

    #[test]
    fn market_buy_reserves_sweep_cost_and_releases_remainder() {
        let (mut pipeline, mut ledger) = setup();
        let maker = UserId::new();
        let taker = UserId::new();
        fund(&mut ledger, maker, "USD", 2);
        fund(&mut ledger, taker, "RUB", 1000);

        pipeline
            .submit_order(
                &mut ledger,
                maker,
                OrderSide::Sell,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(2, 0),
            )
            .unwrap();

        // Asks only cover 2 of the 5 requested; reservation is the sweep
        // cost (200), the executed portion closes as FILLED.
        let result = pipeline
            .submit_order(
                &mut ledger,
                taker,
                OrderSide::Buy,
                OrderKind::Market,
                None,
                Decimal::new(5, 0),
            )
            .unwrap();

        assert_eq!(result.order.status, OrderStatus::Filled);
        assert_eq!(result.order.filled_qty(), Decimal::new(2, 0));
        let bal = ledger.balance(taker, &t("RUB"));
        assert_eq!(bal.available, Decimal::new(800, 0));
        assert_eq!(bal.reserved, Decimal::ZERO);
    }

    #[test]
    fn market_order_on_empty_book_is_unfillable() {
        let (mut pipeline, mut ledger) = setup();
        let user = UserId::new();
        fund(&mut ledger, user, "USD", 10);

        let err = pipeline
            .submit_order(
                &mut ledger,
                user,
                OrderSide::Sell,
                OrderKind::Market,
                None,
                Decimal::new(5, 0),
            )
            .unwrap_err();
        assert!(matches!(err, OnebookError::Unfillable(_)));
        // No state change.
        let bal = ledger.balance(user, &t("USD"));
        assert_eq!(bal.available, Decimal::new(10, 0));
        assert_eq!(bal.reserved, Decimal::ZERO);
    }

    #[test]
    fn fifo_at_equal_price() {
        let (mut pipeline, mut ledger) = setup();
        let first = UserId::new();
        let second = UserId::new();
        let taker = UserId::new();
        fund(&mut ledger, first, "USD", 10);
        fund(&mut ledger, second, "USD", 10);
        fund(&mut ledger, taker, "RUB", 1000);

        let a = pipeline
            .submit_order(
                &mut ledger,
                first,
                OrderSide::Sell,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(4, 0),
            )
            .unwrap();
        pipeline
            .submit_order(
                &mut ledger,
                second,
                OrderSide::Sell,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(4, 0),
            )
            .unwrap();

        // Crosses both price levels' worth; A must fill completely first.
        let result = pipeline
            .submit_order(
                &mut ledger,
                taker,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(6, 0),
            )
            .unwrap();

        assert_eq!(result.trade_ids.len(), 2);
        let history = pipeline.trade_history(10);
        // Newest first: second fill (2 from B), then first fill (4 from A).
        assert_eq!(history[1].maker_order_id, a.order.id);
        assert_eq!(history[1].quantity, Decimal::new(4, 0));
        assert_eq!(history[0].quantity, Decimal::new(2, 0));
    }

    #[test]
    fn cancel_releases_reservation() {
        let (mut pipeline, mut ledger) = setup();
        let alice = UserId::new();
        fund(&mut ledger, alice, "RUB", 1000);

        let result = pipeline
            .submit_order(
                &mut ledger,
                alice,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();
        let cancelled = pipeline
            .cancel_order(&mut ledger, result.order.id, alice, false)
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        let bal = ledger.balance(alice, &t("RUB"));
        assert_eq!(bal.available, Decimal::new(1000, 0));
        assert_eq!(bal.reserved, Decimal::ZERO);
        assert!(pipeline.snapshot(10).bids.is_empty());
    }

    #[test]
    fn cancel_is_not_idempotent_but_harmless() {
        let (mut pipeline, mut ledger) = setup();
        let alice = UserId::new();
        fund(&mut ledger, alice, "RUB", 1000);

        let result = pipeline
            .submit_order(
                &mut ledger,
                alice,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();
        pipeline
            .cancel_order(&mut ledger, result.order.id, alice, false)
            .unwrap();

        let err = pipeline
            .cancel_order(&mut ledger, result.order.id, alice, false)
            .unwrap_err();
        assert!(matches!(err, OnebookError::OrderNotCancellable));
        // No balance change from the second attempt.
        assert_eq!(ledger.balance(alice, &t("RUB")).available, Decimal::new(1000, 0));
    }

    #[test]
    fn foreign_cancel_looks_like_not_found() {
        let (mut pipeline, mut ledger) = setup();
        let alice = UserId::new();
        let mallory = UserId::new();
        fund(&mut ledger, alice, "RUB", 1000);

        let result = pipeline
            .submit_order(
                &mut ledger,
                alice,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();

        let err = pipeline
            .cancel_order(&mut ledger, result.order.id, mallory, false)
            .unwrap_err();
        assert!(matches!(err, OnebookError::OrderNotFound(_)));

        // Admin may cancel on behalf of anyone.
        pipeline
            .cancel_order(&mut ledger, result.order.id, mallory, true)
            .unwrap();
    }

    #[test]
    fn open_order_limit_enforced() {
        let instrument = Instrument::new("USD", onebook_types::InstrumentKind::Currency);
        let mut pipeline = InstrumentPipeline::new(instrument, t("RUB"), 2);
        let mut ledger = Ledger::new();
        let alice = UserId::new();
        fund(&mut ledger, alice, "RUB", 10_000);

        for _ in 0..2 {
            pipeline
                .submit_order(
                    &mut ledger,
                    alice,
                    OrderSide::Buy,
                    OrderKind::Limit,
                    Some(Decimal::new(10, 0)),
                    Decimal::ONE,
                )
                .unwrap();
        }
        let err = pipeline
            .submit_order(
                &mut ledger,
                alice,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(10, 0)),
                Decimal::ONE,
            )
            .unwrap_err();
        assert!(matches!(err, OnebookError::InvalidOrder { .. }));
    }

    #[test]
    fn cancel_all_resting_releases_everything() {
        let (mut pipeline, mut ledger) = setup();
        let alice = UserId::new();
        let bob = UserId::new();
        fund(&mut ledger, alice, "RUB", 1000);
        fund(&mut ledger, bob, "USD", 10);

        pipeline
            .submit_order(
                &mut ledger,
                alice,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(90, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();
        pipeline
            .submit_order(
                &mut ledger,
                bob,
                OrderSide::Sell,
                OrderKind::Limit,
                Some(Decimal::new(110, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();

        let cancelled = pipeline.cancel_all_resting(&mut ledger).unwrap();
        assert_eq!(cancelled, 2);
        assert_eq!(ledger.balance(alice, &t("RUB")).reserved, Decimal::ZERO);
        assert_eq!(ledger.balance(bob, &t("USD")).reserved, Decimal::ZERO);
    }

    #[test]
    fn remove_user_purges_orders_and_trades() {
        let (mut pipeline, mut ledger) = setup();
        let alice = UserId::new();
        let bob = UserId::new();
        fund(&mut ledger, alice, "RUB", 1000);
        fund(&mut ledger, bob, "USD", 10);

        pipeline
            .submit_order(
                &mut ledger,
                alice,
                OrderSide::Buy,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();
        pipeline
            .submit_order(
                &mut ledger,
                bob,
                OrderSide::Sell,
                OrderKind::Limit,
                Some(Decimal::new(100, 0)),
                Decimal::new(5, 0),
            )
            .unwrap();
        assert_eq!(pipeline.trade_history(10).len(), 1);

        let removed = pipeline.remove_user(&mut ledger, bob).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(pipeline.orders_for_user(bob).is_empty());
        assert!(pipeline.trade_history(10).is_empty());
        // Alice's record survives.
        assert_eq!(pipeline.orders_for_user(alice).len(), 1);
    }
}
