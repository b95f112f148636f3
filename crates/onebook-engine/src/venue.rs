//! The venue facade: thread-safe entry point for every operation.
//!
//! Concurrency model:
//! - one [`InstrumentPipeline`] per instrument, each behind its own mutex,
//!   so commands for different instruments run in parallel while commands
//!   for the same instrument are linearized
//! - one shared ledger mutex, taken only while a pipeline lock is held
//!   (or alone, for deposits and withdrawals)
//! - an order locator map (`OrderId -> Ticker`) so cancel and lookup can
//!   route to the right pipeline without scanning
//!
//! Lock acquisition order is fixed: users, then the instruments map, then
//! a pipeline, then the ledger. The locator is never held together with
//! any other lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use onebook_ledger::Ledger;
use onebook_types::{
    BalanceEntry, BookSnapshot, Instrument, InstrumentKind, OnebookError, Order, OrderId,
    OrderKind, OrderResult, OrderSide, Result, Role, Ticker, Trade, User, UserId, VenueConfig,
    constants,
};
use rust_decimal::Decimal;

use crate::pipeline::InstrumentPipeline;

/// Poisoned-lock failures collapse to an internal error; the venue holds
/// no lock across panicking code, so this is not expected in practice.
fn poisoned() -> OnebookError {
    OnebookError::Internal("lock poisoned".into())
}

/// A complete trading venue: users, instruments, balances, books, tapes.
pub struct Venue {
    config: VenueConfig,
    users: RwLock<HashMap<UserId, User>>,
    instruments: RwLock<HashMap<Ticker, Arc<Mutex<InstrumentPipeline>>>>,
    ledger: Mutex<Ledger>,
    /// Routes an order id to the instrument whose pipeline owns it.
    locator: RwLock<HashMap<OrderId, Ticker>>,
}

impl Venue {
    /// Create a venue. The configured quote asset is registered as a
    /// currency instrument up front so balances in it are ordinary entries.
    #[must_use]
    pub fn new(config: VenueConfig) -> Self {
        let quote = config.quote_asset.clone();
        let mut instruments = HashMap::new();
        instruments.insert(
            quote.clone(),
            Arc::new(Mutex::new(InstrumentPipeline::new(
                Instrument::new(quote.clone(), InstrumentKind::Currency),
                quote,
                config.max_open_orders_per_user,
            ))),
        );
        tracing::info!(quote = %config.quote_asset, "venue created");
        Self {
            config,
            users: RwLock::new(HashMap::new()),
            instruments: RwLock::new(instruments),
            ledger: Mutex::new(Ledger::new()),
            locator: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &VenueConfig {
        &self.config
    }

    // =================================================================
    // Users
    // =================================================================

    /// Register a new account and return it (including its API credential).
    pub fn register_user(&self, name: impl Into<String>, role: Role) -> Result<User> {
        let user = User::register(name, role);
        let mut users = self.users.write().map_err(|_| poisoned())?;
        users.insert(user.id, user.clone());
        tracing::info!(user = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// All registered users, ordered by registration (UUIDv7 ids sort by time).
    pub fn list_users(&self) -> Result<Vec<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        let mut out: Vec<User> = users.values().cloned().collect();
        out.sort_by_key(|u| u.id);
        Ok(out)
    }

    /// Delete a user: cancel their resting orders on every instrument,
    /// release reservations, purge their balances, orders and trades.
    pub fn admin_delete_user(&self, user_id: UserId) -> Result<User> {
        let removed_user = {
            let users = self.users.read().map_err(|_| poisoned())?;
            users
                .get(&user_id)
                .cloned()
                .ok_or(OnebookError::UserNotFound(user_id))?
        };

        let mut removed_orders: Vec<OrderId> = Vec::new();
        {
            let instruments = self.instruments.read().map_err(|_| poisoned())?;
            for arc in instruments.values() {
                let mut pipeline = arc.lock().map_err(|_| poisoned())?;
                let mut ledger = self.ledger.lock().map_err(|_| poisoned())?;
                removed_orders.extend(pipeline.remove_user(&mut ledger, user_id)?);
            }
        }
        {
            let mut ledger = self.ledger.lock().map_err(|_| poisoned())?;
            ledger.purge_user(user_id);
        }
        {
            let mut locator = self.locator.write().map_err(|_| poisoned())?;
            for order_id in &removed_orders {
                locator.remove(order_id);
            }
        }
        let mut users = self.users.write().map_err(|_| poisoned())?;
        users.remove(&user_id);
        tracing::info!(user = %user_id, orders = removed_orders.len(), "user deleted");
        Ok(removed_user)
    }

    fn require_user(&self, user_id: UserId) -> Result<User> {
        let users = self.users.read().map_err(|_| poisoned())?;
        users
            .get(&user_id)
            .cloned()
            .ok_or(OnebookError::UserNotFound(user_id))
    }

    // =================================================================
    // Instruments
    // =================================================================

    /// Register a new tradable instrument.
    pub fn admin_add_instrument(&self, instrument: Instrument) -> Result<()> {
        let mut instruments = self.instruments.write().map_err(|_| poisoned())?;
        if instruments.contains_key(&instrument.ticker) {
            return Err(OnebookError::InstrumentExists(instrument.ticker));
        }
        let ticker = instrument.ticker.clone();
        instruments.insert(
            ticker.clone(),
            Arc::new(Mutex::new(InstrumentPipeline::new(
                instrument,
                self.config.quote_asset.clone(),
                self.config.max_open_orders_per_user,
            ))),
        );
        tracing::info!(%ticker, "instrument added");
        Ok(())
    }

    /// Remove an instrument: cancel every resting order (releasing
    /// reservations), then purge all balances, orders and trades in it.
    /// The quote asset cannot be removed.
    pub fn admin_remove_instrument(&self, ticker: &Ticker) -> Result<()> {
        if *ticker == self.config.quote_asset {
            return Err(OnebookError::Forbidden);
        }

        let removed_orders = {
            let mut instruments = self.instruments.write().map_err(|_| poisoned())?;
            let arc = instruments
                .remove(ticker)
                .ok_or_else(|| OnebookError::InstrumentNotFound(ticker.clone()))?;
            let mut pipeline = arc.lock().map_err(|_| poisoned())?;
            let mut ledger = self.ledger.lock().map_err(|_| poisoned())?;
            let cancelled = pipeline.cancel_all_resting(&mut ledger)?;
            ledger.purge_asset(ticker);
            tracing::info!(%ticker, cancelled, "instrument removed");
            pipeline.order_ids()
        };

        let mut locator = self.locator.write().map_err(|_| poisoned())?;
        for order_id in &removed_orders {
            locator.remove(order_id);
        }
        Ok(())
    }

    /// All registered instruments, sorted by ticker.
    pub fn list_instruments(&self) -> Result<Vec<Instrument>> {
        let instruments = self.instruments.read().map_err(|_| poisoned())?;
        let mut out = Vec::with_capacity(instruments.len());
        for arc in instruments.values() {
            let pipeline = arc.lock().map_err(|_| poisoned())?;
            out.push(pipeline.instrument().clone());
        }
        out.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(out)
    }

    fn pipeline(&self, ticker: &Ticker) -> Result<Arc<Mutex<InstrumentPipeline>>> {
        let instruments = self.instruments.read().map_err(|_| poisoned())?;
        instruments
            .get(ticker)
            .cloned()
            .ok_or_else(|| OnebookError::InstrumentNotFound(ticker.clone()))
    }

    // =================================================================
    // Balances
    // =================================================================

    /// Credit a user's available balance in an asset.
    pub fn admin_deposit(&self, user_id: UserId, ticker: &Ticker, amount: Decimal) -> Result<()> {
        self.require_user(user_id)?;
        self.pipeline(ticker)?;
        let mut ledger = self.ledger.lock().map_err(|_| poisoned())?;
        ledger.deposit(user_id, ticker, amount)
    }

    /// Debit a user's available balance in an asset. Reserved funds cannot
    /// be withdrawn.
    pub fn admin_withdraw(&self, user_id: UserId, ticker: &Ticker, amount: Decimal) -> Result<()> {
        self.require_user(user_id)?;
        self.pipeline(ticker)?;
        let mut ledger = self.ledger.lock().map_err(|_| poisoned())?;
        ledger.withdraw(user_id, ticker, amount)
    }

    /// A user's non-zero balances, sorted by asset.
    pub fn balances(&self, user_id: UserId) -> Result<Vec<(Ticker, BalanceEntry)>> {
        self.require_user(user_id)?;
        let ledger = self.ledger.lock().map_err(|_| poisoned())?;
        Ok(ledger.balances_for(user_id))
    }

    /// Audit one asset: circulating supply must equal deposits minus
    /// withdrawals.
    pub fn verify_conservation(&self, ticker: &Ticker) -> Result<()> {
        let ledger = self.ledger.lock().map_err(|_| poisoned())?;
        ledger.verify_conservation(ticker)
    }

    // =================================================================
    // Trading
    // =================================================================

    /// Submit an order for matching.
    pub fn submit_order(
        &self,
        user_id: UserId,
        ticker: &Ticker,
        side: OrderSide,
        kind: OrderKind,
        price: Option<Decimal>,
        quantity: Decimal,
    ) -> Result<OrderResult> {
        self.require_user(user_id)?;
        let arc = self.pipeline(ticker)?;

        let result = {
            let mut pipeline = arc.lock().map_err(|_| poisoned())?;
            let mut ledger = self.ledger.lock().map_err(|_| poisoned())?;
            pipeline.submit_order(&mut ledger, user_id, side, kind, price, quantity)?
        };

        let mut locator = self.locator.write().map_err(|_| poisoned())?;
        locator.insert(result.order.id, ticker.clone());
        Ok(result)
    }

    /// Cancel a resting order. Admins may cancel any order; other callers
    /// only their own (foreign orders look nonexistent to them).
    pub fn cancel_order(&self, caller: UserId, order_id: OrderId) -> Result<Order> {
        let user = self.require_user(caller)?;
        let ticker = self.locate(order_id)?;
        let arc = self.pipeline(&ticker)?;
        let mut pipeline = arc.lock().map_err(|_| poisoned())?;
        let mut ledger = self.ledger.lock().map_err(|_| poisoned())?;
        pipeline.cancel_order(&mut ledger, order_id, caller, user.role.is_admin())
    }

    /// Fetch one order record. Callers may only see their own orders
    /// unless they are admins.
    pub fn get_order(&self, caller: UserId, order_id: OrderId) -> Result<Order> {
        let user = self.require_user(caller)?;
        let ticker = self.locate(order_id)?;
        let arc = self.pipeline(&ticker)?;
        let pipeline = arc.lock().map_err(|_| poisoned())?;
        let order = pipeline
            .get_order(&order_id)
            .ok_or(OnebookError::OrderNotFound(order_id))?;
        if order.user_id != caller && !user.role.is_admin() {
            return Err(OnebookError::Forbidden);
        }
        Ok(order.clone())
    }

    /// All of a user's orders across every instrument, newest first.
    pub fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>> {
        self.require_user(user_id)?;
        let instruments = self.instruments.read().map_err(|_| poisoned())?;
        let mut out: Vec<Order> = Vec::new();
        for arc in instruments.values() {
            let pipeline = arc.lock().map_err(|_| poisoned())?;
            out.extend(pipeline.orders_for_user(user_id));
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    fn locate(&self, order_id: OrderId) -> Result<Ticker> {
        let locator = self.locator.read().map_err(|_| poisoned())?;
        locator
            .get(&order_id)
            .cloned()
            .ok_or(OnebookError::OrderNotFound(order_id))
    }

    // =================================================================
    // Market data
    // =================================================================

    /// Aggregated book levels for an instrument. `depth` defaults to
    /// [`constants::DEFAULT_SNAPSHOT_DEPTH`] and is capped at the
    /// configured maximum; an explicit zero yields an empty snapshot.
    pub fn orderbook_snapshot(
        &self,
        ticker: &Ticker,
        depth: Option<usize>,
    ) -> Result<BookSnapshot> {
        let depth = depth
            .unwrap_or(constants::DEFAULT_SNAPSHOT_DEPTH)
            .min(self.config.max_snapshot_depth);
        let arc = self.pipeline(ticker)?;
        let pipeline = arc.lock().map_err(|_| poisoned())?;
        Ok(pipeline.snapshot(depth))
    }

    /// Recent trades for an instrument, newest first. `limit` defaults to
    /// [`constants::DEFAULT_TRADE_HISTORY_LIMIT`] and is capped at the
    /// configured maximum; an explicit zero yields no trades.
    pub fn trade_history(&self, ticker: &Ticker, limit: Option<usize>) -> Result<Vec<Trade>> {
        let limit = limit
            .unwrap_or(constants::DEFAULT_TRADE_HISTORY_LIMIT)
            .min(self.config.max_trade_history);
        let arc = self.pipeline(ticker)?;
        let pipeline = arc.lock().map_err(|_| poisoned())?;
        Ok(pipeline.trade_history(limit))
    }
}

impl Default for Venue {
    fn default() -> Self {
        Self::new(VenueConfig::default())
    }
}
