//! The balance ledger.
//!
//! Tracks per-(user, instrument) balances with available/reserved
//! accounting. All mutations are atomic: either the full operation
//! succeeds or every touched entry is unchanged. No operation may observe
//! or produce a negative available/reserved value.

use std::collections::HashMap;

use onebook_types::{BalanceEntry, OnebookError, Result, Ticker, UserId};
use rust_decimal::Decimal;

use crate::Conservation;

/// Source of truth for all balance state.
///
/// Balances change only through the operations below — the engine never
/// touches entries directly. Deposits and withdrawals feed the
/// [`Conservation`] auditor; reserve/release/settle move value between
/// columns and users without changing per-asset supply.
pub struct Ledger {
    /// Per-(user, instrument) balances.
    balances: HashMap<(UserId, Ticker), BalanceEntry>,
    /// Supply auditor.
    conservation: Conservation,
}

impl Ledger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
            conservation: Conservation::new(),
        }
    }

    // =================================================================
    // Supply changes (admin)
    // =================================================================

    /// Deposit funds (increases available balance).
    ///
    /// # Errors
    /// Returns `InvalidAmount` if `amount` is not strictly positive.
    pub fn deposit(&mut self, user_id: UserId, asset: &Ticker, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(OnebookError::InvalidAmount { amount });
        }
        let entry = self
            .balances
            .entry((user_id, asset.clone()))
            .or_default();
        entry.available += amount;
        self.conservation.record_deposit(asset, amount);
        Ok(())
    }

    /// Withdraw funds from the available balance.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if `amount` is not strictly positive, or
    /// `InsufficientFunds` if available < amount.
    pub fn withdraw(&mut self, user_id: UserId, asset: &Ticker, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(OnebookError::InvalidAmount { amount });
        }
        let entry = self.available_entry(user_id, asset, amount)?;
        entry.available -= amount;
        self.conservation.record_withdrawal(asset, amount);
        Ok(())
    }

    // =================================================================
    // Order funding
    // =================================================================

    /// Move `amount` from available to reserved.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if available < amount.
    pub fn reserve(&mut self, user_id: UserId, asset: &Ticker, amount: Decimal) -> Result<()> {
        let entry = self.available_entry(user_id, asset, amount)?;
        entry.available -= amount;
        entry.reserved += amount;
        Ok(())
    }

    /// Move `amount` from reserved back to available.
    ///
    /// A zero amount is a no-op. Underflow is the programming-error class:
    /// valid call sequences never release more than was reserved.
    ///
    /// # Errors
    /// Returns `ReservedUnderflow` if reserved < amount.
    pub fn release(&mut self, user_id: UserId, asset: &Ticker, amount: Decimal) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let entry = self.reserved_entry(user_id, asset, amount)?;
        entry.reserved -= amount;
        entry.available += amount;
        Ok(())
    }

    /// Move `amount` out of `from`'s reserved balance into `to`'s
    /// available balance. The settlement half-leg of a trade.
    ///
    /// # Errors
    /// Returns `ReservedUnderflow` if `from`'s reserved < amount.
    pub fn settle(
        &mut self,
        from: UserId,
        to: UserId,
        asset: &Ticker,
        amount: Decimal,
    ) -> Result<()> {
        {
            let entry = self.reserved_entry(from, asset, amount)?;
            entry.reserved -= amount;
        }
        let entry = self.balances.entry((to, asset.clone())).or_default();
        entry.available += amount;
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Get the balance for a (user, instrument) pair.
    #[must_use]
    pub fn balance(&self, user_id: UserId, asset: &Ticker) -> BalanceEntry {
        self.balances
            .get(&(user_id, asset.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// All non-zero balances for a user.
    #[must_use]
    pub fn balances_for(&self, user_id: UserId) -> Vec<(Ticker, BalanceEntry)> {
        let mut out: Vec<(Ticker, BalanceEntry)> = self
            .balances
            .iter()
            .filter(|((uid, _), entry)| *uid == user_id && !entry.is_zero())
            .map(|((_, asset), entry)| (asset.clone(), entry.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Total supply of an asset (sum of all users' available + reserved).
    #[must_use]
    pub fn total_supply(&self, asset: &Ticker) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, entry)| entry.total())
            .sum()
    }

    /// Verify the conservation invariant for an asset.
    pub fn verify_conservation(&self, asset: &Ticker) -> Result<()> {
        self.conservation.verify(asset, self.total_supply(asset))
    }

    // =================================================================
    // Cascade purges
    // =================================================================

    /// Remove every balance a user holds. Removed totals are recorded as
    /// withdrawals so conservation still verifies afterwards.
    pub fn purge_user(&mut self, user_id: UserId) {
        let removed: Vec<(Ticker, Decimal)> = self
            .balances
            .iter()
            .filter(|((uid, _), _)| *uid == user_id)
            .map(|((_, asset), entry)| (asset.clone(), entry.total()))
            .collect();
        for (asset, total) in removed {
            if total > Decimal::ZERO {
                self.conservation.record_withdrawal(&asset, total);
            }
            self.balances.remove(&(user_id, asset));
        }
    }

    /// Remove every balance in an asset along with its supply history
    /// (instrument cascade removal).
    pub fn purge_asset(&mut self, asset: &Ticker) {
        self.balances.retain(|(_, a), _| a != asset);
        self.conservation.forget_asset(asset);
    }

    // =================================================================
    // Internals
    // =================================================================

    fn available_entry(
        &mut self,
        user_id: UserId,
        asset: &Ticker,
        amount: Decimal,
    ) -> Result<&mut BalanceEntry> {
        let available = self
            .balances
            .get(&(user_id, asset.clone()))
            .map_or(Decimal::ZERO, |e| e.available);
        if available < amount {
            return Err(OnebookError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        Ok(self.balances.entry((user_id, asset.clone())).or_default())
    }

    fn reserved_entry(
        &mut self,
        user_id: UserId,
        asset: &Ticker,
        amount: Decimal,
    ) -> Result<&mut BalanceEntry> {
        let reserved = self
            .balances
            .get(&(user_id, asset.clone()))
            .map_or(Decimal::ZERO, |e| e.reserved);
        if reserved < amount {
            tracing::warn!(
                user = %user_id,
                asset = %asset,
                %reserved,
                requested = %amount,
                "reserved balance underflow"
            );
            return Err(OnebookError::ReservedUnderflow {
                user: user_id,
                asset: asset.clone(),
                reserved,
                requested: amount,
            });
        }
        Ok(self.balances.entry((user_id, asset.clone())).or_default())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
