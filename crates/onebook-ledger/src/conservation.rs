//! Supply conservation invariant checker.
//!
//! Mathematical invariant enforced after settlement:
//! ```text
//! ∀ asset: Σ(available + reserved) == Σ(deposits) - Σ(withdrawals)
//! ```
//!
//! Matching must never create or destroy balance; only admin deposits and
//! withdrawals (and cascade purges, recorded as withdrawals) change the
//! expected supply. A violation means something has gone catastrophically
//! wrong and aborts the enclosing operation.

use std::collections::HashMap;

use onebook_types::{OnebookError, Result, Ticker};
use rust_decimal::Decimal;

/// Tracks per-asset supply totals and validates conservation.
pub struct Conservation {
    /// Total deposits per asset since genesis.
    deposits: HashMap<Ticker, Decimal>,
    /// Total withdrawals per asset since genesis.
    withdrawals: HashMap<Ticker, Decimal>,
}

impl Conservation {
    /// Create a new conservation tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deposits: HashMap::new(),
            withdrawals: HashMap::new(),
        }
    }

    /// Record a deposit.
    pub fn record_deposit(&mut self, asset: &Ticker, amount: Decimal) {
        *self
            .deposits
            .entry(asset.clone())
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Record a withdrawal (admin withdraw or cascade purge).
    pub fn record_withdrawal(&mut self, asset: &Ticker, amount: Decimal) {
        *self
            .withdrawals
            .entry(asset.clone())
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Expected total supply for an asset: deposits - withdrawals.
    #[must_use]
    pub fn expected_supply(&self, asset: &Ticker) -> Decimal {
        let deposited = self.deposits.get(asset).copied().unwrap_or(Decimal::ZERO);
        let withdrawn = self
            .withdrawals
            .get(asset)
            .copied()
            .unwrap_or(Decimal::ZERO);
        deposited - withdrawn
    }

    /// Forget an asset entirely (instrument cascade removal).
    pub fn forget_asset(&mut self, asset: &Ticker) {
        self.deposits.remove(asset);
        self.withdrawals.remove(asset);
    }

    /// Verify that the actual supply (sum of all user balances) matches
    /// the expected supply for a given asset.
    ///
    /// # Errors
    /// Returns [`OnebookError::ConservationViolation`] if actual ≠ expected.
    pub fn verify(&self, asset: &Ticker, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(asset);
        if actual_supply != expected {
            return Err(OnebookError::ConservationViolation {
                reason: format!(
                    "Asset {asset}: actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.deposits.get(asset).copied().unwrap_or(Decimal::ZERO),
                    self.withdrawals
                        .get(asset)
                        .copied()
                        .unwrap_or(Decimal::ZERO),
                ),
            });
        }
        Ok(())
    }

    /// Total deposits for an asset.
    #[must_use]
    pub fn total_deposits(&self, asset: &Ticker) -> Decimal {
        self.deposits.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    /// Total withdrawals for an asset.
    #[must_use]
    pub fn total_withdrawals(&self, asset: &Ticker) -> Decimal {
        self.withdrawals
            .get(asset)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

impl Default for Conservation {
    fn default() -> Self {
        Self::new()
    }
}
