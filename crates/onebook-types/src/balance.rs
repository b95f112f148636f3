//! Per-(user, asset) balance entry.
//!
//! A balance has two columns. `available` is what new orders and
//! withdrawals can draw on. `reserved` backs resting orders: the ledger
//! moves funds there when an order is accepted and only settlement or
//! cancellation moves them out. The conservation invariant is stated over
//! [`BalanceEntry::total`], so shifting funds between the columns never
//! changes an asset's supply.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The two-column balance the ledger keeps per (user, asset).
///
/// Mutated only through ledger operations; both columns stay non-negative
/// through every valid call sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    /// Spendable right now: order funding and withdrawals draw from here.
    pub available: Decimal,
    /// Held against resting orders until they settle or are cancelled.
    pub reserved: Decimal,
}

impl BalanceEntry {
    /// The user's full position in the asset; what supply audits sum.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.available + self.reserved
    }

    /// `true` when both columns are zero. Zero entries are elided from
    /// balance listings.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.reserved.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(available: i64, reserved: i64) -> BalanceEntry {
        BalanceEntry {
            available: Decimal::new(available, 0),
            reserved: Decimal::new(reserved, 0),
        }
    }

    #[test]
    fn total_is_invariant_under_reservation() {
        // Reserving shifts funds between columns; the supply-audit view
        // must not move.
        let before = entry(1000, 0);
        let after = entry(600, 400);
        assert_eq!(before.total(), after.total());
    }

    #[test]
    fn is_zero_requires_both_columns_empty() {
        assert!(BalanceEntry::default().is_zero());
        assert!(!entry(1, 0).is_zero());
        // A fully reserved balance is still a position, not an empty entry.
        assert!(!entry(0, 1).is_zero());
    }

    #[test]
    fn amounts_serialize_as_decimal_strings() {
        let json = serde_json::to_string(&entry(150, 25)).unwrap();
        assert!(json.contains("\"150\""), "got: {json}");
        let back: BalanceEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.reserved, Decimal::new(25, 0));
    }
}
