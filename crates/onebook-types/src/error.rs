//! Error types for the Onebook matching engine.
//!
//! All errors use the `OB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Balance errors
//! - 3xx: Instrument errors
//! - 4xx: User errors
//! - 5xx: Matching errors
//! - 8xx: Invariant violations (programming-error class)
//! - 9xx: General / internal errors
//!
//! Validation and lookup failures (1xx–5xx) are recoverable and mutate
//! nothing. The 8xx class must never be reachable through valid call
//! sequences; on detection it aborts the enclosing operation only and is
//! surfaced for operator investigation.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{OrderId, Ticker, UserId};

/// Central error enum for all Onebook operations.
#[derive(Debug, Error)]
pub enum OnebookError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The requested order was not found (or is not visible to the caller).
    #[error("OB_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order failed validation (missing price, non-positive values, etc.).
    #[error("OB_ERR_101: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// An order with this ID already exists in the book.
    #[error("OB_ERR_102: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order cannot be cancelled in its current state.
    #[error("OB_ERR_103: Order cannot be cancelled in current state")]
    OrderNotCancellable,

    /// The caller may not perform this operation on the targeted entity.
    #[error("OB_ERR_104: Forbidden: operation not permitted for this caller")]
    Forbidden,

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough available balance to reserve or withdraw.
    #[error("OB_ERR_200: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    /// Deposit/withdraw amount must be strictly positive.
    #[error("OB_ERR_201: Invalid amount: {amount} (must be > 0)")]
    InvalidAmount { amount: Decimal },

    // =================================================================
    // Instrument Errors (3xx)
    // =================================================================
    /// Unknown instrument ticker.
    #[error("OB_ERR_300: Instrument not found: {0}")]
    InstrumentNotFound(Ticker),

    /// An instrument with this ticker already exists.
    #[error("OB_ERR_301: Instrument already exists: {0}")]
    InstrumentExists(Ticker),

    // =================================================================
    // User Errors (4xx)
    // =================================================================
    /// Unknown user id.
    #[error("OB_ERR_400: User not found: {0}")]
    UserNotFound(UserId),

    // =================================================================
    // Matching Errors (5xx)
    // =================================================================
    /// A market order found no liquidity on the opposite side.
    #[error("OB_ERR_500: Unfillable: no liquidity for market order on {0}")]
    Unfillable(Ticker),

    // =================================================================
    // Invariant Violations (8xx) — programming-error class
    // =================================================================
    /// A release/settle would underflow a reserved balance.
    #[error("OB_ERR_800: Reserved balance underflow for user {user} asset {asset}: \
             reserved {reserved}, requested {requested}")]
    ReservedUnderflow {
        user: UserId,
        asset: Ticker,
        reserved: Decimal,
        requested: Decimal,
    },

    /// Per-asset supply no longer equals deposits minus withdrawals.
    #[error("OB_ERR_801: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("OB_ERR_900: Internal error: {0}")]
    Internal(String),
}

impl OnebookError {
    /// Whether this error belongs to the invariant-violation class that
    /// must be surfaced for operator investigation.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::ReservedUnderflow { .. } | Self::ConservationViolation { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OnebookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = OnebookError::OrderNotFound(OrderId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("OB_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn insufficient_funds_display() {
        let err = OnebookError::InsufficientFunds {
            needed: Decimal::new(100, 0),
            available: Decimal::new(50, 0),
        };
        let msg = format!("{err}");
        assert!(msg.contains("OB_ERR_200"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn invariant_classification() {
        let underflow = OnebookError::ReservedUnderflow {
            user: UserId::new(),
            asset: Ticker::new("USD"),
            reserved: Decimal::ZERO,
            requested: Decimal::ONE,
        };
        assert!(underflow.is_invariant_violation());
        assert!(
            OnebookError::ConservationViolation { reason: "x".into() }.is_invariant_violation()
        );
        assert!(!OnebookError::OrderNotCancellable.is_invariant_violation());
        assert!(!OnebookError::Forbidden.is_invariant_violation());
    }

    #[test]
    fn all_errors_have_ob_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(OnebookError::OrderNotCancellable),
            Box::new(OnebookError::Forbidden),
            Box::new(OnebookError::InvalidAmount { amount: Decimal::ZERO }),
            Box::new(OnebookError::InstrumentNotFound(Ticker::new("XYZ"))),
            Box::new(OnebookError::Unfillable(Ticker::new("XYZ"))),
            Box::new(OnebookError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("OB_ERR_"),
                "Error missing OB_ERR_ prefix: {msg}"
            );
        }
    }
}
