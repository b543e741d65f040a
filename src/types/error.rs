//! Error types for the trading ledger
//!
//! This module defines all errors the atomicity layer can surface to its
//! callers. Errors are designed to map onto a small set of stable kinds
//! (see [`ErrorKind`]) so an API layer can translate them without matching
//! on every variant.
//!
//! # Error Categories
//!
//! - **Lock contention**: another operation is already in flight for the
//!   user — the caller should ask its own caller to retry, not retry
//!   silently.
//! - **Business validation**: insufficient balance or holdings, detected
//!   under the lock against freshly read state; not a system fault.
//! - **Invalid parameters**: non-positive amounts or quantities, blank
//!   asset ids, amounts too large to represent.
//! - **Store failures**: the underlying key-value store failed a read or
//!   write; the only category that can occur mid-operation and therefore
//!   the only one that triggers compensation.

use rust_decimal::Decimal;
use thiserror::Error;

use super::balance::UserId;
use super::lock::OperationKind;

/// Stable error kinds exposed to API layers
///
/// Collapses the error variants onto the taxonomy callers are expected to
/// branch on. `LockHeld` should surface as "try again shortly" rather than
/// a generic server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Another operation holds the user's lock
    LockHeld,

    /// Not enough cash for the requested operation
    InsufficientBalance,

    /// Not enough asset quantity for the requested operation
    InsufficientAssetQuantity,

    /// The request itself is malformed
    InvalidParameters,

    /// The underlying store failed a read or write
    StoreUnavailable,
}

/// Main error type for the trading ledger
///
/// Each variant carries enough context to produce a useful message for the
/// caller and a log line for the operator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Another operation is in progress for this user
    ///
    /// The lock manager does not queue or retry; the caller decides whether
    /// to surface "operation in progress" upstream.
    #[error("Another operation is in progress for user {user} (requested: {operation})")]
    LockHeld {
        /// User whose lock is held
        user: UserId,
        /// The operation that failed to acquire
        operation: OperationKind,
    },

    /// Insufficient cash balance, evaluated under the user's lock
    #[error("Insufficient balance for user {user}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// User whose balance was checked
        user: UserId,
        /// Balance at validation time
        available: Decimal,
        /// Amount the operation needed
        requested: Decimal,
    },

    /// Insufficient asset holdings, evaluated under the user's lock
    #[error("Insufficient {asset} quantity for user {user}: held {held}, requested {requested}")]
    InsufficientAssetQuantity {
        /// User whose holding was checked
        user: UserId,
        /// Asset being sold
        asset: String,
        /// Quantity held at validation time
        held: Decimal,
        /// Quantity the order needed
        requested: Decimal,
    },

    /// Non-positive amount or quantity
    ///
    /// Detected before the lock is acquired; no state has been touched.
    #[error("Invalid amount {amount} for {operation}: must be positive")]
    InvalidAmount {
        /// Operation being attempted
        operation: OperationKind,
        /// The offending amount or quantity
        amount: Decimal,
    },

    /// Blank or unusable asset identifier
    #[error("Invalid asset id '{asset}'")]
    InvalidAsset {
        /// The offending asset id
        asset: String,
    },

    /// A balance computation would overflow `Decimal`
    #[error("Arithmetic overflow in {operation} for user {user}")]
    ArithmeticOverflow {
        /// Operation whose arithmetic overflowed
        operation: OperationKind,
        /// User whose record was being mutated
        user: UserId,
    },

    /// The underlying key-value store failed a read or write
    ///
    /// The only error that can occur after mutations have been applied;
    /// order operations respond by compensating already-applied writes.
    #[error("{store} store unavailable during {operation}: {message}")]
    StoreUnavailable {
        /// Which store failed (balance, asset-balance, order, history, lock)
        store: String,
        /// The store call that failed
        operation: String,
        /// Description from the store client
        message: String,
    },
}

impl LedgerError {
    /// The stable kind an API layer should branch on
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::LockHeld { .. } => ErrorKind::LockHeld,
            LedgerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            LedgerError::InsufficientAssetQuantity { .. } => ErrorKind::InsufficientAssetQuantity,
            LedgerError::InvalidAmount { .. }
            | LedgerError::InvalidAsset { .. }
            | LedgerError::ArithmeticOverflow { .. } => ErrorKind::InvalidParameters,
            LedgerError::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
        }
    }

    /// Create a LockHeld error
    pub fn lock_held(user: UserId, operation: OperationKind) -> Self {
        LedgerError::LockHeld { user, operation }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(user: UserId, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientBalance {
            user,
            available,
            requested,
        }
    }

    /// Create an InsufficientAssetQuantity error
    pub fn insufficient_asset_quantity(
        user: UserId,
        asset: &str,
        held: Decimal,
        requested: Decimal,
    ) -> Self {
        LedgerError::InsufficientAssetQuantity {
            user,
            asset: asset.to_string(),
            held,
            requested,
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(operation: OperationKind, amount: Decimal) -> Self {
        LedgerError::InvalidAmount { operation, amount }
    }

    /// Create an InvalidAsset error
    pub fn invalid_asset(asset: &str) -> Self {
        LedgerError::InvalidAsset {
            asset: asset.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: OperationKind, user: UserId) -> Self {
        LedgerError::ArithmeticOverflow { operation, user }
    }

    /// Create a StoreUnavailable error
    pub fn store_unavailable(store: &str, operation: &str, message: &str) -> Self {
        LedgerError::StoreUnavailable {
            store: store.to_string(),
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }
}
