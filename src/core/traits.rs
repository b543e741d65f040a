//! Store abstractions consumed by the ledger core
//!
//! This module defines the trait seams for the key-value store clients the
//! ledger coordinates. The core never talks to a store directly; it is
//! generic over these traits, so tests substitute in-memory fakes and a
//! deployment substitutes real store clients.
//!
//! All methods take `&self`: implementations are expected to be internally
//! synchronized (the in-memory ones use concurrent maps). Store failures
//! are reported as [`LedgerError::StoreUnavailable`].

use crate::types::{
    AssetBalance, Balance, LedgerError, LedgerTransaction, LockRecord, LockToken, Order, OrderId,
    OrderStatus, UserId,
};

/// Access to per-user cash balance records
pub trait BalanceStore {
    /// Read a user's balance
    ///
    /// A user with no stored record yet reads as a zero balance; the first
    /// committed mutation creates the record.
    fn get(&self, user_id: UserId) -> Result<Balance, LedgerError>;

    /// Write a user's balance, replacing any existing record
    fn put(&self, balance: Balance) -> Result<(), LedgerError>;
}

/// Access to per-(user, asset) holding records
pub trait AssetBalanceStore {
    /// Read a user's holding of one asset, if a record exists
    fn get(&self, user_id: UserId, asset_id: &str) -> Result<Option<AssetBalance>, LedgerError>;

    /// Write a holding record, replacing any existing one
    fn put(&self, balance: AssetBalance) -> Result<(), LedgerError>;
}

/// Access to order records
///
/// Orders are never deleted; the ledger only creates them and drives their
/// status forward.
pub trait OrderStore {
    /// Persist a new order row
    fn create(&self, order: Order) -> Result<(), LedgerError>;

    /// Move an existing order to `status`
    fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), LedgerError>;
}

/// Append-only transaction history
pub trait TransactionHistoryStore {
    /// Append one audit record
    fn append(&self, record: LedgerTransaction) -> Result<(), LedgerError>;
}

/// Conditional-write lock records
///
/// The store must offer an atomic create-if-no-live-lock; approximating it
/// with a read followed by a write would reintroduce the race this layer
/// exists to close.
pub trait LockStore {
    /// Create `record` only if no live (non-expired) lock exists for its user
    ///
    /// Returns `true` when the record was written, `false` when a live lock
    /// blocked it. An expired record does not block and is overwritten.
    fn conditional_create(&self, record: &LockRecord) -> Result<bool, LedgerError>;

    /// Delete the user's lock only if the stored token matches
    ///
    /// Returns `true` when a record was deleted. A mismatch means the lock
    /// expired and was re-acquired by someone else; the caller must leave
    /// it alone.
    fn delete_if_token_matches(&self, user_id: UserId, token: LockToken)
        -> Result<bool, LedgerError>;
}
