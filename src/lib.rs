//! Trading Ledger Library
//! # Overview
//!
//! This library provides an atomicity layer over a schemaless key-value
//! store that lacks cross-item transactions: a per-user distributed lock
//! plus a transaction orchestrator that coordinates multi-step financial
//! mutations (cash balance, per-asset holdings, order records) so that
//! concurrent requests for the same user cannot observe or produce an
//! inconsistent state.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Balance, Order, LedgerTransaction, etc.)
//! - [`core`] - Business logic components:
//!   - [`core::lock_manager`] - Per-user locking via conditional writes,
//!     with a scoped guard that releases on every exit path
//!   - [`core::engine`] - Transaction orchestration: validate, execute,
//!     compensate on failure
//!   - [`core::traits`] - Store abstractions the core is generic over
//! - [`store`] - In-memory reference store implementations
//!
//! # Operations
//!
//! The engine exposes four operations, each serialized per user by the
//! lock manager:
//!
//! - **Deposit**: Credit cash to a user's balance
//! - **Withdraw**: Debit cash (requires sufficient balance, validated
//!   under the lock)
//! - **Buy order**: Debit cash, credit asset holdings, audit both sides
//! - **Sell order**: Debit asset holdings, credit cash, audit both sides
//!
//! # Concurrency Model
//!
//! Acquire is the sole contention point and it does not block: a request
//! that loses the conditional write fails immediately with `LockHeld`
//! rather than queueing. All mutations for a user are totally ordered by
//! lock acquisition; there is no ordering across users. Locks carry a
//! time-to-live and self-expire, so no background sweeper exists — and a
//! lock can lapse while its operation still runs, which is an accepted,
//! documented gap of this design.

// Module declarations
pub mod core;
pub mod store;
pub mod types;

pub use crate::core::{
    AssetBalanceStore, BalanceStore, InMemoryTransactionEngine, LockGuard, LockManager, LockStore,
    OrderStore, TransactionEngine, TransactionHistoryStore,
};
pub use types::{
    AssetBalance, AssetId, Balance, BalanceReceipt, ErrorKind, LedgerError, LedgerTransaction,
    LockRecord, LockToken, OperationKind, Order, OrderId, OrderKind, OrderReceipt, OrderStatus,
    TransactionId, TransactionKind, TransactionStatus, UserId,
};
