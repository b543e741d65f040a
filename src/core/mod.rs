//! Core business logic module
//!
//! This module contains the atomicity-layer components:
//! - `traits` - store abstractions the core is generic over
//! - `lock_manager` - per-user distributed locking and the scoped guard
//! - `engine` - validate/execute/compensate orchestration per operation

pub mod engine;
pub mod lock_manager;
pub mod traits;

pub use engine::{InMemoryTransactionEngine, TransactionEngine};
pub use lock_manager::{LockGuard, LockManager};
pub use traits::{
    AssetBalanceStore, BalanceStore, LockStore, OrderStore, TransactionHistoryStore,
};
