//! Store implementations
//!
//! Only the in-memory reference implementations live in this crate; real
//! deployments implement the `core::traits` seams against their own
//! key-value store clients.

pub mod memory;

pub use memory::{
    InMemoryAssetBalanceStore, InMemoryBalanceStore, InMemoryLockStore, InMemoryOrderStore,
    InMemoryTransactionHistoryStore,
};
