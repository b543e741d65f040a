//! In-memory store implementations
//!
//! DashMap-backed implementations of every store trait, suitable for tests
//! and for embedding the ledger without an external key-value store. All
//! handles are cheap clones sharing the same underlying maps, so a test
//! can keep a handle for inspection while the engine owns another.
//!
//! # Thread Safety
//!
//! DashMap provides fine-grained locking through internal sharding; the
//! lock store leans on that to make `conditional_create` a true
//! compare-and-swap (the live-check and the insert happen under one shard
//! entry lock).

use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::core::traits::{
    AssetBalanceStore, BalanceStore, LockStore, OrderStore, TransactionHistoryStore,
};
use crate::types::{
    AssetBalance, AssetId, Balance, LedgerError, LedgerTransaction, LockRecord, LockToken, Order,
    OrderId, OrderStatus, UserId,
};

/// In-memory cash balance records
#[derive(Debug, Clone, Default)]
pub struct InMemoryBalanceStore {
    records: Arc<DashMap<UserId, Balance>>,
}

impl InMemoryBalanceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl BalanceStore for InMemoryBalanceStore {
    fn get(&self, user_id: UserId) -> Result<Balance, LedgerError> {
        Ok(self
            .records
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| Balance::new(user_id)))
    }

    fn put(&self, balance: Balance) -> Result<(), LedgerError> {
        self.records.insert(balance.user_id, balance);
        Ok(())
    }
}

/// In-memory per-(user, asset) holding records
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetBalanceStore {
    records: Arc<DashMap<(UserId, AssetId), AssetBalance>>,
}

impl InMemoryAssetBalanceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetBalanceStore for InMemoryAssetBalanceStore {
    fn get(&self, user_id: UserId, asset_id: &str) -> Result<Option<AssetBalance>, LedgerError> {
        Ok(self
            .records
            .get(&(user_id, asset_id.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn put(&self, balance: AssetBalance) -> Result<(), LedgerError> {
        self.records
            .insert((balance.user_id, balance.asset_id.clone()), balance);
        Ok(())
    }
}

/// In-memory order records
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    records: Arc<DashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one order, for assertions
    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.records.get(&order_id).map(|entry| entry.value().clone())
    }

    /// All of a user's orders, oldest first
    pub fn orders_for(&self, user_id: UserId) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .records
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|order| order.created_at);
        orders
    }
}

impl OrderStore for InMemoryOrderStore {
    fn create(&self, order: Order) -> Result<(), LedgerError> {
        self.records.insert(order.order_id, order);
        Ok(())
    }

    fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), LedgerError> {
        match self.records.get_mut(&order_id) {
            Some(mut entry) => {
                let order = entry.value_mut();
                order.status = status;
                order.updated_at = SystemTime::now();
                Ok(())
            }
            None => Err(LedgerError::store_unavailable(
                "order",
                "update_status",
                &format!("order {order_id} not found"),
            )),
        }
    }
}

/// In-memory append-only transaction history
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionHistoryStore {
    records: Arc<Mutex<Vec<LedgerTransaction>>>,
}

impl InMemoryTransactionHistoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// All of a user's records in append order, for assertions
    pub fn records_for(&self, user_id: UserId) -> Vec<LedgerTransaction> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Total number of appended records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no records have been appended
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl TransactionHistoryStore for InMemoryTransactionHistoryStore {
    fn append(&self, record: LedgerTransaction) -> Result<(), LedgerError> {
        self.records.lock().push(record);
        Ok(())
    }
}

/// In-memory lock records with conditional-create semantics
#[derive(Debug, Clone, Default)]
pub struct InMemoryLockStore {
    records: Arc<DashMap<UserId, LockRecord>>,
}

impl InMemoryLockStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockStore for InMemoryLockStore {
    fn conditional_create(&self, record: &LockRecord) -> Result<bool, LedgerError> {
        let now = SystemTime::now();
        // The entry handle holds the shard lock, so the live-check and the
        // insert are one atomic step.
        let mut entry = self
            .records
            .entry(record.user_id)
            .or_insert_with(|| record.clone());
        if entry.token == record.token {
            return Ok(true);
        }
        if entry.is_live(now) {
            return Ok(false);
        }
        *entry.value_mut() = record.clone();
        Ok(true)
    }

    fn delete_if_token_matches(
        &self,
        user_id: UserId,
        token: LockToken,
    ) -> Result<bool, LedgerError> {
        Ok(self
            .records
            .remove_if(&user_id, |_, record| record.token == token)
            .is_some())
    }
}
