//! Transaction orchestration
//!
//! This module provides the `TransactionEngine`, which sequences every
//! multi-step financial mutation as validate -> execute -> (compensate on
//! failure), holding the user's lock across the whole sequence.
//!
//! # Phase structure
//!
//! Parameter validation happens before the lock is acquired; state
//! validation (balance and holding sufficiency) happens under the lock
//! against freshly read records, which is what closes the stale-read race
//! between concurrent requests. Store failures after a mutation has been
//! applied trigger compensating writes that restore the prior records
//! before the lock is released. There are no automatic retries: a failed
//! compensating write surfaces as-is.

use std::time::SystemTime;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::core::lock_manager::LockManager;
use crate::core::traits::{
    AssetBalanceStore, BalanceStore, LockStore, OrderStore, TransactionHistoryStore,
};
use crate::store::memory::{
    InMemoryAssetBalanceStore, InMemoryBalanceStore, InMemoryLockStore, InMemoryOrderStore,
    InMemoryTransactionHistoryStore,
};
use crate::types::{
    AssetBalance, Balance, BalanceReceipt, LedgerError, LedgerTransaction, OperationKind, Order,
    OrderKind, OrderReceipt, OrderStatus, TransactionKind, UserId,
};

/// Orchestrates per-user financial mutations over injected stores
///
/// Every operation acquires the user's lock, validates against current
/// store state, applies its writes, and releases the lock (via guard drop)
/// on every path. The engine is the only writer of order and history
/// records during a locked operation; balances and holdings are
/// read-validated then written exactly once per operation.
pub struct TransactionEngine<B, A, O, T, L>
where
    L: LockStore,
{
    balances: B,
    asset_balances: A,
    orders: O,
    history: T,
    locks: LockManager<L>,
}

/// Engine wired to the in-memory stores
pub type InMemoryTransactionEngine = TransactionEngine<
    InMemoryBalanceStore,
    InMemoryAssetBalanceStore,
    InMemoryOrderStore,
    InMemoryTransactionHistoryStore,
    InMemoryLockStore,
>;

impl
    TransactionEngine<
        InMemoryBalanceStore,
        InMemoryAssetBalanceStore,
        InMemoryOrderStore,
        InMemoryTransactionHistoryStore,
        InMemoryLockStore,
    >
{
    /// Create an engine backed entirely by in-memory stores
    ///
    /// Intended for tests and embedding; the store handles are cheap to
    /// clone, so callers can keep copies for inspection.
    pub fn in_memory() -> Self {
        TransactionEngine::new(
            InMemoryBalanceStore::new(),
            InMemoryAssetBalanceStore::new(),
            InMemoryOrderStore::new(),
            InMemoryTransactionHistoryStore::new(),
            InMemoryLockStore::new(),
        )
    }
}

impl<B, A, O, T, L> TransactionEngine<B, A, O, T, L>
where
    B: BalanceStore,
    A: AssetBalanceStore,
    O: OrderStore,
    T: TransactionHistoryStore,
    L: LockStore,
{
    /// Create an engine over the given store clients
    pub fn new(balances: B, asset_balances: A, orders: O, history: T, lock_store: L) -> Self {
        TransactionEngine {
            balances,
            asset_balances,
            orders,
            history,
            locks: LockManager::new(lock_store),
        }
    }

    /// Credit cash to a user's balance
    ///
    /// Not idempotent: two identical deposits apply two independent
    /// credits.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for non-positive amounts (checked before locking),
    /// `LockHeld` when another operation is in flight for the user,
    /// `StoreUnavailable` on store failure.
    pub fn deposit(&self, user_id: UserId, amount: Decimal) -> Result<BalanceReceipt, LedgerError> {
        let op = OperationKind::Deposit;
        validate_positive(op, amount)?;

        let _guard = self.locks.acquire(user_id, op)?;

        let balance = self.balances.get(user_id)?;
        let before = balance.current_balance;
        let after = before
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow(op, user_id))?;

        let now = SystemTime::now();
        self.balances.put(Balance {
            user_id,
            current_balance: after,
            updated_at: now,
        })?;

        let record =
            LedgerTransaction::cash(user_id, TransactionKind::Deposit, amount, before, after, None, now);
        let transaction_id = record.transaction_id;
        self.history.append(record)?;

        info!(user_id, %amount, balance_after = %after, "deposit committed");
        Ok(BalanceReceipt {
            transaction_id,
            user_id,
            balance_before: before,
            balance_after: after,
        })
    }

    /// Debit cash from a user's balance
    ///
    /// Sufficiency is validated under the lock against the freshly read
    /// balance: of two concurrent withdrawals that each look covered
    /// against a stale read, the second to acquire the lock sees the
    /// already-debited balance and fails correctly.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `LockHeld`, `InsufficientBalance`,
    /// `StoreUnavailable`.
    pub fn withdraw(&self, user_id: UserId, amount: Decimal) -> Result<BalanceReceipt, LedgerError> {
        let op = OperationKind::Withdraw;
        validate_positive(op, amount)?;

        let _guard = self.locks.acquire(user_id, op)?;

        let balance = self.balances.get(user_id)?;
        let before = balance.current_balance;
        if before < amount {
            return Err(LedgerError::insufficient_balance(user_id, before, amount));
        }
        let after = before
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow(op, user_id))?;

        let now = SystemTime::now();
        self.balances.put(Balance {
            user_id,
            current_balance: after,
            updated_at: now,
        })?;

        let record = LedgerTransaction::cash(
            user_id,
            TransactionKind::Withdraw,
            amount,
            before,
            after,
            None,
            now,
        );
        let transaction_id = record.transaction_id;
        self.history.append(record)?;

        info!(user_id, %amount, balance_after = %after, "withdrawal committed");
        Ok(BalanceReceipt {
            transaction_id,
            user_id,
            balance_before: before,
            balance_after: after,
        })
    }

    /// Buy an asset: debit cash, credit holdings
    ///
    /// The order row is created `Pending` before execution and driven to
    /// `Completed` or `Failed`; it is never deleted. Any failure after the
    /// cash debit restores the pre-debit balance (and un-credits the
    /// holding if that was already applied) before the lock is released.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`/`InvalidAsset`, `LockHeld`, `InsufficientBalance`,
    /// `StoreUnavailable`.
    pub fn buy_order(
        &self,
        user_id: UserId,
        asset_id: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderReceipt, LedgerError> {
        let op = OperationKind::BuyOrder;
        validate_order_params(op, asset_id, quantity, price)?;

        let _guard = self.locks.acquire(user_id, op)?;

        let order = Order::new(
            user_id,
            asset_id,
            OrderKind::Buy,
            quantity,
            price,
            SystemTime::now(),
        );
        self.orders.create(order.clone())?;

        match self.execute_buy(&order) {
            Ok(receipt) => {
                info!(
                    user_id,
                    order_id = %order.order_id,
                    asset_id,
                    %quantity,
                    %price,
                    "buy order completed"
                );
                Ok(receipt)
            }
            Err(err) => {
                if let Err(status_err) = self
                    .orders
                    .update_status(order.order_id, OrderStatus::Failed)
                {
                    warn!(
                        order_id = %order.order_id,
                        %status_err,
                        "could not mark failed buy order"
                    );
                }
                Err(err)
            }
        }
    }

    /// Sell an asset: debit holdings, credit cash
    ///
    /// Symmetric to [`buy_order`](Self::buy_order): holding sufficiency is
    /// validated under the lock, the order row is audit-kept in a terminal
    /// status, and partial mutations are compensated on failure.
    ///
    /// # Errors
    ///
    /// `InvalidAmount`/`InvalidAsset`, `LockHeld`,
    /// `InsufficientAssetQuantity`, `StoreUnavailable`.
    pub fn sell_order(
        &self,
        user_id: UserId,
        asset_id: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderReceipt, LedgerError> {
        let op = OperationKind::SellOrder;
        validate_order_params(op, asset_id, quantity, price)?;

        let _guard = self.locks.acquire(user_id, op)?;

        let order = Order::new(
            user_id,
            asset_id,
            OrderKind::Sell,
            quantity,
            price,
            SystemTime::now(),
        );
        self.orders.create(order.clone())?;

        match self.execute_sell(&order) {
            Ok(receipt) => {
                info!(
                    user_id,
                    order_id = %order.order_id,
                    asset_id,
                    %quantity,
                    %price,
                    "sell order completed"
                );
                Ok(receipt)
            }
            Err(err) => {
                if let Err(status_err) = self
                    .orders
                    .update_status(order.order_id, OrderStatus::Failed)
                {
                    warn!(
                        order_id = %order.order_id,
                        %status_err,
                        "could not mark failed sell order"
                    );
                }
                Err(err)
            }
        }
    }

    /// Execute phase of a buy order
    ///
    /// Validates cash sufficiency against the freshly read balance, then
    /// applies the debit. Everything past the debit runs in
    /// [`settle_buy`](Self::settle_buy); if it fails, the pre-debit
    /// balance record is written back before the error propagates.
    fn execute_buy(&self, order: &Order) -> Result<OrderReceipt, LedgerError> {
        let op = OperationKind::BuyOrder;
        let user_id = order.user_id;

        let balance = self.balances.get(user_id)?;
        let cash_before = balance.current_balance;
        let total = order
            .quantity
            .checked_mul(order.price)
            .ok_or_else(|| LedgerError::arithmetic_overflow(op, user_id))?;
        if cash_before < total {
            return Err(LedgerError::insufficient_balance(user_id, cash_before, total));
        }
        let cash_after = cash_before
            .checked_sub(total)
            .ok_or_else(|| LedgerError::arithmetic_overflow(op, user_id))?;

        let holding = self.asset_balances.get(user_id, &order.asset_id)?;
        let quantity_before = holding.map(|h| h.quantity).unwrap_or(Decimal::ZERO);
        let quantity_after = quantity_before
            .checked_add(order.quantity)
            .ok_or_else(|| LedgerError::arithmetic_overflow(op, user_id))?;

        let now = SystemTime::now();
        self.balances.put(Balance {
            user_id,
            current_balance: cash_after,
            updated_at: now,
        })?;

        match self.settle_buy(order, total, cash_before, cash_after, quantity_before, quantity_after, now)
        {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                warn!(
                    user_id,
                    order_id = %order.order_id,
                    %err,
                    "buy order failed after cash debit, compensating"
                );
                self.balances.put(balance)?;
                Err(err)
            }
        }
    }

    /// Buy-order steps past the cash debit
    ///
    /// Appends the payment record, credits the holding, then records the
    /// asset side and completes the order. A failure after the holding was
    /// credited writes the previous quantity back before the error
    /// propagates to the cash compensation in `execute_buy`.
    #[allow(clippy::too_many_arguments)]
    fn settle_buy(
        &self,
        order: &Order,
        total: Decimal,
        cash_before: Decimal,
        cash_after: Decimal,
        quantity_before: Decimal,
        quantity_after: Decimal,
        now: SystemTime,
    ) -> Result<OrderReceipt, LedgerError> {
        let user_id = order.user_id;

        self.history.append(LedgerTransaction::cash(
            user_id,
            TransactionKind::OrderPayment,
            total,
            cash_before,
            cash_after,
            Some(order.order_id),
            now,
        ))?;

        self.asset_balances.put(AssetBalance {
            user_id,
            asset_id: order.asset_id.clone(),
            quantity: quantity_after,
            updated_at: now,
        })?;

        let recorded = self
            .history
            .append(LedgerTransaction::asset(
                user_id,
                &order.asset_id,
                TransactionKind::AssetBuy,
                order.quantity,
                quantity_before,
                quantity_after,
                order.order_id,
                now,
            ))
            .and_then(|()| {
                self.orders
                    .update_status(order.order_id, OrderStatus::Completed)
            });
        if let Err(err) = recorded {
            warn!(
                user_id,
                order_id = %order.order_id,
                %err,
                "buy order failed after asset credit, compensating"
            );
            self.asset_balances.put(AssetBalance {
                user_id,
                asset_id: order.asset_id.clone(),
                quantity: quantity_before,
                updated_at: now,
            })?;
            return Err(err);
        }

        Ok(OrderReceipt {
            order_id: order.order_id,
            user_id,
            asset_id: order.asset_id.clone(),
            kind: order.kind,
            quantity: order.quantity,
            price: order.price,
            total,
            balance_after: cash_after,
            asset_quantity_after: quantity_after,
        })
    }

    /// Execute phase of a sell order
    ///
    /// Validates holding sufficiency against the freshly read record, then
    /// applies the quantity debit. Everything past the debit runs in
    /// [`settle_sell`](Self::settle_sell); if it fails, the pre-debit
    /// quantity is written back before the error propagates.
    fn execute_sell(&self, order: &Order) -> Result<OrderReceipt, LedgerError> {
        let op = OperationKind::SellOrder;
        let user_id = order.user_id;

        let holding = self.asset_balances.get(user_id, &order.asset_id)?;
        let quantity_before = holding.map(|h| h.quantity).unwrap_or(Decimal::ZERO);
        if quantity_before < order.quantity {
            return Err(LedgerError::insufficient_asset_quantity(
                user_id,
                &order.asset_id,
                quantity_before,
                order.quantity,
            ));
        }
        let quantity_after = quantity_before
            .checked_sub(order.quantity)
            .ok_or_else(|| LedgerError::arithmetic_overflow(op, user_id))?;

        let balance = self.balances.get(user_id)?;
        let cash_before = balance.current_balance;
        let total = order
            .quantity
            .checked_mul(order.price)
            .ok_or_else(|| LedgerError::arithmetic_overflow(op, user_id))?;
        let cash_after = cash_before
            .checked_add(total)
            .ok_or_else(|| LedgerError::arithmetic_overflow(op, user_id))?;

        let now = SystemTime::now();
        self.asset_balances.put(AssetBalance {
            user_id,
            asset_id: order.asset_id.clone(),
            quantity: quantity_after,
            updated_at: now,
        })?;

        match self.settle_sell(order, total, cash_before, cash_after, quantity_before, quantity_after, now)
        {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                warn!(
                    user_id,
                    order_id = %order.order_id,
                    %err,
                    "sell order failed after asset debit, compensating"
                );
                self.asset_balances.put(AssetBalance {
                    user_id,
                    asset_id: order.asset_id.clone(),
                    quantity: quantity_before,
                    updated_at: now,
                })?;
                Err(err)
            }
        }
    }

    /// Sell-order steps past the asset debit
    ///
    /// Credits the cash balance, then appends the proceeds and asset
    /// records and completes the order. A failure after the credit writes
    /// the pre-credit balance back before the error propagates to the
    /// quantity compensation in `execute_sell`.
    #[allow(clippy::too_many_arguments)]
    fn settle_sell(
        &self,
        order: &Order,
        total: Decimal,
        cash_before: Decimal,
        cash_after: Decimal,
        quantity_before: Decimal,
        quantity_after: Decimal,
        now: SystemTime,
    ) -> Result<OrderReceipt, LedgerError> {
        let user_id = order.user_id;

        self.balances.put(Balance {
            user_id,
            current_balance: cash_after,
            updated_at: now,
        })?;

        let recorded = self
            .history
            .append(LedgerTransaction::cash(
                user_id,
                TransactionKind::OrderProceeds,
                total,
                cash_before,
                cash_after,
                Some(order.order_id),
                now,
            ))
            .and_then(|()| {
                self.history.append(LedgerTransaction::asset(
                    user_id,
                    &order.asset_id,
                    TransactionKind::AssetSell,
                    order.quantity,
                    quantity_before,
                    quantity_after,
                    order.order_id,
                    now,
                ))
            })
            .and_then(|()| {
                self.orders
                    .update_status(order.order_id, OrderStatus::Completed)
            });
        if let Err(err) = recorded {
            warn!(
                user_id,
                order_id = %order.order_id,
                %err,
                "sell order failed after cash credit, compensating"
            );
            self.balances.put(Balance {
                user_id,
                current_balance: cash_before,
                updated_at: now,
            })?;
            return Err(err);
        }

        Ok(OrderReceipt {
            order_id: order.order_id,
            user_id,
            asset_id: order.asset_id.clone(),
            kind: order.kind,
            quantity: order.quantity,
            price: order.price,
            total,
            balance_after: cash_after,
            asset_quantity_after: quantity_after,
        })
    }
}

/// Reject non-positive amounts and quantities before any lock or write
fn validate_positive(operation: OperationKind, amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(operation, amount));
    }
    Ok(())
}

/// Reject malformed order parameters before any lock or write
fn validate_order_params(
    operation: OperationKind,
    asset_id: &str,
    quantity: Decimal,
    price: Decimal,
) -> Result<(), LedgerError> {
    if asset_id.trim().is_empty() {
        return Err(LedgerError::invalid_asset(asset_id));
    }
    validate_positive(operation, quantity)?;
    validate_positive(operation, price)
}
