//! Operation receipts returned to callers
//!
//! A receipt is the success payload of one orchestrated operation: enough
//! for an API layer to render the outcome without re-reading the store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::balance::{AssetId, UserId};
use super::order::{OrderId, OrderKind};
use super::transaction::TransactionId;

/// Outcome of a committed deposit or withdrawal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReceipt {
    /// History record written for this mutation
    pub transaction_id: TransactionId,

    /// The user whose balance moved
    pub user_id: UserId,

    /// Cash balance before the mutation
    pub balance_before: Decimal,

    /// Cash balance after the mutation
    pub balance_after: Decimal,
}

/// Outcome of a completed buy or sell order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// The order row driven to `Completed`
    pub order_id: OrderId,

    /// The user who placed the order
    pub user_id: UserId,

    /// The asset traded
    pub asset_id: AssetId,

    /// Buy or sell
    pub kind: OrderKind,

    /// Quantity traded
    pub quantity: Decimal,

    /// Unit price
    pub price: Decimal,

    /// Cash moved (`quantity * price`)
    pub total: Decimal,

    /// Cash balance after settlement
    pub balance_after: Decimal,

    /// Holding quantity after settlement
    pub asset_quantity_after: Decimal,
}
