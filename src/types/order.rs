//! Order types for the trading ledger
//!
//! Orders are audit records: created `Pending` at the start of a buy or
//! sell operation, driven to a terminal status by the orchestrator, and
//! never deleted.

use std::time::SystemTime;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::balance::{AssetId, UserId};

/// Order identifier
pub type OrderId = Uuid;

/// Direction of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Exchange cash for asset quantity
    Buy,

    /// Exchange asset quantity for cash
    Sell,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Buy => f.write_str("buy"),
            OrderKind::Sell => f.write_str("sell"),
        }
    }
}

/// Order lifecycle status
///
/// The only transitions are `Pending -> Completed` (happy path) and
/// `Pending -> Failed` (validation or execution failure). Both end states
/// are terminal; there is no cancellation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Created, not yet executed
    Pending,

    /// All mutations applied and recorded
    Completed,

    /// Validation or execution failed; any partial mutation was compensated
    Failed,
}

impl OrderStatus {
    /// Whether this status admits no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }
}

/// A buy or sell order record
///
/// Written only by the orchestrator while the user's lock is held. The row
/// outlives the operation as an audit record regardless of outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier
    pub order_id: OrderId,

    /// The user placing the order
    pub user_id: UserId,

    /// The asset being traded
    pub asset_id: AssetId,

    /// Buy or sell
    pub kind: OrderKind,

    /// Asset quantity being traded; always positive
    pub quantity: Decimal,

    /// Unit price the order executes at
    pub price: Decimal,

    /// Current lifecycle status
    pub status: OrderStatus,

    /// When the order row was created
    pub created_at: SystemTime,

    /// When the order row was last mutated
    pub updated_at: SystemTime,
}

impl Order {
    /// Create a `Pending` order with a fresh id
    pub fn new(
        user_id: UserId,
        asset_id: &str,
        kind: OrderKind,
        quantity: Decimal,
        price: Decimal,
        now: SystemTime,
    ) -> Self {
        Order {
            order_id: Uuid::new_v4(),
            user_id,
            asset_id: asset_id.to_string(),
            kind,
            quantity,
            price,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_is_pending() {
        let order = Order::new(
            1,
            "BTC",
            OrderKind::Buy,
            Decimal::ONE,
            Decimal::new(500000, 2),
            SystemTime::now(),
        );

        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.status.is_terminal());
    }

    #[test]
    fn test_completed_and_failed_are_terminal() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_new_orders_get_distinct_ids() {
        let now = SystemTime::now();
        let a = Order::new(1, "BTC", OrderKind::Buy, Decimal::ONE, Decimal::TEN, now);
        let b = Order::new(1, "BTC", OrderKind::Buy, Decimal::ONE, Decimal::TEN, now);
        assert_ne!(a.order_id, b.order_id);
    }
}
