//! Transaction history types for the trading ledger
//!
//! Every committed mutation appends exactly one history record: cash
//! entries carry balances, asset entries carry quantities. The history is
//! append-only and serves as the audit trail for balances and orders.

use std::time::SystemTime;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::balance::{AssetId, UserId};
use super::order::OrderId;

/// Transaction history record identifier
pub type TransactionId = Uuid;

/// What kind of mutation a history record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Cash credited by a deposit
    Deposit,

    /// Cash debited by a withdrawal
    Withdraw,

    /// Cash debited to pay for a buy order
    OrderPayment,

    /// Cash credited from the proceeds of a sell order
    OrderProceeds,

    /// Asset quantity credited by a buy order
    AssetBuy,

    /// Asset quantity debited by a sell order
    AssetSell,
}

impl TransactionKind {
    /// Whether this record moves cash (as opposed to asset quantity)
    pub fn is_cash(&self) -> bool {
        matches!(
            self,
            TransactionKind::Deposit
                | TransactionKind::Withdraw
                | TransactionKind::OrderPayment
                | TransactionKind::OrderProceeds
        )
    }
}

/// Settlement status of a history record
///
/// Records are appended only after their mutation has been applied, so the
/// stored status is always `Completed`; the field exists so the audit trail
/// is explicit about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    /// The mutation this record describes has been applied
    Completed,
}

/// One append-only audit record
///
/// For cash kinds, `amount` and the `balance_*` fields are cash values; for
/// asset kinds they are quantities and `asset_id` identifies the holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique record identifier
    pub transaction_id: TransactionId,

    /// The user whose balance or holding moved
    pub user_id: UserId,

    /// The asset involved; `None` for cash records
    pub asset_id: Option<AssetId>,

    /// What kind of mutation this records
    pub kind: TransactionKind,

    /// Cash amount or asset quantity moved; always positive
    pub amount: Decimal,

    /// Balance or quantity before the mutation
    pub balance_before: Decimal,

    /// Balance or quantity after the mutation
    pub balance_after: Decimal,

    /// Settlement status
    pub status: TransactionStatus,

    /// The order that caused this mutation, when there is one
    pub order_id: Option<OrderId>,

    /// When the mutation was applied
    pub created_at: SystemTime,
}

impl LedgerTransaction {
    /// Build a cash record
    pub fn cash(
        user_id: UserId,
        kind: TransactionKind,
        amount: Decimal,
        balance_before: Decimal,
        balance_after: Decimal,
        order_id: Option<OrderId>,
        now: SystemTime,
    ) -> Self {
        debug_assert!(kind.is_cash());
        LedgerTransaction {
            transaction_id: Uuid::new_v4(),
            user_id,
            asset_id: None,
            kind,
            amount,
            balance_before,
            balance_after,
            status: TransactionStatus::Completed,
            order_id,
            created_at: now,
        }
    }

    /// Build an asset-quantity record
    pub fn asset(
        user_id: UserId,
        asset_id: &str,
        kind: TransactionKind,
        quantity: Decimal,
        quantity_before: Decimal,
        quantity_after: Decimal,
        order_id: OrderId,
        now: SystemTime,
    ) -> Self {
        debug_assert!(!kind.is_cash());
        LedgerTransaction {
            transaction_id: Uuid::new_v4(),
            user_id,
            asset_id: Some(asset_id.to_string()),
            kind,
            amount: quantity,
            balance_before: quantity_before,
            balance_after: quantity_after,
            status: TransactionStatus::Completed,
            order_id: Some(order_id),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::deposit(TransactionKind::Deposit, true)]
    #[case::withdraw(TransactionKind::Withdraw, true)]
    #[case::order_payment(TransactionKind::OrderPayment, true)]
    #[case::order_proceeds(TransactionKind::OrderProceeds, true)]
    #[case::asset_buy(TransactionKind::AssetBuy, false)]
    #[case::asset_sell(TransactionKind::AssetSell, false)]
    fn test_cash_kinds(#[case] kind: TransactionKind, #[case] expected: bool) {
        assert_eq!(kind.is_cash(), expected);
    }

    #[test]
    fn test_cash_record_carries_no_asset() {
        let record = LedgerTransaction::cash(
            1,
            TransactionKind::Deposit,
            Decimal::TEN,
            Decimal::ZERO,
            Decimal::TEN,
            None,
            SystemTime::now(),
        );

        assert!(record.asset_id.is_none());
        assert!(record.order_id.is_none());
        assert_eq!(record.status, TransactionStatus::Completed);
    }

    #[test]
    fn test_asset_record_references_its_order() {
        let order_id = Uuid::new_v4();
        let record = LedgerTransaction::asset(
            1,
            "ETH",
            TransactionKind::AssetBuy,
            Decimal::ONE,
            Decimal::ZERO,
            Decimal::ONE,
            order_id,
            SystemTime::now(),
        );

        assert_eq!(record.asset_id.as_deref(), Some("ETH"));
        assert_eq!(record.order_id, Some(order_id));
    }
}
