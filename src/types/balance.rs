//! Balance types for the trading ledger
//!
//! This module defines the cash balance and per-asset holding records as
//! stored in the key-value store, plus the identifier aliases they are
//! keyed by.

use std::time::SystemTime;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// User identifier
pub type UserId = u64;

/// Asset identifier (exchange symbol, e.g. "BTC")
pub type AssetId = String;

/// A user's cash balance record
///
/// Invariant: `current_balance` is never persisted negative. Every mutation
/// happens under the user's lock, so the stored value is always the result
/// of a validated read-modify-write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// The user this balance belongs to
    pub user_id: UserId,

    /// Current cash balance; `>= 0` at every committed state
    pub current_balance: Decimal,

    /// Timestamp of the last committed mutation
    pub updated_at: SystemTime,
}

impl Balance {
    /// Create a zero balance for a user that has no stored record yet
    pub fn new(user_id: UserId) -> Self {
        Balance {
            user_id,
            current_balance: Decimal::ZERO,
            updated_at: SystemTime::now(),
        }
    }
}

/// A user's holding of one tradable asset
///
/// One record per `(user_id, asset_id)` pair. Invariant: `quantity >= 0` at
/// every committed state; sell orders validate holdings under the user's
/// lock before debiting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    /// The user this holding belongs to
    pub user_id: UserId,

    /// The asset being held
    pub asset_id: AssetId,

    /// Held quantity; `>= 0` at every committed state
    pub quantity: Decimal,

    /// Timestamp of the last committed mutation
    pub updated_at: SystemTime,
}

impl AssetBalance {
    /// Create a zero holding for a `(user, asset)` pair with no record yet
    pub fn new(user_id: UserId, asset_id: &str) -> Self {
        AssetBalance {
            user_id,
            asset_id: asset_id.to_string(),
            quantity: Decimal::ZERO,
            updated_at: SystemTime::now(),
        }
    }
}
