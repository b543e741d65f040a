//! Lock-related types for the trading ledger
//!
//! This module defines the per-user lock record held in the lock store,
//! the token that proves lock ownership, and the operation kinds that
//! determine lock time-to-live.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::balance::UserId;

/// Token proving ownership of an acquired lock
///
/// Minted fresh (v4) on every successful acquire. Release only deletes the
/// lock record when the stored token matches, so a straggler whose lock
/// expired cannot evict the next holder.
pub type LockToken = Uuid;

/// The mutating operations the ledger serializes per user
///
/// Each kind carries its own default lock time-to-live reflecting the
/// expected execution cost: order operations touch more records than plain
/// balance operations and get a longer lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Credit cash to a user's balance
    Deposit,

    /// Debit cash from a user's balance
    Withdraw,

    /// Buy an asset: debit cash, credit holdings
    BuyOrder,

    /// Sell an asset: debit holdings, credit cash
    SellOrder,
}

impl OperationKind {
    /// Default lock time-to-live for this operation
    ///
    /// The TTL must exceed the worst-case duration of the store I/O done
    /// while the lock is held; a lock that outlives its operation is
    /// reclaimed by expiry rather than by a background sweeper.
    pub fn lock_ttl(&self) -> Duration {
        match self {
            OperationKind::Deposit | OperationKind::Withdraw => Duration::from_secs(10),
            OperationKind::BuyOrder | OperationKind::SellOrder => Duration::from_secs(25),
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdraw",
            OperationKind::BuyOrder => "buy order",
            OperationKind::SellOrder => "sell order",
        };
        f.write_str(name)
    }
}

/// Per-user exclusive lock record
///
/// At most one live (non-expired) record exists per user at any instant.
/// Created by a conditional write on acquire, deleted on release when the
/// token still matches, or left to lapse once `expires_at` has passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    /// The user this lock serializes operations for
    pub user_id: UserId,

    /// Ownership token; required to release
    pub token: LockToken,

    /// The operation the lock was acquired for
    pub operation: OperationKind,

    /// When the lock was acquired
    pub acquired_at: SystemTime,

    /// Instant after which the lock counts as absent
    pub expires_at: SystemTime,
}

impl LockRecord {
    /// Build a record expiring `ttl` after `now`
    pub fn new(user_id: UserId, operation: OperationKind, now: SystemTime, ttl: Duration) -> Self {
        LockRecord {
            user_id,
            token: Uuid::new_v4(),
            operation,
            acquired_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the lock still excludes other acquirers at `now`
    ///
    /// An expired record is treated as "no lock": the next acquire may
    /// overwrite it.
    pub fn is_live(&self, now: SystemTime) -> bool {
        self.expires_at > now
    }
}
