//! Per-user distributed locking
//!
//! This module provides the `LockManager`, which grants short-lived
//! exclusive locks keyed by user via a conditional write against the lock
//! store, and the `LockGuard` returned from a successful acquire.
//!
//! # Design
//!
//! Acquire is non-blocking: it either wins the conditional write or fails
//! immediately with [`LedgerError::LockHeld`]. There is no queueing, no
//! fairness guarantee, and no automatic retry — whichever request's
//! conditional write lands first proceeds, and losers surface the
//! contention to their callers.
//!
//! Expiry is enforced by treating `expires_at <= now` as "no lock" at the
//! next acquire; no background sweeper exists. A lock can therefore expire
//! while its operation is still running, admitting a second operation for
//! the same user. That window is an accepted gap of this design; the token
//! check on release keeps the straggler from evicting the new holder.

use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::core::traits::LockStore;
use crate::types::{LedgerError, LockRecord, LockToken, OperationKind, UserId};

/// Grants per-user mutual exclusion via conditional writes to a lock store
///
/// The manager itself is stateless apart from the store handle; all lock
/// state lives in the store, so multiple processes sharing the store share
/// the exclusion domain.
pub struct LockManager<L: LockStore> {
    store: L,
}

impl<L: LockStore> LockManager<L> {
    /// Create a lock manager over `store`
    pub fn new(store: L) -> Self {
        LockManager { store }
    }

    /// Acquire the user's lock with the operation's default time-to-live
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::LockHeld`] when a live lock exists for the
    /// user, or [`LedgerError::StoreUnavailable`] when the conditional
    /// write itself failed.
    pub fn acquire(
        &self,
        user_id: UserId,
        operation: OperationKind,
    ) -> Result<LockGuard<'_, L>, LedgerError> {
        self.acquire_with_ttl(user_id, operation, operation.lock_ttl())
    }

    /// Acquire the user's lock with an explicit time-to-live
    ///
    /// The TTL must exceed the worst-case store I/O of the protected
    /// section, otherwise the lock may lapse mid-operation.
    pub fn acquire_with_ttl(
        &self,
        user_id: UserId,
        operation: OperationKind,
        ttl: Duration,
    ) -> Result<LockGuard<'_, L>, LedgerError> {
        let record = LockRecord::new(user_id, operation, SystemTime::now(), ttl);
        if self.store.conditional_create(&record)? {
            debug!(user_id, %operation, ?ttl, "lock acquired");
            Ok(LockGuard {
                manager: self,
                user_id,
                token: record.token,
            })
        } else {
            debug!(user_id, %operation, "lock held, acquire rejected");
            Err(LedgerError::lock_held(user_id, operation))
        }
    }

    /// Release a lock by token
    ///
    /// Deletes the record only when the stored token matches; a mismatch
    /// means the lock expired and was re-acquired, and is left in place.
    /// Only [`LockGuard`] calls this.
    fn release(&self, user_id: UserId, token: LockToken) -> Result<bool, LedgerError> {
        self.store.delete_if_token_matches(user_id, token)
    }
}

/// Scoped ownership of an acquired lock
///
/// Exposes no further API: dropping the guard is the release, and drop runs
/// on every exit path from the protected section, including early returns
/// and panics. A release that fails (or finds the token superseded) is
/// logged and otherwise ignored — the record lapses via its TTL.
#[must_use = "the lock is released when the guard is dropped"]
pub struct LockGuard<'a, L: LockStore> {
    manager: &'a LockManager<L>,
    user_id: UserId,
    token: LockToken,
}

impl<L: LockStore> Drop for LockGuard<'_, L> {
    fn drop(&mut self) {
        match self.manager.release(self.user_id, self.token) {
            Ok(true) => debug!(user_id = self.user_id, "lock released"),
            Ok(false) => warn!(
                user_id = self.user_id,
                "lock token superseded at release; lock had expired and was re-acquired"
            ),
            Err(err) => warn!(
                user_id = self.user_id,
                %err,
                "lock release failed; record will lapse via ttl"
            ),
        }
    }
}
