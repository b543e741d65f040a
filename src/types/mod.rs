//! Types module
//!
//! Contains core data structures used throughout the ledger.
//! This module organizes types into logical submodules:
//! - `balance`: cash balance and asset holding records, identifier aliases
//! - `order`: order records and their status machine
//! - `transaction`: append-only transaction history records
//! - `lock`: per-user lock records, tokens and operation kinds
//! - `receipt`: success payloads returned to callers
//! - `error`: error types and the stable error-kind taxonomy

pub mod balance;
pub mod error;
pub mod lock;
pub mod order;
pub mod receipt;
pub mod transaction;

pub use balance::{AssetBalance, AssetId, Balance, UserId};
pub use error::{ErrorKind, LedgerError};
pub use lock::{LockRecord, LockToken, OperationKind};
pub use order::{Order, OrderId, OrderKind, OrderStatus};
pub use receipt::{BalanceReceipt, OrderReceipt};
pub use transaction::{LedgerTransaction, TransactionId, TransactionKind, TransactionStatus};
