//! Double-entry payments ledger.
//!
//! This module implements the core ledger functionality:
//! - Account registry with tenant-scoped names
//! - Entry/posting engine (zero-sum validation, idempotent commits)
//! - Materialized per-currency balances
//! - Hold lifecycle (authorize, capture, void, expire)
//! - Payment operations (payment, refund, payout, dispute)
//! - Error types for ledger operations
//!
//! [`Ledger`] is the contract; [`MemLedger`] is the in-memory engine and
//! [`PaymentOperations`] adds the payment operations to any engine.

pub mod accounts;
pub mod balance;
pub mod error;
pub mod holds;
pub mod memory;
pub mod operations;
pub mod posting;
pub mod service;
mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use accounts::names;
pub use balance::{Balance, NormalBalance};
pub use error::{ErrorKind, LedgerError, LedgerResult, Resource};
pub use memory::MemLedger;
pub use operations::PaymentOperations;
pub use service::Ledger;
pub use types::{
    Account, AccountType, Entry, EntryFilter, Hold, HoldStatus, Metadata, NewAccount, NewEntry,
    NewHold, NewPosting, Posting,
};
pub use validation::{MIN_POSTINGS, validate_currency_balance, validate_postings};
