//! Core business logic for Tally.
//!
//! This crate contains the double-entry payments ledger with ZERO web or
//! database dependencies. All domain types, validation rules and the
//! in-memory engine live here.
//!
//! # Modules
//!
//! - `ledger` - Accounts, entries, balances, holds and payment operations

pub mod ledger;

pub use ledger::{Ledger, LedgerError, MemLedger, PaymentOperations};
