//! The ledger contract.
//!
//! [`Ledger`] is the capability every ledger engine provides. The in-memory
//! engine ([`super::memory::MemLedger`]) is the only one built here; a durable
//! engine must keep the same guarantees:
//!
//! - every mutation is validated completely before anything changes
//! - `post_entry` checks the idempotency key and commits in one critical
//!   section, so concurrent posts with one key produce exactly one entry
//! - hold transitions check and change the status atomically, and a capture
//!   commits its entry in the same unit
//! - reads observe a consistent snapshot

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_shared::types::{AccountId, EntryId, HoldId};

use super::balance::Balance;
use super::error::LedgerResult;
use super::types::{
    Account, AccountType, Entry, EntryFilter, Hold, Metadata, NewAccount, NewEntry, NewHold,
};

/// Operations provided by a ledger engine.
#[async_trait]
pub trait Ledger: Send + Sync {
    // ========== Account Registry ==========

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the name is taken within the tenant.
    async fn create_account(&self, input: NewAccount) -> LedgerResult<Account>;

    /// Returns an account by id.
    async fn get_account(&self, id: AccountId) -> LedgerResult<Account>;

    /// Returns an account by name within a tenant.
    async fn find_account(&self, tenant_id: &str, name: &str) -> LedgerResult<Account>;

    /// Finds an account by name or creates it. A blank currency means the
    /// configured default.
    async fn ensure_account(
        &self,
        tenant_id: &str,
        name: &str,
        account_type: AccountType,
        currency: &str,
    ) -> LedgerResult<Account>;

    /// Replaces an account's metadata.
    async fn update_account_metadata(&self, id: AccountId, metadata: Metadata)
    -> LedgerResult<Account>;

    // ========== Entry/Posting Engine ==========

    /// Validates and commits a balanced entry.
    ///
    /// # Errors
    ///
    /// `EmptyPostings`, `PostingsNotBalanced`, `AccountNotFound` or
    /// `BalanceOverflow` with no state change; `DuplicateEntry` carrying the
    /// original entry if the idempotency key was already committed.
    async fn post_entry(&self, input: NewEntry) -> LedgerResult<Entry>;

    /// Returns a committed entry by id.
    async fn get_entry(&self, id: EntryId) -> LedgerResult<Entry>;

    /// Lists entries matching the filter in commit order, oldest first.
    async fn list_entries(&self, filter: &EntryFilter) -> LedgerResult<Vec<Entry>>;

    // ========== Hold Lifecycle ==========

    /// Reserves funds on an account.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if the amount is not positive, `AccountNotFound` if the
    /// account is unknown to the tenant.
    async fn create_hold(&self, input: NewHold) -> LedgerResult<Hold>;

    /// Returns a hold with its current effective status.
    async fn get_hold(&self, id: HoldId) -> LedgerResult<Hold>;

    /// Captures a pending hold, committing an entry that moves `amount` from
    /// the held account to `platform:cash`. `amount <= 0` captures the full
    /// reservation.
    ///
    /// # Errors
    ///
    /// `NotFound`, `HoldNotPending`, `CaptureExceedsHold`, or
    /// `CaptureRequiresCashAccount` when the tenant has no `platform:cash`.
    /// On any error the hold stays pending.
    async fn capture_hold(&self, id: HoldId, amount: i64) -> LedgerResult<Entry>;

    /// Releases a pending hold without moving money.
    async fn void_hold(&self, id: HoldId) -> LedgerResult<Hold>;

    /// Marks every pending hold whose expiry is at or before `now` as expired
    /// and releases its reservation. Returns the swept holds.
    async fn expire_holds(&self, now: DateTime<Utc>) -> LedgerResult<Vec<Hold>>;

    // ========== Balances ==========

    /// Returns the balance of an account in a currency; zero if it never moved.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if the account does not exist.
    async fn get_balance(&self, account_id: AccountId, currency: &str) -> LedgerResult<Balance>;

    /// Returns every materialized balance of an account, sorted by currency.
    async fn list_balances(&self, account_id: AccountId) -> LedgerResult<Vec<Balance>>;
}
