//! In-memory ledger engine.
//!
//! All state lives in one [`LedgerTables`] behind a single
//! `tokio::sync::RwLock`. Reads share the lock; every mutation holds it
//! exclusively for its whole duration and never awaits inside, so a mutation
//! either completes or, if its future is dropped while waiting for the lock,
//! never starts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_shared::LedgerConfig;
use tally_shared::types::{AccountId, EntryId, HoldId};
use tokio::sync::RwLock;

use super::balance::Balance;
use super::error::LedgerResult;
use super::service::Ledger;
use super::store::LedgerTables;
use super::types::{
    Account, AccountType, Entry, EntryFilter, Hold, Metadata, NewAccount, NewEntry, NewHold,
};

/// Ledger held entirely in process memory.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemLedger {
    tables: Arc<RwLock<LedgerTables>>,
}

impl MemLedger {
    /// Creates an empty ledger with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty ledger with the given configuration.
    #[must_use]
    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            tables: Arc::new(RwLock::new(LedgerTables::new(config))),
        }
    }
}

#[async_trait]
impl Ledger for MemLedger {
    async fn create_account(&self, input: NewAccount) -> LedgerResult<Account> {
        self.tables.write().await.create_account(input, Utc::now())
    }

    async fn get_account(&self, id: AccountId) -> LedgerResult<Account> {
        self.tables.read().await.get_account(id).cloned()
    }

    async fn find_account(&self, tenant_id: &str, name: &str) -> LedgerResult<Account> {
        self.tables.read().await.find_account(tenant_id, name).cloned()
    }

    async fn ensure_account(
        &self,
        tenant_id: &str,
        name: &str,
        account_type: AccountType,
        currency: &str,
    ) -> LedgerResult<Account> {
        if let Ok(account) = self.find_account(tenant_id, name).await {
            return Ok(account);
        }
        self.tables
            .write()
            .await
            .ensure_account(tenant_id, name, account_type, currency, Utc::now())
    }

    async fn update_account_metadata(
        &self,
        id: AccountId,
        metadata: Metadata,
    ) -> LedgerResult<Account> {
        self.tables.write().await.update_account_metadata(id, metadata)
    }

    async fn post_entry(&self, input: NewEntry) -> LedgerResult<Entry> {
        self.tables.write().await.post_entry(input, Utc::now())
    }

    async fn get_entry(&self, id: EntryId) -> LedgerResult<Entry> {
        self.tables.read().await.get_entry(id)
    }

    async fn list_entries(&self, filter: &EntryFilter) -> LedgerResult<Vec<Entry>> {
        Ok(self.tables.read().await.list_entries(filter))
    }

    async fn create_hold(&self, input: NewHold) -> LedgerResult<Hold> {
        self.tables.write().await.create_hold(input, Utc::now())
    }

    async fn get_hold(&self, id: HoldId) -> LedgerResult<Hold> {
        self.tables.read().await.get_hold(id, Utc::now())
    }

    async fn capture_hold(&self, id: HoldId, amount: i64) -> LedgerResult<Entry> {
        self.tables.write().await.capture_hold(id, amount, Utc::now())
    }

    async fn void_hold(&self, id: HoldId) -> LedgerResult<Hold> {
        self.tables.write().await.void_hold(id, Utc::now())
    }

    async fn expire_holds(&self, now: DateTime<Utc>) -> LedgerResult<Vec<Hold>> {
        Ok(self.tables.write().await.expire_holds(now))
    }

    async fn get_balance(&self, account_id: AccountId, currency: &str) -> LedgerResult<Balance> {
        self.tables
            .read()
            .await
            .get_balance(account_id, currency, Utc::now())
    }

    async fn list_balances(&self, account_id: AccountId) -> LedgerResult<Vec<Balance>> {
        self.tables.read().await.list_balances(account_id)
    }
}

const _: fn() = || {
    fn assert_ledger<T: Ledger + Clone + 'static>() {}
    assert_ledger::<MemLedger>();
};
