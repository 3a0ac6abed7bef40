//! In-memory ledger tables.
//!
//! [`LedgerTables`] is the whole mutable state of one ledger: accounts,
//! entries, holds, balances and the two lookup indexes. It has no locking of
//! its own; [`super::memory::MemLedger`] owns it behind a single
//! reader/writer lock so every method here runs inside one critical section.
//! Behaviour is split by component across `accounts`, `posting`, `balance`
//! and `holds`.

use std::collections::HashMap;

use tally_shared::LedgerConfig;
use tally_shared::types::{AccountId, EntryId, HoldId};

use super::balance::Balance;
use super::types::{Account, Entry, Hold};

/// `(tenant_id, name)` or `(tenant_id, idempotency_key)`.
pub(crate) type TenantKey = (String, String);

/// All ledger state guarded by one lock.
#[derive(Debug, Default)]
pub(crate) struct LedgerTables {
    pub(crate) config: LedgerConfig,
    pub(crate) accounts: HashMap<AccountId, Account>,
    pub(crate) account_names: HashMap<TenantKey, AccountId>,
    pub(crate) entries: HashMap<EntryId, Entry>,
    /// Entry ids in commit order.
    pub(crate) entry_log: Vec<EntryId>,
    pub(crate) idempotency: HashMap<TenantKey, EntryId>,
    pub(crate) holds: HashMap<HoldId, Hold>,
    pub(crate) balances: HashMap<(AccountId, String), Balance>,
}

impl LedgerTables {
    /// Creates empty tables using `config` for defaults.
    pub(crate) fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }
}

pub(crate) fn tenant_key(tenant_id: &str, key: &str) -> TenantKey {
    (tenant_id.to_string(), key.to_string())
}
