//! Account registry.
//!
//! Accounts are unique per (tenant, name) and are never deleted. The payment
//! operations address accounts by the well-known names in [`names`] and let
//! [`LedgerTables::ensure_account`] create them on first use.

use chrono::{DateTime, Utc};
use tally_shared::types::{AccountId, normalize_currency};
use tracing::debug;

use super::error::{LedgerError, LedgerResult, Resource};
use super::store::{LedgerTables, tenant_key};
use super::types::{Account, AccountType, Metadata, NewAccount};

/// Well-known account names used by captures and payment operations.
pub mod names {
    /// Platform cash (asset). Captures and every payment operation move money through it.
    pub const PLATFORM_CASH: &str = "platform:cash";
    /// Platform fee revenue.
    pub const PLATFORM_FEES: &str = "platform:fees";
    /// Funds set aside for open disputes (asset).
    pub const PLATFORM_DISPUTES_HELD: &str = "platform:disputes_held";

    /// Balance owed to a customer (liability).
    #[must_use]
    pub fn customer_balance(customer_id: &str) -> String {
        format!("customer_balance:{customer_id}")
    }

    /// Balance owed to a merchant (liability).
    #[must_use]
    pub fn merchant_settlement(merchant_id: &str) -> String {
        format!("merchant_settlement:{merchant_id}")
    }
}

impl LedgerTables {
    /// Creates an account, failing if the name is taken within the tenant.
    pub(crate) fn create_account(
        &mut self,
        input: NewAccount,
        now: DateTime<Utc>,
    ) -> LedgerResult<Account> {
        let key = tenant_key(&input.tenant_id, &input.name);
        if self.account_names.contains_key(&key) {
            return Err(LedgerError::AlreadyExists {
                tenant_id: input.tenant_id,
                name: input.name,
            });
        }

        let account = Account {
            id: AccountId::new(),
            currency: normalize_currency(
                input.currency.as_deref().unwrap_or_default(),
                &self.config.default_currency,
            ),
            normal_balance: input
                .normal_balance
                .unwrap_or_else(|| input.account_type.normal_balance()),
            tenant_id: input.tenant_id,
            name: input.name,
            account_type: input.account_type,
            metadata: input.metadata,
            created_at: now,
        };

        self.account_names.insert(key, account.id);
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    /// Returns an account by id.
    pub(crate) fn get_account(&self, id: AccountId) -> LedgerResult<&Account> {
        self.accounts
            .get(&id)
            .ok_or_else(|| LedgerError::not_found(Resource::Account, id))
    }

    /// Returns an account by name within a tenant.
    pub(crate) fn find_account(&self, tenant_id: &str, name: &str) -> LedgerResult<&Account> {
        self.account_names
            .get(&tenant_key(tenant_id, name))
            .and_then(|id| self.accounts.get(id))
            .ok_or_else(|| LedgerError::not_found(Resource::Account, name))
    }

    /// Returns the account if it exists and belongs to the tenant.
    ///
    /// Postings and holds use this, so another tenant's account is reported
    /// exactly like a missing one.
    pub(crate) fn tenant_account(
        &self,
        tenant_id: &str,
        id: AccountId,
    ) -> LedgerResult<&Account> {
        self.accounts
            .get(&id)
            .filter(|a| a.tenant_id == tenant_id)
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Finds an account by name or creates it.
    pub(crate) fn ensure_account(
        &mut self,
        tenant_id: &str,
        name: &str,
        account_type: AccountType,
        currency: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<Account> {
        if let Ok(existing) = self.find_account(tenant_id, name) {
            return Ok(existing.clone());
        }

        let account =
            self.create_account(NewAccount::new(tenant_id, name, account_type).with_currency(currency), now)?;
        debug!(
            tenant_id = %account.tenant_id,
            account_id = %account.id,
            name = %account.name,
            "Account created on first use"
        );
        Ok(account)
    }

    /// Replaces an account's metadata.
    pub(crate) fn update_account_metadata(
        &mut self,
        id: AccountId,
        metadata: Metadata,
    ) -> LedgerResult<Account> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found(Resource::Account, id))?;
        account.metadata = metadata;
        Ok(account.clone())
    }
}
