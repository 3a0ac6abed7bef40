//! Materialized account balances.
//!
//! One [`Balance`] row exists per (account, currency) pair once it sees any
//! activity. Rows are only ever changed as a side effect of committing an
//! entry or moving a hold, inside the same critical section.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, normalize_currency};

use super::error::{LedgerError, LedgerResult};
use super::store::LedgerTables;

/// Natural side of an account.
///
/// - Asset/Expense: balance += debit - credit (debit-normal)
/// - Liability/Equity/Revenue: balance += credit - debit (credit-normal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Debits increase the balance.
    Debit,
    /// Credits increase the balance.
    Credit,
}

impl NormalBalance {
    /// Converts a signed posted balance (debit positive) to the account's natural sign.
    #[must_use]
    pub const fn natural(self, posted: i64) -> i64 {
        match self {
            Self::Debit => posted,
            Self::Credit => posted.saturating_neg(),
        }
    }
}

/// Balance of one account in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// The account.
    pub account_id: AccountId,
    /// Currency code.
    pub currency: String,
    /// Sum of every committed posting amount.
    pub posted_balance: i64,
    /// Reserved for pending-but-unposted movements; always zero here.
    pub pending_balance: i64,
    /// Sum of amounts under pending holds.
    pub held_balance: i64,
    /// `posted_balance - held_balance`.
    pub available_balance: i64,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// Creates an empty balance.
    #[must_use]
    pub fn zero(account_id: AccountId, currency: &str, now: DateTime<Utc>) -> Self {
        Self {
            account_id,
            currency: currency.to_string(),
            posted_balance: 0,
            pending_balance: 0,
            held_balance: 0,
            available_balance: 0,
            updated_at: now,
        }
    }

    /// Fails with `InsufficientBalance` if `amount` exceeds the available balance.
    ///
    /// The ledger never calls this itself; it is for callers enforcing spend limits.
    pub fn ensure_available(&self, amount: i64) -> LedgerResult<()> {
        if amount > self.available_balance {
            return Err(LedgerError::InsufficientBalance {
                account_id: self.account_id,
                available: self.available_balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Adds a posting amount. Callers must have checked for overflow.
    pub(crate) fn apply_posting(&mut self, amount: i64, now: DateTime<Utc>) {
        self.posted_balance += amount;
        self.refresh(now);
    }

    /// Reserves `amount`. Callers must have checked for overflow.
    pub(crate) fn hold(&mut self, amount: i64, now: DateTime<Utc>) {
        self.held_balance += amount;
        self.refresh(now);
    }

    /// Releases a previously reserved `amount`.
    pub(crate) fn release(&mut self, amount: i64, now: DateTime<Utc>) {
        self.held_balance -= amount;
        self.refresh(now);
    }

    fn refresh(&mut self, now: DateTime<Utc>) {
        self.available_balance = self.posted_balance - self.held_balance;
        self.updated_at = now;
    }
}

/// Replays posting amounts against current balances without mutating them.
///
/// Used to prove an entry can be applied before anything is written.
#[derive(Debug, Default)]
pub(crate) struct BalanceProjection {
    posted: HashMap<(AccountId, String), i64>,
}

impl BalanceProjection {
    /// Applies one posting to the projection, failing on `i64` overflow of
    /// either the posted or the available balance.
    pub(crate) fn apply(
        &mut self,
        tables: &LedgerTables,
        account_id: AccountId,
        currency: &str,
        amount: i64,
    ) -> LedgerResult<()> {
        let key = (account_id, currency.to_string());
        let (posted, held) = tables
            .balances
            .get(&key)
            .map_or((0, 0), |b| (b.posted_balance, b.held_balance));
        let current = self.posted.get(&key).copied().unwrap_or(posted);

        let overflow = || LedgerError::BalanceOverflow {
            account_id,
            currency: currency.to_string(),
        };
        let next = current.checked_add(amount).ok_or_else(overflow)?;
        next.checked_sub(held).ok_or_else(overflow)?;

        self.posted.insert(key, next);
        Ok(())
    }
}

impl LedgerTables {
    /// Loads or lazily creates the balance row for (account, currency).
    pub(crate) fn balance_mut(
        &mut self,
        account_id: AccountId,
        currency: &str,
        now: DateTime<Utc>,
    ) -> &mut Balance {
        self.balances
            .entry((account_id, currency.to_string()))
            .or_insert_with(|| Balance::zero(account_id, currency, now))
    }

    /// Returns the balance of an account in a currency, zero if it never moved.
    pub(crate) fn get_balance(
        &self,
        account_id: AccountId,
        currency: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<Balance> {
        if !self.accounts.contains_key(&account_id) {
            return Err(LedgerError::AccountNotFound(account_id));
        }
        let currency = normalize_currency(currency, &self.config.default_currency);

        Ok(self
            .balances
            .get(&(account_id, currency.clone()))
            .cloned()
            .unwrap_or_else(|| Balance::zero(account_id, &currency, now)))
    }

    /// Returns every materialized balance row of an account, sorted by currency.
    pub(crate) fn list_balances(&self, account_id: AccountId) -> LedgerResult<Vec<Balance>> {
        if !self.accounts.contains_key(&account_id) {
            return Err(LedgerError::AccountNotFound(account_id));
        }
        let mut rows: Vec<Balance> = self
            .balances
            .values()
            .filter(|b| b.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.currency.cmp(&b.currency));
        Ok(rows)
    }
}
