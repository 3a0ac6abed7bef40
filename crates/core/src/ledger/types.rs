//! Ledger domain types.
//!
//! Committed records ([`Account`], [`Entry`], [`Posting`], [`Hold`]) are what the
//! ledger hands back; input types ([`NewAccount`], [`NewEntry`], [`NewPosting`],
//! [`NewHold`]) are what callers construct. Amounts are signed `i64` minor units:
//! a positive posting is a debit, a negative posting is a credit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, EntryId, HoldId, PostingId};

use super::balance::NormalBalance;

/// Free-form JSON metadata attached to accounts and entries.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Account classification in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Resources owned by the platform (cash, receivables).
    Asset,
    /// Amounts owed to others (customer balances, merchant settlements).
    Liability,
    /// Owner's residual interest.
    Equity,
    /// Income (fees).
    Revenue,
    /// Costs.
    Expense,
}

impl AccountType {
    /// Returns whether this account type naturally increases with debits or credits.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }
}

/// Lifecycle state of an authorization hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldStatus {
    /// Funds are reserved and awaiting capture or void.
    Pending,
    /// Funds were moved by a capture entry.
    Captured,
    /// Reservation released without moving money.
    Voided,
    /// Reservation lapsed past its expiry.
    Expired,
}

impl HoldStatus {
    /// Returns true while the hold can still be captured or voided.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for HoldStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Captured => write!(f, "captured"),
            Self::Voided => write!(f, "voided"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A named account scoped to one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning tenant.
    pub tenant_id: String,
    /// Name, unique within the tenant (e.g. `platform:cash`).
    pub name: String,
    /// Account classification.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Default currency for postings and holds against this account.
    pub currency: String,
    /// Natural side of the account.
    pub normal_balance: NormalBalance,
    /// Caller-supplied metadata; the only mutable part of an account.
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// One debit or credit leg of a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Posting {
    /// Unique identifier.
    pub id: PostingId,
    /// Owning entry.
    pub entry_id: EntryId,
    /// Account affected.
    pub account_id: AccountId,
    /// Signed amount in minor units (positive = debit, negative = credit).
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// When the posting was committed.
    pub created_at: DateTime<Utc>,
}

/// An immutable, balanced journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique identifier.
    pub id: EntryId,
    /// Owning tenant.
    pub tenant_id: String,
    /// Key used to detect retried posts, unique per tenant. Empty when the
    /// entry was posted without one.
    pub idempotency_key: String,
    /// Human description.
    pub description: String,
    /// Payment intent correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    /// Refund correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    /// Payout correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_id: Option<String>,
    /// Transfer correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_id: Option<String>,
    /// Dispute correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_id: Option<String>,
    /// Caller-supplied metadata.
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// Postings in the order they were supplied.
    pub postings: Vec<Posting>,
    /// When the entry was committed.
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Returns true if any posting touches the account.
    #[must_use]
    pub fn touches(&self, account_id: AccountId) -> bool {
        self.postings.iter().any(|p| p.account_id == account_id)
    }

    /// Returns the signed amount posted to an account by this entry.
    #[must_use]
    pub fn amount_for(&self, account_id: AccountId) -> i64 {
        self.postings
            .iter()
            .filter(|p| p.account_id == account_id)
            .map(|p| p.amount)
            .sum()
    }
}

/// A reservation of funds against one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hold {
    /// Unique identifier.
    pub id: HoldId,
    /// Owning tenant.
    pub tenant_id: String,
    /// Account the funds are reserved on.
    pub account_id: AccountId,
    /// Reserved amount, always positive.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Stored lifecycle status.
    pub status: HoldStatus,
    /// Payment intent correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    /// Entry produced by the capture, once captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_entry_id: Option<EntryId>,
    /// After this instant a pending hold is considered expired.
    pub expires_at: DateTime<Utc>,
    /// When the hold was created.
    pub created_at: DateTime<Utc>,
    /// When the hold last changed status.
    pub updated_at: DateTime<Utc>,
}

impl Hold {
    /// Returns the status as observed at `now`.
    ///
    /// A stored `pending` hold past its expiry reads as `expired` even before a sweep.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> HoldStatus {
        if self.status.is_pending() && self.expires_at <= now {
            HoldStatus::Expired
        } else {
            self.status
        }
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Owning tenant.
    pub tenant_id: String,
    /// Name, unique within the tenant.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Currency; the configured default when `None`.
    pub currency: Option<String>,
    /// Natural side; derived from the type when `None`.
    pub normal_balance: Option<NormalBalance>,
    /// Initial metadata.
    pub metadata: Metadata,
}

impl NewAccount {
    /// Creates an input with defaulted currency, polarity and metadata.
    #[must_use]
    pub fn new(tenant_id: &str, name: &str, account_type: AccountType) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            account_type,
            currency: None,
            normal_balance: None,
            metadata: Metadata::new(),
        }
    }

    /// Sets the account currency.
    #[must_use]
    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = Some(currency.to_string());
        self
    }
}

/// Input for a single posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPosting {
    /// Account affected.
    pub account_id: AccountId,
    /// Signed amount (positive = debit, negative = credit).
    pub amount: i64,
    /// Currency; the account's currency when `None`.
    pub currency: Option<String>,
}

impl NewPosting {
    /// A debit of `amount` to the account.
    #[must_use]
    pub const fn debit(account_id: AccountId, amount: i64) -> Self {
        Self {
            account_id,
            amount,
            currency: None,
        }
    }

    /// A credit of `amount` to the account (stored as a negative amount).
    #[must_use]
    pub const fn credit(account_id: AccountId, amount: i64) -> Self {
        Self {
            account_id,
            amount: amount.saturating_neg(),
            currency: None,
        }
    }

    /// Sets the posting currency.
    #[must_use]
    pub fn in_currency(mut self, currency: &str) -> Self {
        if !currency.trim().is_empty() {
            self.currency = Some(currency.to_string());
        }
        self
    }
}

/// Input for posting a journal entry.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    /// Owning tenant.
    pub tenant_id: String,
    /// Retry-detection key; blank disables deduplication for this entry.
    pub idempotency_key: String,
    /// Human description.
    pub description: String,
    /// Payment intent correlation id.
    pub payment_intent_id: Option<String>,
    /// Refund correlation id.
    pub refund_id: Option<String>,
    /// Payout correlation id.
    pub payout_id: Option<String>,
    /// Transfer correlation id.
    pub transfer_id: Option<String>,
    /// Dispute correlation id.
    pub dispute_id: Option<String>,
    /// Caller-supplied metadata.
    pub metadata: Metadata,
    /// The postings (at least two, summing to zero).
    pub postings: Vec<NewPosting>,
}

/// Input for creating a hold.
#[derive(Debug, Clone)]
pub struct NewHold {
    /// Owning tenant.
    pub tenant_id: String,
    /// Account to reserve funds on.
    pub account_id: AccountId,
    /// Amount to reserve, must be positive.
    pub amount: i64,
    /// Currency; the account's currency when `None`.
    pub currency: Option<String>,
    /// Payment intent correlation id.
    pub payment_intent_id: Option<String>,
    /// Expiry; now plus the configured hold lifetime when `None`.
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewHold {
    /// Creates an input with defaulted currency and expiry.
    #[must_use]
    pub fn new(tenant_id: &str, account_id: AccountId, amount: i64) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            account_id,
            amount,
            currency: None,
            payment_intent_id: None,
            expires_at: None,
        }
    }
}

/// Filter for listing entries. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Only entries of this tenant.
    pub tenant_id: Option<String>,
    /// Only entries with a posting against this account.
    pub account_id: Option<AccountId>,
    /// Only entries with this payment intent id.
    pub payment_intent_id: Option<String>,
    /// Only entries with this refund id.
    pub refund_id: Option<String>,
    /// Only entries with this payout id.
    pub payout_id: Option<String>,
    /// Only entries with this dispute id.
    pub dispute_id: Option<String>,
    /// Only entries created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Only entries created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
    /// Maximum number of entries returned. `None` or `Some(0)` means no cap.
    pub limit: Option<usize>,
}

impl EntryFilter {
    /// Filter for every entry of a tenant.
    #[must_use]
    pub fn for_tenant(tenant_id: &str) -> Self {
        Self {
            tenant_id: Some(tenant_id.to_string()),
            ..Self::default()
        }
    }

    /// Returns true if the entry satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &Entry) -> bool {
        fn same(want: Option<&String>, have: Option<&String>) -> bool {
            want.is_none_or(|w| have == Some(w))
        }

        self.tenant_id.as_ref().is_none_or(|t| *t == entry.tenant_id)
            && self.account_id.is_none_or(|a| entry.touches(a))
            && same(self.payment_intent_id.as_ref(), entry.payment_intent_id.as_ref())
            && same(self.refund_id.as_ref(), entry.refund_id.as_ref())
            && same(self.payout_id.as_ref(), entry.payout_id.as_ref())
            && same(self.dispute_id.as_ref(), entry.dispute_id.as_ref())
            && self.created_after.is_none_or(|after| entry.created_at > after)
            && self.created_before.is_none_or(|before| entry.created_at < before)
    }
}
