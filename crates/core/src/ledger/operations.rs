//! Payment operations built on the ledger contract.
//!
//! Each operation provisions its well-known accounts with `ensure_account`,
//! assembles a balanced entry and posts it under a key derived from the
//! external id (`payment:{id}`, `refund:{id}`, ...). A retried call gets the
//! originally committed entry back instead of `DuplicateEntry`.
//!
//! | Operation | Debit | Credit |
//! |---|---|---|
//! | payment | `platform:cash` | `customer_balance:{customer}` (amount − fees), `platform:fees` (fees) |
//! | refund | `customer_balance:{customer}` | `platform:cash` |
//! | payout | `merchant_settlement:{merchant}` | `platform:cash` |
//! | dispute | `platform:disputes_held` | `platform:cash` |

use async_trait::async_trait;
use tally_shared::types::{Money, normalize_currency};

use super::accounts::names;
use super::error::{LedgerError, LedgerResult};
use super::service::Ledger;
use super::types::{Account, AccountType, Entry, NewEntry, NewPosting};

/// High-level payment operations, available on every [`Ledger`].
#[async_trait]
pub trait PaymentOperations: Ledger {
    /// Records a captured payment, net of platform fees.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if `amount <= 0` or `fees` is outside `0..=amount`.
    async fn record_payment(
        &self,
        tenant_id: &str,
        payment_intent_id: &str,
        amount: i64,
        currency: &str,
        customer_id: &str,
        fees: i64,
    ) -> LedgerResult<Entry> {
        ensure_positive(amount)?;
        if !(0..=amount).contains(&fees) {
            return Err(LedgerError::InvalidAmount(fees));
        }

        let cash = self.cash_account(tenant_id, currency).await?;
        let currency = normalize_currency(currency, &cash.currency);
        let customer = self
            .ensure_account(
                tenant_id,
                &names::customer_balance(customer_id),
                AccountType::Liability,
                &currency,
            )
            .await?;

        let mut postings = vec![
            NewPosting::debit(cash.id, amount).in_currency(&currency),
            NewPosting::credit(customer.id, amount - fees).in_currency(&currency),
        ];
        if fees > 0 {
            let fee_account = self
                .ensure_account(tenant_id, names::PLATFORM_FEES, AccountType::Revenue, &currency)
                .await?;
            postings.push(NewPosting::credit(fee_account.id, fees).in_currency(&currency));
        }

        self.post_idempotent(NewEntry {
            tenant_id: tenant_id.to_string(),
            idempotency_key: format!("payment:{payment_intent_id}"),
            description: format!(
                "Payment {payment_intent_id}: {} (fees {})",
                Money::new(amount, &currency),
                Money::new(fees, &currency)
            ),
            payment_intent_id: Some(payment_intent_id.to_string()),
            postings,
            ..NewEntry::default()
        })
        .await
    }

    /// Records a refund paid back out of platform cash.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if `amount <= 0`.
    async fn record_refund(
        &self,
        tenant_id: &str,
        refund_id: &str,
        amount: i64,
        currency: &str,
        customer_id: &str,
    ) -> LedgerResult<Entry> {
        ensure_positive(amount)?;

        let cash = self.cash_account(tenant_id, currency).await?;
        let currency = normalize_currency(currency, &cash.currency);
        let customer = self
            .ensure_account(
                tenant_id,
                &names::customer_balance(customer_id),
                AccountType::Liability,
                &currency,
            )
            .await?;

        self.post_idempotent(NewEntry {
            tenant_id: tenant_id.to_string(),
            idempotency_key: format!("refund:{refund_id}"),
            description: format!(
                "Refund {refund_id}: {} to customer {customer_id}",
                Money::new(amount, &currency)
            ),
            refund_id: Some(refund_id.to_string()),
            postings: vec![
                NewPosting::debit(customer.id, amount).in_currency(&currency),
                NewPosting::credit(cash.id, amount).in_currency(&currency),
            ],
            ..NewEntry::default()
        })
        .await
    }

    /// Records a payout of settled funds to a merchant.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if `amount <= 0`.
    async fn record_payout(
        &self,
        tenant_id: &str,
        payout_id: &str,
        amount: i64,
        currency: &str,
        merchant_id: &str,
    ) -> LedgerResult<Entry> {
        ensure_positive(amount)?;

        let cash = self.cash_account(tenant_id, currency).await?;
        let currency = normalize_currency(currency, &cash.currency);
        let merchant = self
            .ensure_account(
                tenant_id,
                &names::merchant_settlement(merchant_id),
                AccountType::Liability,
                &currency,
            )
            .await?;

        self.post_idempotent(NewEntry {
            tenant_id: tenant_id.to_string(),
            idempotency_key: format!("payout:{payout_id}"),
            description: format!(
                "Payout {payout_id}: {} to merchant {merchant_id}",
                Money::new(amount, &currency)
            ),
            payout_id: Some(payout_id.to_string()),
            postings: vec![
                NewPosting::debit(merchant.id, amount).in_currency(&currency),
                NewPosting::credit(cash.id, amount).in_currency(&currency),
            ],
            ..NewEntry::default()
        })
        .await
    }

    /// Moves disputed funds out of platform cash into the dispute reserve.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` if `amount <= 0`.
    async fn record_dispute(
        &self,
        tenant_id: &str,
        dispute_id: &str,
        amount: i64,
        currency: &str,
        customer_id: &str,
    ) -> LedgerResult<Entry> {
        ensure_positive(amount)?;

        let cash = self.cash_account(tenant_id, currency).await?;
        let currency = normalize_currency(currency, &cash.currency);
        let reserve = self
            .ensure_account(
                tenant_id,
                names::PLATFORM_DISPUTES_HELD,
                AccountType::Asset,
                &currency,
            )
            .await?;

        self.post_idempotent(NewEntry {
            tenant_id: tenant_id.to_string(),
            idempotency_key: format!("dispute:{dispute_id}"),
            description: format!(
                "Dispute {dispute_id}: {} from customer {customer_id}",
                Money::new(amount, &currency)
            ),
            dispute_id: Some(dispute_id.to_string()),
            postings: vec![
                NewPosting::debit(reserve.id, amount).in_currency(&currency),
                NewPosting::credit(cash.id, amount).in_currency(&currency),
            ],
            ..NewEntry::default()
        })
        .await
    }

    /// Provisions the tenant's `platform:cash` account.
    async fn cash_account(&self, tenant_id: &str, currency: &str) -> LedgerResult<Account> {
        self.ensure_account(tenant_id, names::PLATFORM_CASH, AccountType::Asset, currency)
            .await
    }

    /// Posts an entry, returning the original entry on an idempotent replay.
    async fn post_idempotent(&self, input: NewEntry) -> LedgerResult<Entry> {
        match self.post_entry(input).await {
            Err(LedgerError::DuplicateEntry(original)) => Ok(*original),
            other => other,
        }
    }
}

#[async_trait]
impl<L: Ledger + ?Sized> PaymentOperations for L {}

fn ensure_positive(amount: i64) -> LedgerResult<()> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}
