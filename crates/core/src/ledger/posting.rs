//! Entry/posting engine.
//!
//! [`LedgerTables::post_entry`] is the single path through which money moves:
//! the payment operations and hold captures all end up here, so the zero-sum
//! rule, tenant scoping and idempotency are enforced in one place.
//!
//! Commit steps, all under the caller's exclusive lock:
//! 1. posting count and overall zero-sum ([`validate_postings`])
//! 2. every account exists within the entry's tenant
//! 3. zero-sum per resolved currency
//! 4. idempotency lookup; a hit returns `DuplicateEntry` with the original
//! 5. overflow projection against current balances
//! 6. store, index and apply every posting to its balance
//!
//! Steps 1-5 never mutate, so a rejected entry leaves no trace.

use chrono::{DateTime, Utc};
use tally_shared::types::{EntryId, PostingId, normalize_currency};
use tracing::{debug, info};

use super::balance::BalanceProjection;
use super::error::{LedgerError, LedgerResult, Resource};
use super::store::{LedgerTables, tenant_key};
use super::types::{Entry, EntryFilter, NewEntry, Posting};
use super::validation::{validate_currency_balance, validate_postings};

impl LedgerTables {
    /// Validates and commits a balanced entry.
    pub(crate) fn post_entry(&mut self, input: NewEntry, now: DateTime<Utc>) -> LedgerResult<Entry> {
        validate_postings(&input.postings)?;

        let mut resolved = Vec::with_capacity(input.postings.len());
        for posting in &input.postings {
            let account = self.tenant_account(&input.tenant_id, posting.account_id)?;
            let currency =
                normalize_currency(posting.currency.as_deref().unwrap_or_default(), &account.currency);
            resolved.push((posting.account_id, posting.amount, currency));
        }

        validate_currency_balance(resolved.iter().map(|(_, amount, c)| (c.as_str(), *amount)))?;

        let dedupe = !input.idempotency_key.trim().is_empty();
        if dedupe {
            let key = tenant_key(&input.tenant_id, &input.idempotency_key);
            if let Some(existing) = self.idempotency.get(&key).and_then(|id| self.entries.get(id)) {
                debug!(
                    tenant_id = %existing.tenant_id,
                    entry_id = %existing.id,
                    idempotency_key = %existing.idempotency_key,
                    "Idempotent replay of committed entry"
                );
                return Err(LedgerError::DuplicateEntry(Box::new(existing.clone())));
            }
        }

        let mut projection = BalanceProjection::default();
        for (account_id, amount, currency) in &resolved {
            projection.apply(self, *account_id, currency, *amount)?;
        }

        let entry_id = EntryId::new();
        let postings: Vec<Posting> = resolved
            .into_iter()
            .map(|(account_id, amount, currency)| Posting {
                id: PostingId::new(),
                entry_id,
                account_id,
                amount,
                currency,
                created_at: now,
            })
            .collect();

        let entry = Entry {
            id: entry_id,
            idempotency_key: if dedupe {
                input.idempotency_key
            } else {
                String::new()
            },
            tenant_id: input.tenant_id,
            description: input.description,
            payment_intent_id: input.payment_intent_id,
            refund_id: input.refund_id,
            payout_id: input.payout_id,
            transfer_id: input.transfer_id,
            dispute_id: input.dispute_id,
            metadata: input.metadata,
            postings,
            created_at: now,
        };

        for posting in &entry.postings {
            self.balance_mut(posting.account_id, &posting.currency, now)
                .apply_posting(posting.amount, now);
        }
        if dedupe {
            self.idempotency.insert(
                tenant_key(&entry.tenant_id, &entry.idempotency_key),
                entry.id,
            );
        }
        self.entry_log.push(entry.id);
        self.entries.insert(entry.id, entry.clone());

        info!(
            tenant_id = %entry.tenant_id,
            entry_id = %entry.id,
            idempotency_key = %entry.idempotency_key,
            postings = entry.postings.len(),
            "Entry committed"
        );
        Ok(entry)
    }

    /// Returns a committed entry by id.
    pub(crate) fn get_entry(&self, id: EntryId) -> LedgerResult<Entry> {
        self.entries
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(Resource::Entry, id))
    }

    /// Lists matching entries in commit order, oldest first, capped at the filter limit.
    pub(crate) fn list_entries(&self, filter: &EntryFilter) -> Vec<Entry> {
        let limit = match filter.limit {
            Some(0) | None => usize::MAX,
            Some(n) => n,
        };
        self.entry_log
            .iter()
            .filter_map(|id| self.entries.get(id))
            .filter(|entry| filter.matches(entry))
            .take(limit)
            .cloned()
            .collect()
    }
}
