//! Hold lifecycle: authorize, then capture, void or expire.
//!
//! ```text
//! pending ──capture──▶ captured
//!    │ ──void─────▶ voided
//!    └ ──expiry───▶ expired
//! ```
//!
//! A hold reserves `amount` on its account's balance (`held += amount`)
//! without moving money. Leaving `pending` always releases the full
//! reservation; only capture also commits an entry.

use chrono::{DateTime, TimeDelta, Utc};
use tally_shared::types::{HoldId, Money, normalize_currency};
use tracing::{info, warn};

use super::accounts::names;
use super::error::{LedgerError, LedgerResult, Resource};
use super::store::LedgerTables;
use super::types::{Entry, Hold, HoldStatus, NewEntry, NewHold, NewPosting};

impl LedgerTables {
    /// Reserves funds on an account.
    pub(crate) fn create_hold(&mut self, input: NewHold, now: DateTime<Utc>) -> LedgerResult<Hold> {
        if input.amount <= 0 {
            return Err(LedgerError::InvalidAmount(input.amount));
        }
        let account = self.tenant_account(&input.tenant_id, input.account_id)?;
        let currency = normalize_currency(
            input.currency.as_deref().unwrap_or_default(),
            &account.currency,
        );

        let (posted, held) = self
            .balances
            .get(&(input.account_id, currency.clone()))
            .map_or((0, 0), |b| (b.posted_balance, b.held_balance));
        held.checked_add(input.amount)
            .and_then(|next| posted.checked_sub(next))
            .ok_or_else(|| LedgerError::BalanceOverflow {
                account_id: input.account_id,
                currency: currency.clone(),
            })?;

        let hold = Hold {
            id: HoldId::new(),
            tenant_id: input.tenant_id,
            account_id: input.account_id,
            amount: input.amount,
            currency,
            status: HoldStatus::Pending,
            payment_intent_id: input.payment_intent_id,
            captured_entry_id: None,
            expires_at: input
                .expires_at
                .unwrap_or_else(|| self.default_expiry(now)),
            created_at: now,
            updated_at: now,
        };

        self.balance_mut(hold.account_id, &hold.currency, now)
            .hold(hold.amount, now);
        self.holds.insert(hold.id, hold.clone());

        info!(
            tenant_id = %hold.tenant_id,
            hold_id = %hold.id,
            account_id = %hold.account_id,
            amount = hold.amount,
            "Hold created"
        );
        Ok(hold)
    }

    /// Returns a hold with its status as observed at `now`.
    pub(crate) fn get_hold(&self, id: HoldId, now: DateTime<Utc>) -> LedgerResult<Hold> {
        let hold = self
            .holds
            .get(&id)
            .ok_or_else(|| LedgerError::not_found(Resource::Hold, id))?;
        Ok(Hold {
            status: hold.status_at(now),
            ..hold.clone()
        })
    }

    /// Captures a pending hold into a committed entry.
    ///
    /// `amount <= 0` captures the full reservation. The whole reservation is
    /// released either way; an uncaptured remainder simply becomes available
    /// again. Nothing changes unless the entry commits.
    pub(crate) fn capture_hold(
        &mut self,
        id: HoldId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> LedgerResult<Entry> {
        let hold = self.pending_hold(id, now)?.clone();

        let capture = if amount <= 0 { hold.amount } else { amount };
        if capture > hold.amount {
            return Err(LedgerError::CaptureExceedsHold {
                requested: capture,
                held: hold.amount,
            });
        }

        let cash = self
            .find_account(&hold.tenant_id, names::PLATFORM_CASH)
            .map_err(|e| {
                warn!(
                    tenant_id = %hold.tenant_id,
                    hold_id = %hold.id,
                    "Capture rejected: tenant has no platform:cash account"
                );
                LedgerError::CaptureRequiresCashAccount(Box::new(e))
            })?
            .id;

        let input = NewEntry {
            tenant_id: hold.tenant_id.clone(),
            idempotency_key: format!("capture:{}", hold.id),
            description: format!(
                "Capture hold {} for {}",
                hold.id,
                Money::new(capture, &hold.currency)
            ),
            payment_intent_id: hold.payment_intent_id.clone(),
            postings: vec![
                NewPosting::credit(hold.account_id, capture).in_currency(&hold.currency),
                NewPosting::debit(cash, capture).in_currency(&hold.currency),
            ],
            ..NewEntry::default()
        };
        // A pending hold has never committed its capture entry, so a hit on
        // `capture:{hold_id}` belongs to some other entry and must not be adopted.
        let entry = self.post_entry(input, now).inspect_err(|e| {
            if e.is_duplicate() {
                warn!(
                    tenant_id = %hold.tenant_id,
                    hold_id = %hold.id,
                    "Capture rejected: capture key already used by another entry"
                );
            }
        })?;

        self.resolve_hold(id, HoldStatus::Captured, now);
        if let Some(stored) = self.holds.get_mut(&id) {
            stored.captured_entry_id = Some(entry.id);
        }

        info!(
            tenant_id = %hold.tenant_id,
            hold_id = %hold.id,
            entry_id = %entry.id,
            captured = capture,
            released = hold.amount,
            "Hold captured"
        );
        Ok(entry)
    }

    /// Releases a pending hold without moving money.
    pub(crate) fn void_hold(&mut self, id: HoldId, now: DateTime<Utc>) -> LedgerResult<Hold> {
        self.pending_hold(id, now)?;
        let hold = self.resolve_hold(id, HoldStatus::Voided, now);

        if let Some(hold) = &hold {
            info!(
                tenant_id = %hold.tenant_id,
                hold_id = %hold.id,
                released = hold.amount,
                "Hold voided"
            );
        }
        hold.ok_or_else(|| LedgerError::not_found(Resource::Hold, id))
    }

    /// Moves every pending hold whose expiry has passed to `expired`.
    ///
    /// Returns the swept holds ordered by id.
    pub(crate) fn expire_holds(&mut self, now: DateTime<Utc>) -> Vec<Hold> {
        let mut due: Vec<HoldId> = self
            .holds
            .values()
            .filter(|h| h.status.is_pending() && h.expires_at <= now)
            .map(|h| h.id)
            .collect();
        due.sort_unstable();

        let expired: Vec<Hold> = due
            .into_iter()
            .filter_map(|id| self.resolve_hold(id, HoldStatus::Expired, now))
            .collect();

        if !expired.is_empty() {
            info!(count = expired.len(), "Expired holds swept");
        }
        expired
    }

    /// Returns the hold if it is still pending at `now`.
    fn pending_hold(&self, id: HoldId, now: DateTime<Utc>) -> LedgerResult<&Hold> {
        let hold = self
            .holds
            .get(&id)
            .ok_or_else(|| LedgerError::not_found(Resource::Hold, id))?;
        match hold.status_at(now) {
            HoldStatus::Pending => Ok(hold),
            status => Err(LedgerError::HoldNotPending {
                hold_id: id,
                status,
            }),
        }
    }

    /// Flips a hold to a terminal status and releases its reservation.
    fn resolve_hold(&mut self, id: HoldId, status: HoldStatus, now: DateTime<Utc>) -> Option<Hold> {
        let hold = self.holds.get_mut(&id)?;
        hold.status = status;
        hold.updated_at = now;
        let hold = hold.clone();

        self.balance_mut(hold.account_id, &hold.currency, now)
            .release(hold.amount, now);
        Some(hold)
    }

    fn default_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        i64::try_from(self.config.hold_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::error::ErrorKind;
    use crate::ledger::types::{AccountType, NewAccount};
    use chrono::Duration;
    use tally_shared::types::AccountId;

    struct Fixture {
        tables: LedgerTables,
        now: DateTime<Utc>,
        customer: AccountId,
        cash: AccountId,
    }

    fn setup() -> Fixture {
        let now = Utc::now();
        let mut tables = LedgerTables::default();
        let customer = tables
            .create_account(NewAccount::new("t1", "customer", AccountType::Asset), now)
            .unwrap()
            .id;
        let cash = tables
            .create_account(NewAccount::new("t1", names::PLATFORM_CASH, AccountType::Asset), now)
            .unwrap()
            .id;
        Fixture {
            tables,
            now,
            customer,
            cash,
        }
    }

    impl Fixture {
        fn hold(&mut self, amount: i64) -> Hold {
            self.tables
                .create_hold(NewHold::new("t1", self.customer, amount), self.now)
                .unwrap()
        }

        fn balance(&self, account_id: AccountId) -> (i64, i64, i64) {
            let b = self.tables.get_balance(account_id, "usd", self.now).unwrap();
            (b.posted_balance, b.held_balance, b.available_balance)
        }
    }

    #[test]
    fn test_create_hold_reserves_funds() {
        let mut f = setup();
        let hold = f.hold(3000);

        assert_eq!(hold.status, HoldStatus::Pending);
        assert_eq!(hold.currency, "usd");
        assert_eq!(hold.expires_at, f.now + Duration::days(7));
        assert_eq!(f.balance(f.customer), (0, 3000, -3000));
    }

    #[test]
    fn test_create_hold_validation() {
        let mut f = setup();
        assert_eq!(
            f.tables
                .create_hold(NewHold::new("t1", f.customer, 0), f.now)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidAmount
        );
        assert_eq!(
            f.tables
                .create_hold(NewHold::new("t1", AccountId::new(), 100), f.now)
                .unwrap_err()
                .kind(),
            ErrorKind::AccountNotFound
        );
        assert_eq!(
            f.tables
                .create_hold(NewHold::new("t2", f.customer, 100), f.now)
                .unwrap_err()
                .kind(),
            ErrorKind::AccountNotFound
        );
        assert!(f.tables.holds.is_empty());
    }

    #[test]
    fn test_full_capture_posts_entry_and_releases() {
        let mut f = setup();
        let hold = f.hold(3000);

        let entry = f.tables.capture_hold(hold.id, 3000, f.now).unwrap();
        assert_eq!(entry.idempotency_key, format!("capture:{}", hold.id));
        assert_eq!(entry.amount_for(f.customer), -3000);
        assert_eq!(entry.amount_for(f.cash), 3000);

        let stored = f.tables.get_hold(hold.id, f.now).unwrap();
        assert_eq!(stored.status, HoldStatus::Captured);
        assert_eq!(stored.captured_entry_id, Some(entry.id));
        assert_eq!(f.balance(f.customer), (-3000, 0, -3000));
        assert_eq!(f.balance(f.cash), (3000, 0, 3000));
    }

    #[test]
    fn test_partial_capture_releases_remainder() {
        let mut f = setup();
        let hold = f.hold(3000);

        let entry = f.tables.capture_hold(hold.id, 1200, f.now).unwrap();
        assert_eq!(entry.amount_for(f.cash), 1200);
        assert_eq!(f.balance(f.customer), (-1200, 0, -1200));
    }

    #[test]
    fn test_non_positive_capture_takes_full_amount() {
        let mut f = setup();
        let hold = f.hold(800);
        let entry = f.tables.capture_hold(hold.id, 0, f.now).unwrap();
        assert_eq!(entry.amount_for(f.cash), 800);
    }

    #[test]
    fn test_capture_exceeding_hold_changes_nothing() {
        let mut f = setup();
        let hold = f.hold(3000);

        let err = f.tables.capture_hold(hold.id, 5000, f.now).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::CaptureExceedsHold {
                requested: 5000,
                held: 3000
            }
        ));
        assert_eq!(
            f.tables.get_hold(hold.id, f.now).unwrap().status,
            HoldStatus::Pending
        );
        assert_eq!(f.balance(f.customer), (0, 3000, -3000));
        assert!(f.tables.entries.is_empty());
    }

    #[test]
    fn test_capture_without_cash_account_leaves_hold_pending() {
        let now = Utc::now();
        let mut tables = LedgerTables::default();
        let account = tables
            .create_account(NewAccount::new("t1", "customer", AccountType::Asset), now)
            .unwrap();
        let hold = tables
            .create_hold(NewHold::new("t1", account.id, 500), now)
            .unwrap();

        let err = tables.capture_hold(hold.id, 500, now).unwrap_err();
        assert_eq!(err.error_code(), "CAPTURE_REQUIRES_CASH_ACCOUNT");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            tables.get_hold(hold.id, now).unwrap().status,
            HoldStatus::Pending
        );
        assert_eq!(
            tables.get_balance(account.id, "usd", now).unwrap().held_balance,
            500
        );
    }

    #[test]
    fn test_capture_key_taken_by_other_entry_leaves_hold_pending() {
        let mut f = setup();
        let other = f
            .tables
            .create_account(NewAccount::new("t1", "other", AccountType::Asset), f.now)
            .unwrap()
            .id;
        let hold = f.hold(3000);
        let squatter = f
            .tables
            .post_entry(
                NewEntry {
                    tenant_id: "t1".to_string(),
                    idempotency_key: format!("capture:{}", hold.id),
                    postings: vec![NewPosting::debit(other, 1), NewPosting::credit(f.cash, 1)],
                    ..NewEntry::default()
                },
                f.now,
            )
            .unwrap();

        let err = f.tables.capture_hold(hold.id, 3000, f.now).unwrap_err();
        match err {
            LedgerError::DuplicateEntry(existing) => assert_eq!(existing.id, squatter.id),
            err => panic!("expected DuplicateEntry, got {err:?}"),
        }

        let stored = f.tables.get_hold(hold.id, f.now).unwrap();
        assert_eq!(stored.status, HoldStatus::Pending);
        assert_eq!(stored.captured_entry_id, None);
        assert_eq!(f.balance(f.customer), (0, 3000, -3000));
        assert_eq!(f.tables.entries.len(), 1);
    }

    #[test]
    fn test_resolved_hold_rejects_further_transitions() {
        let mut f = setup();
        let hold = f.hold(1000);
        f.tables.void_hold(hold.id, f.now).unwrap();

        assert!(matches!(
            f.tables.capture_hold(hold.id, 0, f.now),
            Err(LedgerError::HoldNotPending {
                status: HoldStatus::Voided,
                ..
            })
        ));
        assert_eq!(
            f.tables.void_hold(hold.id, f.now).unwrap_err().kind(),
            ErrorKind::HoldNotPending
        );
    }

    #[test]
    fn test_void_releases_without_entry() {
        let mut f = setup();
        let hold = f.hold(1000);

        let voided = f.tables.void_hold(hold.id, f.now).unwrap();
        assert_eq!(voided.status, HoldStatus::Voided);
        assert!(f.tables.entries.is_empty());
        assert_eq!(f.balance(f.customer), (0, 0, 0));
    }

    #[test]
    fn test_unknown_hold() {
        let mut f = setup();
        let missing = HoldId::new();
        assert_eq!(
            f.tables.capture_hold(missing, 0, f.now).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            f.tables.void_hold(missing, f.now).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            f.tables.get_hold(missing, f.now).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_expired_hold_cannot_be_captured() {
        let mut f = setup();
        let hold = f.hold(1000);
        let later = hold.expires_at + Duration::seconds(1);

        assert_eq!(
            f.tables.get_hold(hold.id, later).unwrap().status,
            HoldStatus::Expired
        );
        assert!(matches!(
            f.tables.capture_hold(hold.id, 0, later),
            Err(LedgerError::HoldNotPending {
                status: HoldStatus::Expired,
                ..
            })
        ));
    }

    #[test]
    fn test_expire_holds_sweeps_due_holds_only() {
        let mut f = setup();
        let short = f
            .tables
            .create_hold(
                NewHold {
                    expires_at: Some(f.now + Duration::minutes(5)),
                    ..NewHold::new("t1", f.customer, 400)
                },
                f.now,
            )
            .unwrap();
        let long = f.hold(600);

        let swept = f.tables.expire_holds(f.now + Duration::minutes(10));
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].id, short.id);
        assert_eq!(swept[0].status, HoldStatus::Expired);
        assert_eq!(f.balance(f.customer), (0, 600, -600));

        assert!(f.tables.expire_holds(f.now + Duration::minutes(10)).is_empty());
        assert_eq!(
            f.tables.get_hold(long.id, f.now).unwrap().status,
            HoldStatus::Pending
        );
    }

    #[test]
    fn test_hold_in_explicit_currency() {
        let mut f = setup();
        let hold = f
            .tables
            .create_hold(
                NewHold {
                    currency: Some("EUR".to_string()),
                    ..NewHold::new("t1", f.customer, 900)
                },
                f.now,
            )
            .unwrap();
        assert_eq!(hold.currency, "eur");

        let entry = f.tables.capture_hold(hold.id, 0, f.now).unwrap();
        assert!(entry.postings.iter().all(|p| p.currency == "eur"));
        let eur = f.tables.get_balance(f.cash, "eur", f.now).unwrap();
        assert_eq!(eur.posted_balance, 900);
    }
}
