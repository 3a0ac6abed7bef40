//! Property-based tests for the ledger tables.
//!
//! - Property 4: Balance conservation
//! - Property 5: Hold conservation
//! - Property 6: Idempotent replay

use chrono::Utc;
use proptest::prelude::*;
use tally_shared::types::AccountId;

use super::accounts::names;
use super::store::LedgerTables;
use super::types::{AccountType, HoldStatus, NewAccount, NewEntry, NewHold, NewPosting};

const ACCOUNTS: usize = 4;

/// One entry moving `amount` from account `from` to account `to`.
#[derive(Debug, Clone)]
struct Transfer {
    from: usize,
    to: usize,
    amount: i64,
}

fn transfer() -> impl Strategy<Value = Transfer> {
    (0..ACCOUNTS, 0..ACCOUNTS, 1i64..1_000_000).prop_map(|(from, to, amount)| Transfer {
        from,
        to,
        amount,
    })
}

#[derive(Debug, Clone, Copy)]
enum Resolution {
    Capture(i64),
    Void,
    Expire,
}

fn resolution() -> impl Strategy<Value = Resolution> {
    prop_oneof![
        (0i64..2_000).prop_map(Resolution::Capture),
        Just(Resolution::Void),
        Just(Resolution::Expire),
    ]
}

fn setup() -> (LedgerTables, Vec<AccountId>) {
    let mut tables = LedgerTables::default();
    let now = Utc::now();
    let types = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Revenue,
        AccountType::Expense,
    ];
    let ids = types
        .iter()
        .enumerate()
        .map(|(i, t)| {
            tables
                .create_account(NewAccount::new("t1", &format!("acct-{i}"), *t), now)
                .unwrap()
                .id
        })
        .collect();
    (tables, ids)
}

fn entry(ids: &[AccountId], key: String, t: &Transfer) -> NewEntry {
    NewEntry {
        tenant_id: "t1".to_string(),
        idempotency_key: key,
        postings: vec![
            NewPosting::debit(ids[t.to], t.amount),
            NewPosting::credit(ids[t.from], t.amount),
        ],
        ..NewEntry::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 4: Posted balances across all accounts always sum to zero.
    #[test]
    fn prop_posted_balances_sum_to_zero(transfers in prop::collection::vec(transfer(), 0..30)) {
        let (mut tables, ids) = setup();
        let now = Utc::now();

        for (i, t) in transfers.iter().enumerate() {
            tables.post_entry(entry(&ids, format!("e{i}"), t), now).unwrap();

            let total: i128 = tables
                .balances
                .values()
                .map(|b| i128::from(b.posted_balance))
                .sum();
            prop_assert_eq!(total, 0);
        }
        prop_assert_eq!(tables.entries.len(), transfers.len());
    }

    /// Property 5: available = posted - held after every transition, and held
    /// returns to zero once every hold resolves.
    #[test]
    fn prop_holds_conserve_balance(
        amounts in prop::collection::vec(1i64..1_000, 1..8),
        resolutions in prop::collection::vec(resolution(), 8),
    ) {
        let (mut tables, ids) = setup();
        let now = Utc::now();
        let source = ids[0];
        tables
            .create_account(NewAccount::new("t1", names::PLATFORM_CASH, AccountType::Asset), now)
            .unwrap();

        let check = |tables: &LedgerTables| -> Result<(), TestCaseError> {
            for b in tables.balances.values() {
                prop_assert_eq!(b.available_balance, b.posted_balance - b.held_balance);
                prop_assert!(b.held_balance >= 0);
            }
            Ok(())
        };

        let holds: Vec<_> = amounts
            .iter()
            .map(|amount| tables.create_hold(NewHold::new("t1", source, *amount), now).unwrap())
            .collect();
        check(&tables)?;
        let held: i64 = amounts.iter().sum();
        prop_assert_eq!(tables.get_balance(source, "usd", now).unwrap().held_balance, held);

        let mut captured = 0;
        for (hold, resolution) in holds.iter().zip(&resolutions) {
            match *resolution {
                Resolution::Capture(amount) => {
                    let result = tables.capture_hold(hold.id, amount, now);
                    if amount > hold.amount {
                        prop_assert!(result.is_err());
                        tables.void_hold(hold.id, now).unwrap();
                    } else {
                        captured += result.unwrap().amount_for(source);
                    }
                }
                Resolution::Void => {
                    tables.void_hold(hold.id, now).unwrap();
                }
                Resolution::Expire => {
                    let mut expired = hold.clone();
                    expired.expires_at = now;
                    tables.holds.insert(hold.id, expired);
                    let swept = tables.expire_holds(now);
                    prop_assert_eq!(swept.len(), 1);
                    prop_assert_eq!(swept[0].status, HoldStatus::Expired);
                }
            }
            check(&tables)?;
        }

        let balance = tables.get_balance(source, "usd", now).unwrap();
        prop_assert_eq!(balance.held_balance, 0);
        prop_assert_eq!(balance.posted_balance, captured);
        prop_assert!(tables.holds.values().all(|h| !h.status.is_pending()));
    }

    /// Property 6: Replaying a key never changes balances, whatever the payload.
    #[test]
    fn prop_replay_has_no_effect(first in transfer(), retry in transfer()) {
        let (mut tables, ids) = setup();
        let now = Utc::now();

        let original = tables.post_entry(entry(&ids, "k".to_string(), &first), now).unwrap();
        let before = tables.balances.clone();

        let err = tables.post_entry(entry(&ids, "k".to_string(), &retry), now).unwrap_err();
        prop_assert!(err.is_duplicate());
        prop_assert_eq!(&tables.balances, &before);
        prop_assert_eq!(tables.entries.len(), 1);
        prop_assert!(tables.entries.contains_key(&original.id));
    }
}
