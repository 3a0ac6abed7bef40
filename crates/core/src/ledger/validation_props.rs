//! Property-based tests for posting validation.
//!
//! - Property 1: Zero-sum acceptance
//! - Property 2: Non-zero sums are rejected with the exact sum
//! - Property 3: Posting count

use proptest::prelude::*;
use tally_shared::types::AccountId;

use super::error::LedgerError;
use super::types::NewPosting;
use super::validation::{validate_currency_balance, validate_postings};

/// Strategy to generate signed amounts in minor units.
fn signed_amount() -> impl Strategy<Value = i64> {
    -1_000_000_000i64..1_000_000_000i64
}

/// Strategy to generate a list of postings closed by a balancing leg.
fn balanced_postings() -> impl Strategy<Value = Vec<NewPosting>> {
    prop::collection::vec(signed_amount(), 1..10).prop_map(|amounts| {
        let closing: i64 = amounts.iter().sum();
        amounts
            .into_iter()
            .chain(std::iter::once(-closing))
            .map(|amount| NewPosting::debit(AccountId::new(), amount))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 1: Any set of two or more postings summing to zero is accepted.
    #[test]
    fn prop_balanced_postings_accepted(postings in balanced_postings()) {
        prop_assert!(validate_postings(&postings).is_ok());
    }

    /// Property 2: Any non-zero sum is rejected and reported exactly.
    #[test]
    fn prop_unbalanced_postings_rejected(
        postings in balanced_postings(),
        skew in signed_amount().prop_filter("non-zero", |s| *s != 0),
    ) {
        let mut postings = postings;
        postings.push(NewPosting::debit(AccountId::new(), skew));

        match validate_postings(&postings) {
            Err(LedgerError::PostingsNotBalanced { sum, currency: None }) => {
                prop_assert_eq!(sum, i128::from(skew));
            }
            other => prop_assert!(false, "expected PostingsNotBalanced, got {:?}", other),
        }
    }

    /// Property 3: Fewer than two postings is always rejected, even at zero.
    #[test]
    fn prop_single_posting_rejected(amount in signed_amount()) {
        let postings = vec![NewPosting::debit(AccountId::new(), amount)];
        prop_assert!(
            matches!(
                validate_postings(&postings),
                Err(LedgerError::EmptyPostings(1))
            ),
            "single posting should be rejected"
        );
    }

    /// Property 1.1: Per-currency check accepts each currency balanced on its own.
    #[test]
    fn prop_currency_balance_accepts_independent_currencies(
        usd in signed_amount(),
        eur in signed_amount(),
    ) {
        let legs = [("usd", usd), ("eur", eur), ("usd", -usd), ("eur", -eur)];
        prop_assert!(validate_currency_balance(legs).is_ok());
    }

    /// Property 2.1: Moving value across currencies is rejected even when the
    /// grand total is zero.
    #[test]
    fn prop_cross_currency_transfer_rejected(
        amount in signed_amount().prop_filter("non-zero", |a| *a != 0),
    ) {
        let legs = [("usd", amount), ("eur", -amount)];
        prop_assert!(validate_currency_balance(legs).is_err());
    }
}
