//! Business rule validation for journal entries.
//!
//! These checks are pure: they look only at the supplied amounts, never at
//! ledger state, and run before the posting engine touches anything.

use std::collections::BTreeMap;

use super::error::{LedgerError, LedgerResult};
use super::types::NewPosting;

/// Minimum number of postings in an entry.
pub const MIN_POSTINGS: usize = 2;

/// Validates posting count and the zero-sum rule across all postings.
///
/// The sum is taken in `i128`, so no combination of `i64` amounts can wrap
/// around to a false zero.
pub fn validate_postings(postings: &[NewPosting]) -> LedgerResult<()> {
    if postings.len() < MIN_POSTINGS {
        return Err(LedgerError::EmptyPostings(postings.len()));
    }

    let sum: i128 = postings.iter().map(|p| i128::from(p.amount)).sum();
    if sum != 0 {
        return Err(LedgerError::PostingsNotBalanced {
            sum,
            currency: None,
        });
    }

    Ok(())
}

/// Validates that postings net to zero within every currency.
///
/// Takes `(currency, amount)` pairs after currencies have been resolved.
pub fn validate_currency_balance<'a, I>(legs: I) -> LedgerResult<()>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut sums: BTreeMap<&str, i128> = BTreeMap::new();
    for (currency, amount) in legs {
        *sums.entry(currency).or_default() += i128::from(amount);
    }

    match sums.into_iter().find(|(_, sum)| *sum != 0) {
        Some((currency, sum)) => Err(LedgerError::PostingsNotBalanced {
            sum,
            currency: Some(currency.to_string()),
        }),
        None => Ok(()),
    }
}
