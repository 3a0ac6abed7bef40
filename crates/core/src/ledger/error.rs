//! Ledger error types for validation and state errors.
//!
//! Every failure a ledger operation can report lives in [`LedgerError`].
//! Callers branch on [`LedgerError::kind`] rather than on messages; in
//! particular an idempotent replay surfaces as [`ErrorKind::DuplicateEntry`]
//! and carries the originally committed entry.

use thiserror::Error;

use tally_shared::types::{AccountId, HoldId};

use super::types::{Entry, HoldStatus};

/// Result type alias using `LedgerError`.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// The kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A ledger account.
    Account,
    /// A journal entry.
    Entry,
    /// An authorization hold.
    Hold,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Account => write!(f, "Account"),
            Self::Entry => write!(f, "Entry"),
            Self::Hold => write!(f, "Hold"),
        }
    }
}

/// Discriminant of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Direct lookup of an account, entry or hold failed.
    NotFound,
    /// Account name already taken within the tenant.
    AlreadyExists,
    /// Non-positive amount where a positive one is required.
    InvalidAmount,
    /// Fewer than two postings.
    EmptyPostings,
    /// Postings do not sum to zero.
    PostingsNotBalanced,
    /// A posting or hold references an unknown account.
    AccountNotFound,
    /// Idempotent replay of an already committed entry.
    DuplicateEntry,
    /// Transition attempted on a resolved hold.
    HoldNotPending,
    /// Capture amount above the original reservation.
    CaptureExceedsHold,
    /// Spend above the available balance.
    InsufficientBalance,
    /// Applying the amounts would overflow a balance.
    BalanceOverflow,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Lookup Errors ==========
    /// Record not found by direct lookup.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// What was looked up.
        resource: Resource,
        /// The identifier or name that was looked up.
        id: String,
    },

    /// Account name already taken within the tenant.
    #[error("Account {name:?} already exists for tenant {tenant_id}")]
    AlreadyExists {
        /// The tenant.
        tenant_id: String,
        /// The duplicated account name.
        name: String,
    },

    /// A posting or hold references an account that does not exist in the tenant.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    // ========== Validation Errors ==========
    /// Amount outside the allowed range (non-positive, or fees above the amount).
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Entry must have at least two postings.
    #[error("Entry must have at least two postings, got {0}")]
    EmptyPostings(usize),

    /// Postings do not sum to zero.
    #[error("Postings do not sum to zero: sum={sum}{}", .currency.as_ref().map(|c| format!(" ({c})")).unwrap_or_default())]
    PostingsNotBalanced {
        /// The non-zero signed sum.
        sum: i128,
        /// The currency whose postings are out of balance, when known.
        currency: Option<String>,
    },

    /// Applying the amounts would overflow a balance.
    #[error("Balance overflow for account {account_id} in {currency}")]
    BalanceOverflow {
        /// The account whose balance would overflow.
        account_id: AccountId,
        /// The balance currency.
        currency: String,
    },

    // ========== Idempotency ==========
    /// The idempotency key was already used; carries the original entry.
    #[error("Duplicate idempotency key: {}", .0.idempotency_key)]
    DuplicateEntry(Box<Entry>),

    // ========== Hold Errors ==========
    /// Hold is not in pending status.
    #[error("Hold {hold_id} is not pending (status: {status})")]
    HoldNotPending {
        /// The hold.
        hold_id: HoldId,
        /// Its current (effective) status.
        status: HoldStatus,
    },

    /// Capture amount exceeds the reserved amount.
    #[error("Capture amount {requested} exceeds hold amount {held}")]
    CaptureExceedsHold {
        /// Requested capture amount.
        requested: i64,
        /// Reserved amount on the hold.
        held: i64,
    },

    /// Capture needs the tenant's platform cash account.
    #[error("Cannot capture hold without platform:cash account: {0}")]
    CaptureRequiresCashAccount(#[source] Box<LedgerError>),

    // ========== Balance Errors ==========
    /// Not enough available balance for the requested spend.
    #[error("Insufficient available balance on account {account_id}: available {available}, requested {requested}")]
    InsufficientBalance {
        /// The account.
        account_id: AccountId,
        /// Available balance at the time of the check.
        available: i64,
        /// Requested amount.
        requested: i64,
    },
}

impl LedgerError {
    /// Shorthand for a [`LedgerError::NotFound`].
    pub(crate) fn not_found(resource: Resource, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Returns the discriminant of this error.
    ///
    /// A wrapped capture failure reports the kind of its cause.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::AccountNotFound(_) => ErrorKind::AccountNotFound,
            Self::InvalidAmount(_) => ErrorKind::InvalidAmount,
            Self::EmptyPostings(_) => ErrorKind::EmptyPostings,
            Self::PostingsNotBalanced { .. } => ErrorKind::PostingsNotBalanced,
            Self::BalanceOverflow { .. } => ErrorKind::BalanceOverflow,
            Self::DuplicateEntry(_) => ErrorKind::DuplicateEntry,
            Self::HoldNotPending { .. } => ErrorKind::HoldNotPending,
            Self::CaptureExceedsHold { .. } => ErrorKind::CaptureExceedsHold,
            Self::CaptureRequiresCashAccount(source) => source.kind(),
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
        }
    }

    /// Returns true for an idempotent replay.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateEntry(_))
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::EmptyPostings(_) => "EMPTY_POSTINGS",
            Self::PostingsNotBalanced { .. } => "POSTINGS_NOT_BALANCED",
            Self::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            Self::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            Self::HoldNotPending { .. } => "HOLD_NOT_PENDING",
            Self::CaptureExceedsHold { .. } => "CAPTURE_EXCEEDS_HOLD",
            Self::CaptureRequiresCashAccount(_) => "CAPTURE_REQUIRES_CASH_ACCOUNT",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_)
            | Self::EmptyPostings(_)
            | Self::PostingsNotBalanced { .. }
            | Self::BalanceOverflow { .. }
            | Self::CaptureExceedsHold { .. } => 400,

            // 404 Not Found
            Self::NotFound { .. } | Self::AccountNotFound(_) => 404,

            // 409 Conflict - state errors
            Self::AlreadyExists { .. } | Self::DuplicateEntry(_) | Self::HoldNotPending { .. } => {
                409
            }

            // 422 Unprocessable - business rule violations
            Self::CaptureRequiresCashAccount(_) | Self::InsufficientBalance { .. } => 422,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::EmptyPostings(1).error_code(), "EMPTY_POSTINGS");
        assert_eq!(
            LedgerError::PostingsNotBalanced {
                sum: 100,
                currency: None,
            }
            .error_code(),
            "POSTINGS_NOT_BALANCED"
        );
        assert_eq!(LedgerError::InvalidAmount(0).error_code(), "INVALID_AMOUNT");
        assert_eq!(
            LedgerError::AccountNotFound(AccountId::new()).error_code(),
            "ACCOUNT_NOT_FOUND"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::EmptyPostings(0).http_status_code(), 400);
        assert_eq!(
            LedgerError::not_found(Resource::Hold, HoldId::new()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::HoldNotPending {
                hold_id: HoldId::new(),
                status: HoldStatus::Voided,
            }
            .http_status_code(),
            409
        );
        assert_eq!(
            LedgerError::InsufficientBalance {
                account_id: AccountId::new(),
                available: 10,
                requested: 20,
            }
            .http_status_code(),
            422
        );
    }

    #[test]
    fn test_wrapped_capture_error_reports_cause_kind() {
        let cause = LedgerError::not_found(Resource::Account, "platform:cash");
        let err = LedgerError::CaptureRequiresCashAccount(Box::new(cause));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.error_code(), "CAPTURE_REQUIRES_CASH_ACCOUNT");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::PostingsNotBalanced {
            sum: 500,
            currency: None,
        };
        assert_eq!(err.to_string(), "Postings do not sum to zero: sum=500");

        let err = LedgerError::PostingsNotBalanced {
            sum: -3,
            currency: Some("eur".to_string()),
        };
        assert_eq!(err.to_string(), "Postings do not sum to zero: sum=-3 (eur)");

        let err = LedgerError::not_found(Resource::Account, "platform:cash");
        assert_eq!(err.to_string(), "Account not found: platform:cash");

        let err = LedgerError::CaptureExceedsHold {
            requested: 5000,
            held: 3000,
        };
        assert_eq!(
            err.to_string(),
            "Capture amount 5000 exceeds hold amount 3000"
        );
    }
}
