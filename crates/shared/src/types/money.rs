//! Money type over integer minor units.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Ledger amounts are `i64` minor units (e.g. cents); `rust_decimal::Decimal`
//! is only used to render them in major units.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Represents a monetary amount in minor units with its currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in the smallest currency unit (e.g., cents).
    pub minor: i64,
    /// Lowercase currency code (e.g., "usd").
    pub currency: String,
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub fn new(minor: i64, currency: &str) -> Self {
        Self {
            minor,
            currency: currency.trim().to_lowercase(),
        }
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub fn zero(currency: &str) -> Self {
        Self::new(0, currency)
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.minor == 0
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.minor < 0
    }

    /// Number of decimal places between the minor and major unit.
    #[must_use]
    pub fn exponent(&self) -> u32 {
        match self.currency.as_str() {
            "jpy" | "krw" | "vnd" | "clp" | "isk" => 0,
            "bhd" | "jod" | "kwd" | "omr" | "tnd" => 3,
            _ => 2,
        }
    }

    /// Returns the amount in major units.
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.minor, self.exponent())
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.to_decimal(), self.currency.to_uppercase())
    }
}

/// Normalizes a currency code, falling back when it is blank.
#[must_use]
pub fn normalize_currency(code: &str, fallback: &str) -> String {
    let code = code.trim();
    if code.is_empty() {
        fallback.trim().to_lowercase()
    } else {
        code.to_lowercase()
    }
}

#[cfg(test)]
#[path = "money_tests.rs"]
mod tests;
