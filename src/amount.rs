//! Exact monetary amounts.
//!
//! Amounts from both sources are carried as `rust_decimal` values so that
//! equality between a ledger amount and a processor amount never depends on
//! binary floating-point representation.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// A monetary amount with a canonical (normalized) decimal representation.
///
/// Trailing zeros are stripped on construction, so `100`, `100.0` and
/// `100.00` compare and hash equal.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use ledger_recon::Amount;
///
/// let a = Amount::from_str("100.00").unwrap();
/// let b = Amount::from_str("100").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "100");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Creates a new `Amount`, normalizing away trailing zeros.
    pub fn new(value: Decimal) -> Self {
        Amount(value.normalize())
    }

    /// Converts a binary float (e.g. a SQLite REAL) through its shortest
    /// round-trip decimal text. Returns `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Amount::from_str(&value.to_string()).ok()
    }

    /// Lossy conversion for spreadsheet output.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::new(Decimal::from(value))
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())?;
        Ok(Amount::new(decimal))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_trailing_zeros_are_not_significant() {
        let a = Amount::from_str("100.00").unwrap();
        let b = Amount::from_str("100").unwrap();
        let c = Amount::from_str("  100.0  ").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);

        let set: HashSet<Amount> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_from_f64_uses_shortest_decimal_text() {
        // 0.1 + 0.2 is 0.30000000000000004 in binary; the ledger would store
        // the already-rounded 0.3.
        let stored = Amount::from_f64(0.3).unwrap();
        assert_eq!(stored, Amount::from_str("0.30").unwrap());
        assert_eq!(Amount::from_f64(123.45).unwrap().to_string(), "123.45");
    }

    #[test]
    fn test_from_f64_rejects_non_finite() {
        assert!(Amount::from_f64(f64::NAN).is_none());
        assert!(Amount::from_f64(f64::INFINITY).is_none());
    }

    #[test]
    fn test_negative_and_integer_values() {
        assert_eq!(Amount::from(-5).to_string(), "-5");
        assert_eq!(Amount::from_str("-5.50").unwrap().to_string(), "-5.5");
        assert_eq!(Amount::from(0), Amount::from_str("0.000").unwrap());
    }

    #[test]
    fn test_rejects_non_numeric_text() {
        assert!(Amount::from_str("T00001").is_err());
        assert!(Amount::from_str("").is_err());
    }
}
