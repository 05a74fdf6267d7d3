//! Fixed-point decimal asset amounts.
//!
//! An amount is an unsigned integer mantissa plus a precision (number of
//! fractional digits). Arithmetic is checked: a negative intermediate or a
//! mantissa overflow fails the operation, which in turn fails the enclosing
//! command.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from amount parsing and arithmetic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Cannot parse `{0}` as a decimal amount")]
    Parse(String),

    #[error("Mantissa overflow")]
    Overflow,

    #[error("Result would be negative")]
    Negative,
}

/// Fixed-point decimal: `value / 10^precision`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    value: u128,
    precision: u8,
}

impl Amount {
    /// Zero with the given precision.
    pub fn zero(precision: u8) -> Self {
        Amount {
            value: 0,
            precision,
        }
    }

    /// Build from a raw mantissa and precision.
    pub fn from_mantissa(value: u128, precision: u8) -> Self {
        Amount { value, precision }
    }

    /// Parse a decimal string such as `100`, `100.00` or `0.001`.
    pub fn parse(s: &str) -> Result<Self, AmountError> {
        let err = || AmountError::Parse(s.to_owned());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(err());
        }
        let precision = u8::try_from(frac_part.len()).map_err(|_| err())?;
        let digits = format!("{int_part}{frac_part}");
        let value = if digits.is_empty() {
            return Err(err());
        } else {
            digits.parse::<u128>().map_err(|_| err())?
        };
        Ok(Amount { value, precision })
    }

    pub fn mantissa(&self) -> u128 {
        self.value
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Rescale to a higher precision. Returns `None` on overflow or when
    /// `precision` is lower than the current one.
    fn scaled_to(&self, precision: u8) -> Option<u128> {
        if precision < self.precision {
            return None;
        }
        let factor = 10u128.checked_pow(u32::from(precision - self.precision))?;
        self.value.checked_mul(factor)
    }

    /// Checked addition; the result carries the larger precision.
    pub fn checked_add(&self, other: &Amount) -> Result<Amount, AmountError> {
        let precision = self.precision.max(other.precision);
        let a = self.scaled_to(precision).ok_or(AmountError::Overflow)?;
        let b = other.scaled_to(precision).ok_or(AmountError::Overflow)?;
        let value = a.checked_add(b).ok_or(AmountError::Overflow)?;
        Ok(Amount { value, precision })
    }

    /// Checked subtraction; fails when the result would be negative.
    pub fn checked_sub(&self, other: &Amount) -> Result<Amount, AmountError> {
        let precision = self.precision.max(other.precision);
        let a = self.scaled_to(precision).ok_or(AmountError::Overflow)?;
        let b = other.scaled_to(precision).ok_or(AmountError::Overflow)?;
        let value = a.checked_sub(b).ok_or(AmountError::Negative)?;
        Ok(Amount { value, precision })
    }

    /// Storage representation, identical to the display form.
    pub fn to_storage_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.precision == 0 {
            return write!(f, "{}", self.value);
        }
        let divisor = 10u128.pow(u32::from(self.precision));
        let int_part = self.value / divisor;
        let frac_part = self.value % divisor;
        write!(
            f,
            "{}.{:0width$}",
            int_part,
            frac_part,
            width = usize::from(self.precision)
        )
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let a = Amount::parse("100.00").unwrap();
        assert_eq!(a.mantissa(), 10_000);
        assert_eq!(a.precision(), 2);
        assert_eq!(a.to_string(), "100.00");

        let b = Amount::parse("0.001").unwrap();
        assert_eq!(b.mantissa(), 1);
        assert_eq!(b.precision(), 3);

        assert_eq!(Amount::parse("7").unwrap().to_string(), "7");
        assert!(Amount::parse("").is_err());
        assert!(Amount::parse("1.2.3").is_err());
        assert!(Amount::parse("-1").is_err());
    }

    #[test]
    fn add_scales_precision() {
        let a = Amount::parse("1.2").unwrap();
        let b = Amount::parse("0.34").unwrap();
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.to_string(), "1.54");
        assert_eq!(sum.precision(), 2);
    }

    #[test]
    fn sub_refuses_negative() {
        let a = Amount::parse("1.00").unwrap();
        let b = Amount::parse("2.00").unwrap();
        assert_eq!(a.checked_sub(&b), Err(AmountError::Negative));
        assert_eq!(b.checked_sub(&a).unwrap().to_string(), "1.00");
    }

    #[test]
    fn add_detects_overflow() {
        let a = Amount::from_mantissa(u128::MAX, 0);
        let b = Amount::from_mantissa(1, 0);
        assert_eq!(a.checked_add(&b), Err(AmountError::Overflow));
    }

    #[test]
    fn storage_round_trip() {
        let a = Amount::parse("42.4242").unwrap();
        let parsed = Amount::parse(&a.to_storage_string()).unwrap();
        assert_eq!(a, parsed);
    }
}
