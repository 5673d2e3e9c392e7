//! Typed cell values.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One cell of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Char(char),
    Varchar(String),
    String(String),
    Binary(Vec<u8>),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer value widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::TinyInt(v) => Some(i64::from(*v)),
            ColumnValue::SmallInt(v) => Some(i64::from(*v)),
            ColumnValue::Int(v) => Some(i64::from(*v)),
            ColumnValue::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Float(v) => Some(f64::from(*v)),
            ColumnValue::Double(v) => Some(*v),
            ColumnValue::Decimal(d) => Some(d.to_f64()),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Text of string-like values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::String(s) | ColumnValue::Varchar(s) => Some(s),
            _ => None,
        }
    }

    /// Build a timestamp from epoch milliseconds.
    pub fn timestamp_from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(|dt| ColumnValue::Timestamp(dt.naive_utc()))
    }

    /// Build a date from epoch milliseconds.
    pub fn date_from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(|dt| ColumnValue::Date(dt.date_naive()))
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Null => f.write_str("NULL"),
            ColumnValue::Boolean(v) => write!(f, "{}", v),
            ColumnValue::TinyInt(v) => write!(f, "{}", v),
            ColumnValue::SmallInt(v) => write!(f, "{}", v),
            ColumnValue::Int(v) => write!(f, "{}", v),
            ColumnValue::BigInt(v) => write!(f, "{}", v),
            ColumnValue::Float(v) => write!(f, "{}", v),
            ColumnValue::Double(v) => write!(f, "{}", v),
            ColumnValue::Decimal(v) => write!(f, "{}", v),
            ColumnValue::Char(v) => write!(f, "{}", v),
            ColumnValue::Varchar(v) | ColumnValue::String(v) => f.write_str(v),
            ColumnValue::Binary(v) => write!(f, "<{} bytes>", v.len()),
            ColumnValue::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.3f")),
            ColumnValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

/// Exact decimal number: `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: i128,
    scale: u32,
}

/// Decimal text could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid decimal literal")]
pub struct ParseDecimalError;

/// Largest power of ten representable in `i128`.
const MAX_POW10: u32 = 38;

fn pow10(exp: u32) -> Option<i128> {
    10i128.checked_pow(exp)
}

impl Decimal {
    pub fn new(unscaled: i128, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// The same value at `scale`, rounding half away from zero.
    ///
    /// Returns `None` if the result does not fit.
    pub fn rescale(&self, scale: u32) -> Option<Decimal> {
        if scale >= self.scale {
            let factor = pow10(scale - self.scale)?;
            let unscaled = self.unscaled.checked_mul(factor)?;
            return Some(Decimal { unscaled, scale });
        }
        let diff = self.scale - scale;
        if diff > MAX_POW10 {
            return Some(Decimal { unscaled: 0, scale });
        }
        let divisor = pow10(diff)?;
        let quotient = self.unscaled / divisor;
        let remainder = (self.unscaled % divisor).unsigned_abs();
        // remainder * 2 can exceed i128 at 38 digits
        let rounded = if remainder >= divisor.unsigned_abs() - remainder {
            quotient + self.unscaled.signum()
        } else {
            quotient
        };
        Some(Decimal {
            unscaled: rounded,
            scale,
        })
    }

    pub fn to_f64(&self) -> f64 {
        self.unscaled as f64 / 10f64.powi(self.scale as i32)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Parse `[+-]digits[.digits][(e|E)[+-]digits]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (mantissa, exponent) = match s.find(['e', 'E']) {
            Some(index) => {
                let exponent: i32 = s[index + 1..].parse().map_err(|_| ParseDecimalError)?;
                (&s[..index], exponent)
            }
            None => (s, 0),
        };

        let (negative, digits) = match mantissa.as_bytes().first() {
            Some(b'-') => (true, &mantissa[1..]),
            Some(b'+') => (false, &mantissa[1..]),
            _ => (false, mantissa),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseDecimalError);
        }

        let mut unscaled: i128 = 0;
        for byte in int_part.bytes().chain(frac_part.bytes()) {
            if !byte.is_ascii_digit() {
                return Err(ParseDecimalError);
            }
            unscaled = unscaled
                .checked_mul(10)
                .and_then(|v| v.checked_add(i128::from(byte - b'0')))
                .ok_or(ParseDecimalError)?;
        }
        if negative {
            unscaled = -unscaled;
        }

        let scale = frac_part.len() as i64 - i64::from(exponent);
        if scale >= 0 {
            let scale = u32::try_from(scale).map_err(|_| ParseDecimalError)?;
            Ok(Decimal { unscaled, scale })
        } else {
            let factor = u32::try_from(-scale)
                .ok()
                .and_then(pow10)
                .ok_or(ParseDecimalError)?;
            let unscaled = unscaled.checked_mul(factor).ok_or(ParseDecimalError)?;
            Ok(Decimal { unscaled, scale: 0 })
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.unscaled.unsigned_abs().to_string();
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{}{}.{}", sign, int_part, frac_part)
        } else {
            write!(f, "{}0.{:0>width$}", sign, digits, width = scale)
        }
    }
}
