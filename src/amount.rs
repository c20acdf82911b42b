//! Monetary amount, displayed with 2 decimal places.
//!
//! Wraps `rust_decimal` so that amount comparisons and the tolerance band
//! around a median are exact, with no floating-point drift at the bounds.
//! The parsed value is kept as given; rounding happens only on output.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A transaction amount.
///
/// Comparisons use the exact value; `Display` and `Serialize` round to
/// 2 decimal places.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use salary_detector::Amount;
///
/// let amount = Amount::from_str("75000.5").unwrap();
/// assert_eq!(amount.to_string(), "75000.50");
///
/// let just_under = Amount::from_str("69999.996").unwrap();
/// assert!(just_under < Amount::from(70000));
/// assert_eq!(just_under.to_string(), "70000.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// The number of decimal places shown.
    pub const SCALE: u32 = 2;

    pub fn new(value: Decimal) -> Self {
        Amount(value)
    }

    /// Returns the underlying decimal value, unrounded.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// The value rounded half away from zero and padded to 2 decimal places.
    fn rounded(&self) -> Decimal {
        let mut value = self
            .0
            .round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(Self::SCALE);
        value
    }

    /// Exact text for storage, padded to at least 2 decimal places.
    fn storage_text(&self) -> String {
        let mut value = self.0;
        if value.scale() < Self::SCALE {
            value.rescale(Self::SCALE);
        }
        value.to_string()
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
        write!(f, "{}", self.rounded())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Amounts are stored as exact decimal text so SQLite never rounds them
/// through a double, and a value read back filters the same way it did
/// before it was stored.
impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.storage_text()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(bytes) => {
                let text =
                    std::str::from_utf8(bytes).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                Amount::from_str(text).map_err(|e| FromSqlError::Other(Box::new(e)))
            }
            ValueRef::Integer(i) => Ok(Amount::from(i)),
            ValueRef::Real(f) => Decimal::from_f64(f)
                .map(Amount::new)
                .ok_or(FromSqlError::InvalidType),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}
