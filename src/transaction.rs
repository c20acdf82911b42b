//! Transaction models for CSV parsing and internal representation.

use crate::amount::Amount;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Customer identifier as stored upstream.
pub type CustomerId = u64;

/// Accepted naive timestamp layouts, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Raw transaction record as read from CSV.
///
/// Fields that need validation are kept as strings and checked in
/// [`TransactionRecord::parse`] so the caller can report the offending row.
#[derive(Debug, Deserialize)]
pub struct TransactionRecord {
    /// Upstream transaction identifier
    pub id: String,

    pub customer_id: CustomerId,

    /// Payer name; empty means unknown
    pub counterparty_name: Option<String>,

    pub amount: String,

    /// `credit` or `debit`, case-insensitive
    pub direction: String,

    #[serde(default)]
    pub description: Option<String>,

    pub timestamp: String,
}

impl TransactionRecord {
    /// Parses the raw CSV record into a typed transaction.
    ///
    /// Returns a description of the first problem found if the record is unusable.
    pub fn parse(&self) -> Result<Transaction, String> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err("empty transaction id".to_string());
        }

        let amount = Amount::from_str(&self.amount)
            .map_err(|e| format!("invalid amount '{}': {}", self.amount, e))?;
        let direction = Direction::from_str(&self.direction).map_err(|e| e.to_string())?;
        let timestamp = parse_timestamp(&self.timestamp)
            .ok_or_else(|| format!("invalid timestamp '{}'", self.timestamp))?;

        let counterparty_name = self
            .counterparty_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Ok(Transaction {
            id: id.to_string(),
            customer_id: self.customer_id,
            counterparty_name,
            amount,
            direction,
            description: self.description.clone().unwrap_or_default(),
            timestamp,
        })
    }
}

/// Parses a timestamp at the precision the detector cares about.
///
/// RFC 3339 input keeps its local wall-clock time; the offset is dropped so the
/// calendar date matches what the upstream system recorded.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Money flow direction relative to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Incoming funds. Only credits can be salary.
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Credit => "credit",
            Direction::Debit => "debit",
        }
    }
}

/// An unrecognised direction label.
#[derive(Debug, Error)]
#[error("unknown direction '{0}'")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" => Ok(Direction::Credit),
            "debit" => Ok(Direction::Debit),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Direction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Direction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Direction::from_str(text).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// An immutable transaction snapshot as fetched from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Stable, globally unique identifier
    pub id: String,

    pub customer_id: CustomerId,

    /// Payer; `None` when upstream had no counterparty
    pub counterparty_name: Option<String>,

    pub amount: Amount,

    pub direction: Direction,

    /// Free text, never inspected by the detector
    pub description: String,

    /// Booking time; only the calendar date matters for detection
    pub timestamp: NaiveDateTime,
}

impl Transaction {
    /// Returns `true` for credits of at least `min_amount`.
    pub fn is_eligible(&self, min_amount: Amount) -> bool {
        self.direction == Direction::Credit && self.amount >= min_amount
    }
}
