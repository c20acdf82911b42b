//! Detector tuning knobs.

use crate::amount::Amount;
use crate::error::{DetectionError, Result};
use rust_decimal::Decimal;

/// Parameters of the recurring-credit heuristic.
///
/// The defaults describe a monthly payroll deposit of at least 70 000:
/// consecutive credits 25 to 35 days apart whose amounts stay within 10% of
/// the counterparty's median, repeated at least 3 times.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Credits below this amount are never considered.
    pub min_amount: Amount,

    /// Shortest accepted gap between consecutive credits, in days (inclusive).
    pub min_days: i64,

    /// Longest accepted gap between consecutive credits, in days (inclusive).
    pub max_days: i64,

    /// Allowed fractional deviation from the partition median.
    pub amount_tolerance: Decimal,

    /// Shortest streak that counts as recurring.
    pub min_occurrences: usize,
}

impl DetectorConfig {
    /// Checks that the settings describe a satisfiable streak.
    pub fn validate(&self) -> Result<()> {
        if self.min_days < 0 {
            return Err(DetectionError::InvalidConfig(format!(
                "minimum day gap must not be negative, got {}",
                self.min_days
            )));
        }
        if self.min_days > self.max_days {
            return Err(DetectionError::InvalidConfig(format!(
                "day window [{}, {}] is empty",
                self.min_days, self.max_days
            )));
        }
        if self.amount_tolerance.is_sign_negative() {
            return Err(DetectionError::InvalidConfig(format!(
                "amount tolerance must not be negative, got {}",
                self.amount_tolerance
            )));
        }
        if self.min_occurrences == 0 {
            return Err(DetectionError::InvalidConfig(
                "minimum occurrences must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns `true` if `days` lies inside the inclusive day window.
    pub fn gap_in_window(&self, days: i64) -> bool {
        (self.min_days..=self.max_days).contains(&days)
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            min_amount: Amount::from(70_000),
            min_days: 25,
            max_days: 35,
            amount_tolerance: Decimal::new(10, 2),
            min_occurrences: 3,
        }
    }
}
