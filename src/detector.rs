//! Recurring-credit (salary) detection.
//!
//! A customer's eligible credits are split by counterparty. Within each
//! counterparty the credits are walked in time order, tracking the current
//! streak of monthly, similarly sized payments. Streaks that reach the
//! configured length are kept; everything else is dropped.

use crate::amount::Amount;
use crate::config::DetectorConfig;
use crate::transaction::{CustomerId, Transaction};
use log::debug;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Partition key. Credits without a counterparty share the `Unknown` partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Counterparty<'a> {
    Unknown,
    Named(&'a str),
}

impl<'a> Counterparty<'a> {
    fn of(tx: &'a Transaction) -> Self {
        match tx.counterparty_name.as_deref() {
            Some(name) => Counterparty::Named(name),
            None => Counterparty::Unknown,
        }
    }
}

impl fmt::Display for Counterparty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counterparty::Unknown => f.write_str("<unknown>"),
            Counterparty::Named(name) => f.write_str(name),
        }
    }
}

/// Inclusive amount range around a partition's median.
#[derive(Debug, Clone, Copy)]
struct AmountBand {
    lower: Decimal,
    upper: Decimal,
}

impl AmountBand {
    fn around_median(partition: &[&Transaction], tolerance: Decimal) -> Option<Self> {
        let median = median(partition.iter().map(|tx| tx.amount.as_decimal()))?;
        let lower = Decimal::ONE
            .checked_sub(tolerance)
            .and_then(|factor| factor.checked_mul(median))
            .unwrap_or(Decimal::MIN);
        let upper = Decimal::ONE
            .checked_add(tolerance)
            .and_then(|factor| factor.checked_mul(median))
            .unwrap_or(Decimal::MAX);
        Some(AmountBand { lower, upper })
    }

    fn contains(&self, amount: Amount) -> bool {
        let value = amount.as_decimal();
        self.lower <= value && value <= self.upper
    }
}

/// Median of the values; the mean of the two middle values for even counts.
fn median(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    let mut sorted: Vec<Decimal> = values.collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        let two = Decimal::from(2);
        Some(sorted[mid - 1] / two + sorted[mid] / two)
    }
}

/// Calendar days between the dates of two transactions; the time of day is ignored.
fn day_gap(earlier: &Transaction, later: &Transaction) -> i64 {
    (later.timestamp.date() - earlier.timestamp.date()).num_days()
}

/// State of the walk over one partition.
///
/// `current` holds the streak being built; closing it either moves its members
/// into `accepted` or discards them.
struct StreakWalk<'a> {
    current: Vec<&'a Transaction>,
    accepted: Vec<&'a Transaction>,
    min_occurrences: usize,
}

impl<'a> StreakWalk<'a> {
    fn new(min_occurrences: usize) -> Self {
        StreakWalk {
            current: Vec::new(),
            accepted: Vec::new(),
            min_occurrences,
        }
    }

    fn push(&mut self, tx: &'a Transaction) {
        self.current.push(tx);
    }

    fn close(&mut self) {
        if self.current.len() >= self.min_occurrences {
            self.accepted.append(&mut self.current);
        } else {
            self.current.clear();
        }
    }

    fn finish(mut self) -> Vec<&'a Transaction> {
        self.close();
        self.accepted
    }
}

/// Finds salary-like recurring credits in a customer's history.
///
/// Detection is a pure function of its input and configuration: the same
/// transactions always yield the same result in the same order, and no input
/// causes an error. A customer without a qualifying streak simply gets an
/// empty result.
#[derive(Debug, Clone, Default)]
pub struct RecurrenceDetector {
    config: DetectorConfig,
}

impl RecurrenceDetector {
    pub fn new(config: DetectorConfig) -> Self {
        RecurrenceDetector { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Returns the credits of `customer_id` that belong to a qualifying streak.
    ///
    /// Transactions of other customers, debits and credits below the minimum
    /// amount are ignored. The result is in ascending timestamp order and holds
    /// each transaction id at most once.
    pub fn detect(
        &self,
        customer_id: CustomerId,
        transactions: &[Transaction],
    ) -> Vec<Transaction> {
        let min_amount = self.config.min_amount;
        let mut eligible: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| tx.customer_id == customer_id && tx.is_eligible(min_amount))
            .collect();
        if eligible.is_empty() {
            return Vec::new();
        }

        // Stable: equal timestamps keep input order
        eligible.sort_by_key(|tx| tx.timestamp);

        let mut partitions: BTreeMap<Counterparty<'_>, Vec<&Transaction>> = BTreeMap::new();
        for tx in eligible {
            partitions.entry(Counterparty::of(tx)).or_default().push(tx);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut detected: Vec<&Transaction> = Vec::new();

        for (counterparty, partition) in &partitions {
            if partition.len() < self.config.min_occurrences {
                debug!(
                    "Customer {}: {} credit(s) from {}, too few for a streak",
                    customer_id,
                    partition.len(),
                    counterparty
                );
                continue;
            }

            let members = self.streak_members(partition);
            debug!(
                "Customer {}: {} of {} credit(s) from {} in qualifying streaks",
                customer_id,
                members.len(),
                partition.len(),
                counterparty
            );

            for tx in members {
                if seen.insert(tx.id.as_str()) {
                    detected.push(tx);
                }
            }
        }

        detected.sort_by_key(|tx| tx.timestamp);
        detected.into_iter().cloned().collect()
    }

    /// Walks one time-ordered partition and returns the members of every
    /// streak long enough to count.
    fn streak_members<'a>(&self, partition: &[&'a Transaction]) -> Vec<&'a Transaction> {
        let band = match AmountBand::around_median(partition, self.config.amount_tolerance) {
            Some(band) => band,
            None => return Vec::new(),
        };

        let mut walk = StreakWalk::new(self.config.min_occurrences);
        let mut previous: Option<&Transaction> = None;

        for &tx in partition {
            if let Some(prev) = previous {
                if !self.links(prev, tx, &band) {
                    walk.close();
                }
            }
            walk.push(tx);
            previous = Some(tx);
        }

        walk.finish()
    }

    /// Whether `next` continues a streak ending at `prev`.
    fn links(&self, prev: &Transaction, next: &Transaction, band: &AmountBand) -> bool {
        self.config.gap_in_window(day_gap(prev, next))
            && band.contains(prev.amount)
            && band.contains(next.amount)
    }
}
