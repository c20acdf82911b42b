//! Batch detection across all customers.
//!
//! One read from the source, per-customer detection fanned out over the rayon
//! pool, then one write of the combined result to the sink.

use crate::detector::RecurrenceDetector;
use crate::error::Result;
use crate::sink::PersistenceSink;
use crate::source::TransactionSource;
use crate::transaction::{CustomerId, Transaction};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Customers with at least one eligible credit.
    pub customers: usize,

    /// Customers with at least one detected salary credit.
    pub customers_matched: usize,

    /// Transactions handed to the sink.
    pub transactions_saved: usize,
}

/// Wires a transaction source, the detector and a persistence sink together.
pub struct DetectionPipeline<S, K> {
    source: S,
    sink: K,
    detector: RecurrenceDetector,
}

impl<S: TransactionSource, K: PersistenceSink> DetectionPipeline<S, K> {
    pub fn new(source: S, sink: K, detector: RecurrenceDetector) -> Self {
        DetectionPipeline {
            source,
            sink,
            detector,
        }
    }

    /// Fetches every eligible credit, detects salary per customer and saves
    /// the combined result in a single call.
    ///
    /// Source and sink failures are returned unchanged; nothing is written if
    /// the fetch fails.
    pub fn run(&mut self) -> Result<RunSummary> {
        let batch = self
            .source
            .fetch_eligible_credits(self.detector.config().min_amount)?;
        debug!("Fetched {} eligible credit(s)", batch.len());

        let (aggregate, summary) = detect_all(&self.detector, batch);
        self.sink.save(&aggregate)?;

        info!(
            "Detected {} salary transaction(s) for {} of {} customer(s)",
            summary.transactions_saved, summary.customers_matched, summary.customers
        );
        Ok(summary)
    }

    /// Gives back the sink, e.g. to read what was written.
    pub fn into_sink(self) -> K {
        self.sink
    }
}

/// Runs the detector for every customer in `batch`.
///
/// The aggregate lists customers in ascending id order, each customer's
/// credits chronologically, and never repeats a transaction id.
pub fn detect_all(
    detector: &RecurrenceDetector,
    batch: Vec<Transaction>,
) -> (Vec<Transaction>, RunSummary) {
    let mut by_customer: BTreeMap<CustomerId, Vec<Transaction>> = BTreeMap::new();
    for tx in batch {
        by_customer.entry(tx.customer_id).or_default().push(tx);
    }

    let per_customer: Vec<(CustomerId, Vec<Transaction>)> = by_customer
        .par_iter()
        .map(|(&customer_id, transactions)| {
            (customer_id, detector.detect(customer_id, transactions))
        })
        .collect();

    let mut summary = RunSummary {
        customers: per_customer.len(),
        ..RunSummary::default()
    };
    let mut seen: HashSet<String> = HashSet::new();
    let mut aggregate = Vec::new();

    for (customer_id, detected) in per_customer {
        if detected.is_empty() {
            debug!("No salary transactions detected for customer {}", customer_id);
            continue;
        }

        info!(
            "Customer {}: {} salary transaction(s) detected",
            customer_id,
            detected.len()
        );
        summary.customers_matched += 1;

        for tx in detected {
            if seen.insert(tx.id.clone()) {
                aggregate.push(tx);
            } else {
                warn!(
                    "Transaction id {} already detected for another customer; dropping the copy for customer {}",
                    tx.id, customer_id
                );
            }
        }
    }

    summary.transactions_saved = aggregate.len();
    (aggregate, summary)
}
