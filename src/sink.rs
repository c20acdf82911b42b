//! Where detected salary credits go.

use crate::amount::Amount;
use crate::error::{DetectionError, Result};
use crate::transaction::{CustomerId, Transaction};
use serde::Serialize;
use std::io::Write;

/// Output layout for timestamps written by file sinks.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stores detected transactions.
pub trait PersistenceSink {
    /// Stores `transactions`, overwriting earlier results with the same id.
    ///
    /// An empty slice stores nothing; a stream sink may still write its
    /// header. A failed write is returned as an error and must never be
    /// reported as success.
    fn save(&mut self, transactions: &[Transaction]) -> Result<()>;
}

/// One output row of [`CsvSink`].
#[derive(Debug, Serialize)]
struct SalaryRow<'a> {
    customer_id: CustomerId,
    transaction_id: &'a str,
    counterparty_name: Option<&'a str>,
    amount: Amount,
    description: &'a str,
    timestamp: String,
}

impl<'a> From<&'a Transaction> for SalaryRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        SalaryRow {
            customer_id: tx.customer_id,
            transaction_id: &tx.id,
            counterparty_name: tx.counterparty_name.as_deref(),
            amount: tx.amount,
            description: &tx.description,
            timestamp: tx.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Writes detected transactions as CSV.
///
/// The header is always written, so an empty result is still a readable
/// document. Amounts carry exactly 2 decimal places.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        CsvSink {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
            header_written: false,
        }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| DetectionError::Io(e.into_error()))
    }

    fn write_header(&mut self) -> Result<()> {
        if !self.header_written {
            self.writer.write_record([
                "customer_id",
                "transaction_id",
                "counterparty_name",
                "amount",
                "description",
                "timestamp",
            ])?;
            self.header_written = true;
        }
        Ok(())
    }
}

impl<W: Write> PersistenceSink for CsvSink<W> {
    /// Unlike the SQLite sink, an empty batch is not a no-op: the header is
    /// still written so the output is a valid CSV file.
    fn save(&mut self, transactions: &[Transaction]) -> Result<()> {
        self.write_header()?;
        for tx in transactions {
            self.writer.serialize(SalaryRow::from(tx))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
