//! Where candidate credits come from.

use crate::amount::Amount;
use crate::error::{DetectionError, Result};
use crate::transaction::{Transaction, TransactionRecord};
use csv::{ReaderBuilder, Trim};
use log::debug;
use std::io::Read;

/// Supplies the eligible credits of every customer for one detection run.
pub trait TransactionSource {
    /// Returns all credit transactions with an amount of at least `min_amount`.
    ///
    /// Failures to read or interpret the underlying data are returned, never
    /// swallowed.
    fn fetch_eligible_credits(&mut self, min_amount: Amount) -> Result<Vec<Transaction>>;
}

/// Reads transactions from CSV with the header
/// `id,customer_id,counterparty_name,amount,direction,description,timestamp`.
///
/// The reader is consumed by the first fetch; later fetches return nothing.
pub struct CsvSource<R: Read> {
    reader: Option<R>,
}

impl<R: Read> CsvSource<R> {
    pub fn new(reader: R) -> Self {
        CsvSource {
            reader: Some(reader),
        }
    }
}

impl<R: Read> TransactionSource for CsvSource<R> {
    fn fetch_eligible_credits(&mut self, min_amount: Amount) -> Result<Vec<Transaction>> {
        let reader = match self.reader.take() {
            Some(reader) => reader,
            None => return Ok(Vec::new()),
        };

        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut eligible = Vec::new();
        for (row_idx, result) in csv_reader.deserialize::<TransactionRecord>().enumerate() {
            let row = row_idx + 2; // 1-indexed, accounting for header row

            let record = result?;
            let tx = record
                .parse()
                .map_err(|message| DetectionError::InvalidRecord { row, message })?;

            if tx.is_eligible(min_amount) {
                eligible.push(tx);
            } else {
                debug!(
                    "Row {}: Skipping {} {} of {}",
                    row, tx.direction, tx.id, tx.amount
                );
            }
        }

        Ok(eligible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn fetch(csv: &str) -> Result<Vec<Transaction>> {
        CsvSource::new(Cursor::new(csv.to_string())).fetch_eligible_credits(Amount::from(70000))
    }

    #[test]
    fn test_reads_eligible_credits() {
        let csv = r#"id,customer_id,counterparty_name,amount,direction,description,timestamp
t1,1,ACME CORP,75000,credit,SALARY JAN,2024-01-01
t2,1,ACME CORP,75000,debit,REVERSAL,2024-01-02
t3,1,COFFEE,4.50,credit,REFUND,2024-01-03
t4,2,,70000.00,CREDIT,,2024-01-04 10:00:00"#;

        let txs = fetch(csv).unwrap();
        let ids: Vec<&str> = txs.iter().map(|tx| tx.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t4"]);
        assert_eq!(txs[1].counterparty_name, None);
        assert_eq!(txs[1].description, "");
    }

    #[test]
    fn test_amount_just_below_minimum_is_not_rounded_up() {
        let csv = r#"id,customer_id,counterparty_name,amount,direction,description,timestamp
t1,1,ACME,69999.996,credit,SALARY,2024-01-01
t2,1,ACME,70000.001,credit,SALARY,2024-02-01"#;

        let txs = fetch(csv).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].id, "t2");
        assert_eq!(txs[0].amount.to_string(), "70000.00");
    }

    #[test]
    fn test_whitespace_handling() {
        let csv = "id, customer_id, counterparty_name, amount, direction, description, timestamp
t1, 1, ACME CORP, 75000, credit, SALARY, 2024-01-01";

        let txs = fetch(csv).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].counterparty_name.as_deref(), Some("ACME CORP"));
    }

    #[test]
    fn test_malformed_row_is_reported() {
        let csv = r#"id,customer_id,counterparty_name,amount,direction,description,timestamp
t1,1,ACME CORP,75000,credit,SALARY,2024-01-01
t2,1,ACME CORP,75000,sideways,SALARY,2024-02-01"#;

        match fetch(csv) {
            Err(DetectionError::InvalidRecord { row, message }) => {
                assert_eq!(row, 3);
                assert!(message.contains("sideways"));
            }
            other => panic!("Expected InvalidRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_customer_is_csv_error() {
        let csv = r#"id,customer_id,counterparty_name,amount,direction,description,timestamp
t1,abc,ACME CORP,75000,credit,SALARY,2024-01-01"#;

        assert!(matches!(fetch(csv), Err(DetectionError::Csv(_))));
    }

    #[test]
    fn test_second_fetch_is_empty() {
        let csv = r#"id,customer_id,counterparty_name,amount,direction,description,timestamp
t1,1,ACME CORP,75000,credit,SALARY,2024-01-01"#;

        let mut source = CsvSource::new(Cursor::new(csv));
        assert_eq!(source.fetch_eligible_credits(Amount::from(70000)).unwrap().len(), 1);
        assert!(source.fetch_eligible_credits(Amount::from(70000)).unwrap().is_empty());
    }
}
