//! SQLite persistence layer.
//!
//! The `transactions` table is the upstream record of customer activity and
//! feeds detection; `customer_salary` receives the detected salary credits.
//! Only this module talks to the database.

use crate::amount::Amount;
use crate::error::Result;
use crate::sink::PersistenceSink;
use crate::source::TransactionSource;
use crate::transaction::{CustomerId, Direction, Transaction};
use log::debug;
use rusqlite::{params, Connection, OpenFlags, Row};

/// Upstream transaction table.
const TRANSACTIONS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id                TEXT PRIMARY KEY,
    customer_id       INTEGER NOT NULL,
    counterparty_name TEXT,
    amount            TEXT NOT NULL,
    direction         TEXT NOT NULL,
    description       TEXT NOT NULL DEFAULT '',
    timestamp         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transactions_direction
    ON transactions(direction, customer_id);
";

/// Detected salary credits, one row per transaction id.
///
/// `amount` is TEXT so decimal values are not coerced to REAL.
const SALARY_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS customer_salary (
    customer_id       INTEGER NOT NULL,
    transaction_id    TEXT PRIMARY KEY,
    counterparty_name TEXT,
    amount            TEXT NOT NULL,
    description       TEXT NOT NULL DEFAULT '',
    timestamp         TEXT NOT NULL,
    created_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
";

const UPSERT_TRANSACTION: &str = "
INSERT INTO transactions (
    id, customer_id, counterparty_name, amount, direction, description, timestamp
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT(id) DO UPDATE SET
    customer_id       = excluded.customer_id,
    counterparty_name = excluded.counterparty_name,
    amount            = excluded.amount,
    direction         = excluded.direction,
    description       = excluded.description,
    timestamp         = excluded.timestamp";

const UPSERT_SALARY: &str = "
INSERT INTO customer_salary (
    customer_id, transaction_id, counterparty_name, amount, description, timestamp
) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(transaction_id) DO UPDATE SET
    counterparty_name = excluded.counterparty_name,
    amount            = excluded.amount,
    description       = excluded.description,
    timestamp         = excluded.timestamp";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(SqliteStore { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    /// Create both tables if they do not exist yet.
    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(TRANSACTIONS_SCHEMA)?;
        self.conn.execute_batch(SALARY_SCHEMA)?;
        Ok(())
    }

    // ── Transactions ──────────────────────────────────────────────

    /// Upsert upstream transactions, replacing rows with the same id.
    pub fn insert_transactions(&mut self, transactions: &[Transaction]) -> Result<usize> {
        let db_tx = self.conn.transaction()?;
        {
            let mut stmt = db_tx.prepare_cached(UPSERT_TRANSACTION)?;
            for tx in transactions {
                stmt.execute(params![
                    tx.id,
                    sql_customer_id(tx.customer_id)?,
                    tx.counterparty_name,
                    tx.amount,
                    tx.direction,
                    tx.description,
                    tx.timestamp,
                ])?;
            }
        }
        db_tx.commit()?;
        Ok(transactions.len())
    }

    fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
        let raw_customer_id: i64 = row.get(1)?;
        let customer_id = CustomerId::try_from(raw_customer_id)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(1, raw_customer_id))?;
        Ok(Transaction {
            id: row.get(0)?,
            customer_id,
            counterparty_name: row.get(2)?,
            amount: row.get(3)?,
            direction: row.get(4)?,
            description: row.get(5)?,
            timestamp: row.get(6)?,
        })
    }

    // ── Salary ────────────────────────────────────────────────────

    /// All stored salary credits ordered by timestamp, then id.
    pub fn salary_transactions(&self) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT transaction_id, customer_id, counterparty_name, amount, 'credit',
                    description, timestamp
             FROM customer_salary
             ORDER BY timestamp ASC, transaction_id ASC",
        )?;
        let rows = stmt
            .query_map([], Self::row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// SQLite integers are signed; ids above `i64::MAX` are rejected.
fn sql_customer_id(customer_id: CustomerId) -> rusqlite::Result<i64> {
    i64::try_from(customer_id).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

impl TransactionSource for SqliteStore {
    /// Credits are selected in SQL; the amount threshold is applied on the
    /// decimal value after loading since amounts are stored as text.
    fn fetch_eligible_credits(&mut self, min_amount: Amount) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, customer_id, counterparty_name, amount, direction, description, timestamp
             FROM transactions
             WHERE lower(direction) = ?1
             ORDER BY timestamp ASC, id ASC",
        )?;
        let credits = stmt
            .query_map(params![Direction::Credit], Self::row_to_transaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let total = credits.len();
        let eligible: Vec<Transaction> = credits
            .into_iter()
            .filter(|tx| tx.is_eligible(min_amount))
            .collect();
        debug!(
            "Fetched {} credit(s), {} at or above {}",
            total,
            eligible.len(),
            min_amount
        );
        Ok(eligible)
    }
}

impl PersistenceSink for SqliteStore {
    /// Upserts the batch in a single SQL transaction, creating
    /// `customer_salary` first if needed. Nothing is touched for an empty batch.
    fn save(&mut self, transactions: &[Transaction]) -> Result<()> {
        if transactions.is_empty() {
            debug!("No salary transactions to save");
            return Ok(());
        }

        self.conn.execute_batch(SALARY_SCHEMA)?;

        let db_tx = self.conn.transaction()?;
        {
            let mut stmt = db_tx.prepare_cached(UPSERT_SALARY)?;
            for tx in transactions {
                stmt.execute(params![
                    sql_customer_id(tx.customer_id)?,
                    tx.id,
                    tx.counterparty_name,
                    tx.amount,
                    tx.description,
                    tx.timestamp,
                ])?;
            }
        }
        db_tx.commit()?;

        debug!("Saved {} salary transaction(s)", transactions.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectionError;
    use crate::transaction::parse_timestamp;
    use std::str::FromStr;

    fn tx(id: &str, amount: &str, direction: Direction, timestamp: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            customer_id: 9,
            counterparty_name: Some("ACME CORP".to_string()),
            amount: Amount::from_str(amount).unwrap(),
            direction,
            description: "SALARY".to_string(),
            timestamp: parse_timestamp(timestamp).unwrap(),
        }
    }

    fn salary_table_exists(store: &SqliteStore) -> bool {
        store
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'customer_salary'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .unwrap()
            == 1
    }

    #[test]
    fn test_fetch_filters_debits_and_small_credits() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
            .insert_transactions(&[
                tx("b", "80000", Direction::Credit, "2024-02-01"),
                tx("a", "75000.10", Direction::Credit, "2024-01-01"),
                tx("d", "90000", Direction::Debit, "2024-01-15"),
                tx("s", "69999.99", Direction::Credit, "2024-01-20"),
            ])
            .unwrap();

        let credits = store.fetch_eligible_credits(Amount::from(70000)).unwrap();
        let ids: Vec<&str> = credits.iter().map(|t| t.id.as_str()).collect();

        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(credits[0].amount.to_string(), "75000.10");
        assert_eq!(credits[0].customer_id, 9);
    }

    #[test]
    fn test_fetch_accepts_uppercase_direction() {
        let store = SqliteStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO transactions VALUES ('x', 1, NULL, '71000', 'CREDIT', '', '2024-01-01 00:00:00')",
                [],
            )
            .unwrap();

        let mut store = store;
        let credits = store.fetch_eligible_credits(Amount::from(70000)).unwrap();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].counterparty_name, None);
    }

    #[test]
    fn test_save_creates_table_and_upserts() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert!(!salary_table_exists(&store));

        store
            .save(&[tx("a", "75000", Direction::Credit, "2024-01-01")])
            .unwrap();
        assert!(salary_table_exists(&store));

        let mut updated = tx("a", "76000.50", Direction::Credit, "2024-01-02 08:00:00");
        updated.counterparty_name = Some("ACME CORPORATION".to_string());
        updated.description = "SALARY ADJ".to_string();
        store.save(&[updated]).unwrap();

        let saved = store.salary_transactions().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].amount.to_string(), "76000.50");
        assert_eq!(saved[0].counterparty_name.as_deref(), Some("ACME CORPORATION"));
        assert_eq!(saved[0].description, "SALARY ADJ");
        assert_eq!(saved[0].timestamp.to_string(), "2024-01-02 08:00:00");
    }

    #[test]
    fn test_save_empty_is_noop() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.save(&[]).unwrap();
        assert!(!salary_table_exists(&store));
    }

    #[test]
    fn test_customer_id_out_of_sqlite_range_is_rejected() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.migrate().unwrap();

        let mut huge = tx("h", "75000", Direction::Credit, "2024-01-01");
        huge.customer_id = u64::MAX;
        assert!(matches!(
            store.insert_transactions(&[huge.clone()]),
            Err(DetectionError::Database(_))
        ));
        assert!(matches!(store.save(&[huge]), Err(DetectionError::Database(_))));
        assert!(store.salary_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_negative_stored_customer_id_is_an_error() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO transactions VALUES ('n', -5, 'ACME', '75000', 'credit', '', '2024-01-01 00:00:00')",
                [],
            )
            .unwrap();

        assert!(matches!(
            store.fetch_eligible_credits(Amount::from(70000)),
            Err(DetectionError::Database(_))
        ));
    }

    #[test]
    fn test_open_file_uses_wal() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wal.db");
        let store = SqliteStore::open(&path.to_string_lossy()).unwrap();

        let mode: String = store
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn test_exact_amount_survives_storage() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
            .insert_transactions(&[tx("f", "69999.996", Direction::Credit, "2024-01-01")])
            .unwrap();

        assert!(store
            .fetch_eligible_credits(Amount::from(70000))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_created_at_is_assigned() {
        let mut store = SqliteStore::in_memory().unwrap();
        store
            .save(&[tx("a", "75000", Direction::Credit, "2024-01-01")])
            .unwrap();

        let created_at: String = store
            .conn
            .query_row(
                "SELECT created_at FROM customer_salary WHERE transaction_id = 'a'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!created_at.is_empty());
    }
}
