//! Salary Detector CLI
//!
//! Reads transactions, detects recurring salary credits per customer and
//! writes them to stdout as CSV or upserts them into a SQLite database.
//!
//! # Usage
//!
//! ```bash
//! # CSV in, CSV out
//! cargo run -- transactions.csv > salary.csv
//!
//! # CSV in, stored in customer_salary
//! cargo run -- transactions.csv --db salary.db
//!
//! # transactions table in, stored in customer_salary
//! cargo run -- --db salary.db
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `info` or `debug` to see per-customer decisions

use salary_detector::{
    CliArgs, CsvSink, CsvSource, DetectionError, DetectionPipeline, PersistenceSink,
    RecurrenceDetector, Result, RunSummary, SqliteStore, TransactionSource,
};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let cli = CliArgs::parse(&args)?;
    let detector = RecurrenceDetector::new(cli.config);

    match (cli.input.as_deref(), cli.db.as_deref()) {
        (Some(input), Some(db)) => {
            let source = CsvSource::new(BufReader::new(File::open(input)?));
            run_pipeline(source, open_store(db)?, detector)?;
        }
        (Some(input), None) => {
            let source = CsvSource::new(BufReader::new(File::open(input)?));
            let stdout = io::stdout();
            run_pipeline(source, CsvSink::new(stdout.lock()), detector)?;
        }
        (None, Some(db)) => {
            // Separate connections; the read finishes before the write begins.
            run_pipeline(open_store(db)?, open_store(db)?, detector)?;
        }
        (None, None) => return Err(DetectionError::MissingArgument),
    }

    Ok(())
}

fn open_store(path: &str) -> Result<SqliteStore> {
    let store = SqliteStore::open(path)?;
    store.migrate()?;
    Ok(store)
}

fn run_pipeline<S: TransactionSource, K: PersistenceSink>(
    source: S,
    sink: K,
    detector: RecurrenceDetector,
) -> Result<RunSummary> {
    DetectionPipeline::new(source, sink, detector).run()
}
