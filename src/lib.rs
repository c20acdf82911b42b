//! # Salary Detector
//!
//! Finds recurring, salary-like credits in customer transaction histories
//! and stores them for downstream use such as income verification.
//!
//! ## Design Principles
//!
//! - **Exact amounts**: decimal arithmetic via `rust_decimal`, so tolerance
//!   bounds are compared without rounding error
//! - **Pure core**: [`RecurrenceDetector`] never fails and never touches I/O
//! - **Deterministic output**: results ordered by customer, then timestamp,
//!   each transaction id at most once
//! - **Explicit failures**: source and sink errors are returned to the caller
//!
//! ## Example
//!
//! ```no_run
//! use salary_detector::{CsvSink, CsvSource, DetectionPipeline, RecurrenceDetector};
//! use std::fs::File;
//!
//! let source = CsvSource::new(File::open("transactions.csv").unwrap());
//! let sink = CsvSink::new(std::io::stdout());
//! let mut pipeline = DetectionPipeline::new(source, sink, RecurrenceDetector::default());
//! let summary = pipeline.run().unwrap();
//! println!("{} salary credits", summary.transactions_saved);
//! ```

pub mod amount;
pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod store;
pub mod transaction;

pub use amount::Amount;
pub use cli::CliArgs;
pub use config::DetectorConfig;
pub use detector::RecurrenceDetector;
pub use error::{DetectionError, Result};
pub use pipeline::{detect_all, DetectionPipeline, RunSummary};
pub use sink::{CsvSink, PersistenceSink};
pub use source::{CsvSource, TransactionSource};
pub use store::SqliteStore;
pub use transaction::{CustomerId, Direction, Transaction, TransactionRecord};
