//! Error types for salary detection.

use thiserror::Error;

/// Result type alias for detection operations
pub type Result<T> = std::result::Result<T, DetectionError>;

/// Errors that can occur while fetching, detecting or persisting transactions.
///
/// The detector itself never produces an error; every variant originates in a
/// transaction source, a persistence sink, configuration or the command line.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// Failed to open, read or write a file or stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// SQLite query or write failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Malformed transaction record
    #[error("Invalid transaction at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Detector settings that cannot describe a streak
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Neither an input file nor a database was given
    #[error("Missing input. Usage: salary-detector [<transactions.csv>] [--db <path>] [--min-amount <n>] [--min-days <n>] [--max-days <n>] [--tolerance <fraction>] [--min-occurrences <n>]")]
    MissingArgument,

    /// A command-line flag with a missing or unparsable value
    #[error("Invalid value for {flag}: '{value}'")]
    InvalidArgument { flag: String, value: String },
}
