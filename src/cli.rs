//! Command-line argument handling for the `salary-detector` binary.

use crate::amount::Amount;
use crate::config::DetectorConfig;
use crate::error::{DetectionError, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// CSV file to read transactions from.
    pub input: Option<String>,

    /// SQLite database; the source when no input is given, otherwise the sink.
    pub db: Option<String>,

    pub config: DetectorConfig,
}

impl CliArgs {
    /// Parses arguments, excluding the program name.
    ///
    /// At least one of an input file or `--db` is required.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut input = None;
        let mut db = None;
        let mut config = DetectorConfig::default();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--db" => db = Some(flag_value(arg, iter.next())?.to_string()),
                "--min-amount" => config.min_amount = parse_value::<Amount>(arg, iter.next())?,
                "--min-days" => config.min_days = parse_value(arg, iter.next())?,
                "--max-days" => config.max_days = parse_value(arg, iter.next())?,
                "--tolerance" => {
                    config.amount_tolerance = parse_value::<Decimal>(arg, iter.next())?
                }
                "--min-occurrences" => {
                    config.min_occurrences = parse_value(arg, iter.next())?
                }
                flag if flag.starts_with("--") => {
                    return Err(DetectionError::InvalidArgument {
                        flag: flag.to_string(),
                        value: String::new(),
                    })
                }
                path if input.is_none() => input = Some(path.to_string()),
                extra => {
                    return Err(DetectionError::InvalidArgument {
                        flag: "input".to_string(),
                        value: extra.to_string(),
                    })
                }
            }
        }

        if input.is_none() && db.is_none() {
            return Err(DetectionError::MissingArgument);
        }
        config.validate()?;

        Ok(CliArgs { input, db, config })
    }
}

fn flag_value<'a>(flag: &str, value: Option<&'a String>) -> Result<&'a str> {
    value
        .map(String::as_str)
        .ok_or_else(|| DetectionError::InvalidArgument {
            flag: flag.to_string(),
            value: String::new(),
        })
}

fn parse_value<T: FromStr>(flag: &str, value: Option<&String>) -> Result<T> {
    let raw = flag_value(flag, value)?;
    raw.parse().map_err(|_| DetectionError::InvalidArgument {
        flag: flag.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs> {
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        CliArgs::parse(&owned)
    }

    #[test]
    fn test_input_only() {
        let args = parse(&["transactions.csv"]).unwrap();
        assert_eq!(args.input.as_deref(), Some("transactions.csv"));
        assert_eq!(args.db, None);
        assert_eq!(args.config, DetectorConfig::default());
    }

    #[test]
    fn test_db_only() {
        let args = parse(&["--db", "salary.db"]).unwrap();
        assert_eq!(args.input, None);
        assert_eq!(args.db.as_deref(), Some("salary.db"));
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "in.csv",
            "--min-amount",
            "50000",
            "--min-days",
            "6",
            "--max-days",
            "8",
            "--tolerance",
            "0.05",
            "--min-occurrences",
            "4",
        ])
        .unwrap();

        assert_eq!(args.config.min_amount.to_string(), "50000.00");
        assert_eq!((args.config.min_days, args.config.max_days), (6, 8));
        assert_eq!(args.config.amount_tolerance.to_string(), "0.05");
        assert_eq!(args.config.min_occurrences, 4);
    }

    #[test]
    fn test_missing_everything() {
        assert!(matches!(parse(&[]), Err(DetectionError::MissingArgument)));
    }

    #[test]
    fn test_bad_values() {
        assert!(matches!(
            parse(&["in.csv", "--min-days", "soon"]),
            Err(DetectionError::InvalidArgument { .. })
        ));
        assert!(matches!(
            parse(&["in.csv", "--db"]),
            Err(DetectionError::InvalidArgument { .. })
        ));
        assert!(matches!(
            parse(&["in.csv", "--verbose"]),
            Err(DetectionError::InvalidArgument { .. })
        ));
        assert!(matches!(
            parse(&["a.csv", "b.csv"]),
            Err(DetectionError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_invalid_window_rejected() {
        assert!(matches!(
            parse(&["in.csv", "--min-days", "40"]),
            Err(DetectionError::InvalidConfig(_))
        ));
    }
}
