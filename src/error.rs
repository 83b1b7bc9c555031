use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the analysis core.
///
/// Numeric degeneracy (zero denominators, non-finite inputs) is never an error,
/// and neither is having too little history to forecast: those come back as
/// fallback values or `None`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("no baseline entry for month {month} (actual record dated {date})")]
    MissingBaselineMonth { month: u32, date: NaiveDate },

    #[error("baseline month_of_year must be within 1..=12, got {0}")]
    InvalidBaselineMonth(u32),

    #[error("baseline contains month {0} more than once")]
    DuplicateBaselineMonth(u32),

    #[error("invalid period '{0}': must be 'overall' or 'latest_month'")]
    InvalidPeriod(String),

    #[error("{0} requires at least one analysed month")]
    EmptyRecords(&'static str),

    #[error("invalid configuration: {field} = {value}")]
    InvalidConfig { field: &'static str, value: String },

    #[error("missing required parameter {0}")]
    MissingParameter(&'static str),

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while loading the service configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] AnalysisError),
}
