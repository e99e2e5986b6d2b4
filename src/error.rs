//! Error types for the reconciliation run.

use crate::record::Side;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconError>;

/// Errors that abort a reconciliation run.
///
/// Data-quality problems (bad dates, missing status columns) are not errors;
/// they are collected as [`Finding`](crate::quality::Finding)s instead.
#[derive(Error, Debug)]
pub enum ReconError {
    /// A required configuration option is absent
    #[error("missing required configuration option '{0}'")]
    MissingConfig(&'static str),

    /// A configuration option is present but unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file is not valid TOML or has the wrong shape
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration file could not be read
    #[error("cannot read configuration '{}': {source}", .path.display())]
    ConfigUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The join key is absent from one or both normalized record sets
    #[error("join key '{key}' is missing from the {} record set", describe_sides(.missing))]
    MissingJoinKey { key: String, missing: Vec<Side> },

    /// A column required for classification is absent from the joined set
    #[error("column '{column}' required for {purpose} is missing from the joined record set")]
    MissingColumn {
        column: String,
        purpose: &'static str,
    },

    /// Two source columns normalize to the same name
    #[error("{side} columns normalize to the duplicate name '{column}'")]
    DuplicateColumn { side: Side, column: String },

    /// A record does not have one value per column
    #[error("record has {found} values but the record set has {expected} columns")]
    RowWidth { expected: usize, found: usize },

    /// The ledger database could not be opened or queried
    #[error("cannot read ledger '{}': {source}", .path.display())]
    LedgerUnavailable {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// The processor report could not be opened or parsed
    #[error("cannot read report '{}': {source}", .path.display())]
    ReportUnavailable { path: PathBuf, source: csv::Error },

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Workbook writing error
    #[error("workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Broad error classes used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Precondition,
    Io,
}

impl ReconError {
    /// Classifies the error into the configuration / precondition / I/O taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconError::MissingConfig(_)
            | ReconError::InvalidConfig(_)
            | ReconError::ConfigParse(_) => ErrorKind::Configuration,
            ReconError::MissingJoinKey { .. }
            | ReconError::MissingColumn { .. }
            | ReconError::DuplicateColumn { .. }
            | ReconError::RowWidth { .. } => ErrorKind::Precondition,
            ReconError::ConfigUnavailable { .. }
            | ReconError::LedgerUnavailable { .. }
            | ReconError::ReportUnavailable { .. }
            | ReconError::Io(_)
            | ReconError::Csv(_)
            | ReconError::Sqlite(_)
            | ReconError::Xlsx(_) => ErrorKind::Io,
        }
    }
}

fn describe_sides(sides: &[Side]) -> String {
    sides
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" and ")
}
