//! Non-fatal data-quality findings.
//!
//! A finding never stops a run. It is logged when recorded and written to the
//! `data_quality` sheet of the output workbook.

use crate::record::{Side, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    /// A designated date field held text that is not a recognizable date.
    UnparseableDate {
        side: Side,
        row: usize,
        field: String,
        raw: String,
    },
    /// A designated amount field held text that is not a decimal number.
    UnparseableAmount {
        side: Side,
        row: usize,
        field: String,
        raw: String,
    },
    /// A join key value occurs on more than one row of one side.
    DuplicateKey {
        side: Side,
        key: Value,
        occurrences: usize,
    },
    /// A row has no join key value and cannot match anything.
    NullKey { side: Side, row: usize },
    /// None of the candidate status fields exist in the joined set.
    NoStatusField { candidates: Vec<String> },
}

impl Finding {
    /// Short machine-friendly category name.
    pub fn category(&self) -> &'static str {
        match self {
            Finding::UnparseableDate { .. } => "unparseable_date",
            Finding::UnparseableAmount { .. } => "unparseable_amount",
            Finding::DuplicateKey { .. } => "duplicate_key",
            Finding::NullKey { .. } => "null_key",
            Finding::NoStatusField { .. } => "no_status_field",
        }
    }

    /// The side the finding concerns, if it concerns only one.
    pub fn side(&self) -> Option<Side> {
        match self {
            Finding::UnparseableDate { side, .. }
            | Finding::UnparseableAmount { side, .. }
            | Finding::DuplicateKey { side, .. }
            | Finding::NullKey { side, .. } => Some(*side),
            Finding::NoStatusField { .. } => None,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::UnparseableDate {
                side,
                row,
                field,
                raw,
            } => write!(
                f,
                "{} row {}: field '{}' has unparseable date '{}'",
                side, row, field, raw
            ),
            Finding::UnparseableAmount {
                side,
                row,
                field,
                raw,
            } => write!(
                f,
                "{} row {}: field '{}' has non-numeric amount '{}'",
                side, row, field, raw
            ),
            Finding::DuplicateKey {
                side,
                key,
                occurrences,
            } => write!(
                f,
                "{} key '{}' occurs {} times; every pairing is kept",
                side, key, occurrences
            ),
            Finding::NullKey { side, row } => {
                write!(f, "{} row {}: join key is empty", side, row)
            }
            Finding::NoStatusField { candidates } => write!(
                f,
                "no status field found among [{}]; failed payments cannot be detected",
                candidates.join(", ")
            ),
        }
    }
}
