//! Tabular record sets shared by every reconciliation stage.

use crate::amount::Amount;
use crate::error::{ReconError, Result};
use chrono::NaiveDate;
use std::fmt;

/// Which source a record set (or a finding) belongs to.
///
/// The ledger is always the left side of the join, the processor report the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Ledger,
    Report,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Ledger => write!(f, "ledger"),
            Side::Report => write!(f, "report"),
        }
    }
}

/// A single scalar field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Absent value (SQL NULL, empty CSV cell, or the missing side of a join).
    Null,
    Text(String),
    Number(Amount),
    Date(NaiveDate),
    /// A designated date field whose raw text could not be parsed.
    InvalidDate(String),
}

impl Value {
    /// Reads a delimited-text cell: empty is `Null`, anything else is
    /// trimmed `Text`. Typing is left to the Normalizer.
    pub fn from_cell(cell: &str) -> Value {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            Value::Null
        } else {
            Value::Text(trimmed.to_string())
        }
    }

    /// Text form used to compare join keys across sources, so an INTEGER
    /// ledger id and a CSV id with the same digits are the same key.
    pub fn key_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(text) if text.trim().is_empty() => None,
            Value::Text(text) => Some(text.trim().to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_amount(&self) -> Option<Amount> {
        match self {
            Value::Number(amount) => Some(*amount),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(text) => write!(f, "{}", text),
            Value::Number(amount) => write!(f, "{}", amount),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::InvalidDate(raw) => write!(f, "{}", raw),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<Amount> for Value {
    fn from(amount: Amount) -> Self {
        Value::Number(amount)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Value::Date(date)
    }
}

/// An ordered set of records sharing one column list.
///
/// Every row holds exactly one value per column; the column order is kept
/// through normalization and joining and becomes the output column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordSet {
    /// Creates an empty record set with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        RecordSet {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a record set from columns and rows, validating row widths.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut set = RecordSet::new(columns);
        for row in rows {
            set.push(row)?;
        }
        Ok(set)
    }

    /// Appends a record.
    pub fn push(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ReconError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Looks up a single value by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }
}
