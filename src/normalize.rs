//! Normalizer: maps one source's native field names onto the canonical
//! schema and coerces date and amount fields.
//!
//! Normalization never fails on bad data. A date that cannot be parsed becomes
//! [`Value::InvalidDate`] and is reported as a [`Finding`]; the run continues.

use crate::amount::Amount;
use crate::error::{ReconError, Result};
use crate::quality::Finding;
use crate::record::{RecordSet, Side, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

/// Date-only layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Date-time layouts; `%.f` also accepts a missing fraction.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// How one source is mapped onto the canonical schema.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    /// Native field name to canonical name. Keys are matched after trimming
    /// and lower-casing.
    pub rename: BTreeMap<String, String>,
    /// Canonical names of fields to parse as dates.
    pub date_fields: Vec<String>,
    /// Canonical names of fields to coerce to exact amounts.
    pub amount_fields: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            rename: BTreeMap::new(),
            date_fields: vec!["date".to_string()],
            amount_fields: vec!["amount".to_string()],
        }
    }
}

/// A normalized record set plus the findings raised while producing it.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub records: RecordSet,
    pub findings: Vec<Finding>,
}

/// Produces a new record set in the canonical schema. The input is untouched.
///
/// Field names are trimmed and lower-cased, then renamed through
/// `options.rename`; fields without a mapping pass through under their
/// cleaned name.
pub fn normalize(set: &RecordSet, side: Side, options: &NormalizeOptions) -> Result<Normalized> {
    let rename: HashMap<String, &str> = options
        .rename
        .iter()
        .map(|(from, to)| (clean_name(from), to.as_str()))
        .collect();

    let mut columns = Vec::with_capacity(set.columns().len());
    let mut seen = HashSet::new();
    for column in set.columns() {
        let cleaned = clean_name(column);
        let canonical = match rename.get(&cleaned) {
            Some(to) => to.to_string(),
            None => cleaned,
        };
        if !seen.insert(canonical.clone()) {
            return Err(ReconError::DuplicateColumn {
                side,
                column: canonical,
            });
        }
        columns.push(canonical);
    }

    let date_idx = field_indices(&columns, &options.date_fields);
    let amount_idx = field_indices(&columns, &options.amount_fields);
    debug!(
        "Normalizing {} {} records: {} date field(s), {} amount field(s)",
        set.len(),
        side,
        date_idx.len(),
        amount_idx.len()
    );

    let mut findings = Vec::new();
    let mut records = RecordSet::new(columns);
    for (row_idx, row) in set.rows().iter().enumerate() {
        let mut values = row.clone();

        for &idx in &date_idx {
            let parsed = coerce_date(&values[idx]);
            if let Value::InvalidDate(raw) = &parsed {
                if !matches!(values[idx], Value::InvalidDate(_)) {
                    findings.push(Finding::UnparseableDate {
                        side,
                        row: row_idx + 1,
                        field: records.columns()[idx].clone(),
                        raw: raw.clone(),
                    });
                }
            }
            values[idx] = parsed;
        }

        for &idx in &amount_idx {
            if let Value::Text(raw) = &values[idx] {
                match Amount::from_str(raw.trim()) {
                    Ok(amount) => values[idx] = Value::Number(amount),
                    Err(_) => findings.push(Finding::UnparseableAmount {
                        side,
                        row: row_idx + 1,
                        field: records.columns()[idx].clone(),
                        raw: raw.clone(),
                    }),
                }
            }
        }

        records.push(values)?;
    }

    for finding in &findings {
        warn!("{}", finding);
    }

    Ok(Normalized { records, findings })
}

/// Parses a date from text, accepting the common ISO and slash layouts as
/// well as date-times (truncated to their calendar date).
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn coerce_date(value: &Value) -> Value {
    match value {
        Value::Null | Value::Date(_) | Value::InvalidDate(_) => value.clone(),
        Value::Text(text) => match parse_date(text) {
            Some(date) => Value::Date(date),
            None => Value::InvalidDate(text.clone()),
        },
        Value::Number(amount) => Value::InvalidDate(amount.to_string()),
    }
}

fn clean_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn field_indices(columns: &[String], fields: &[String]) -> Vec<usize> {
    fields
        .iter()
        .filter_map(|f| columns.iter().position(|c| c == f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn report_options() -> NormalizeOptions {
        NormalizeOptions {
            rename: [
                ("Payment_Gateway_ID", "transaction_id"),
                ("transaction_date", "date"),
                ("charged_amount", "amount"),
            ]
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect(),
            date_fields: vec!["date".to_string()],
            amount_fields: vec!["amount".to_string()],
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_renames_case_insensitively_after_trimming() {
        let raw = RecordSet::from_rows(
            cols(&[" PAYMENT_GATEWAY_ID ", "Transaction_Date", "Status", "charged_amount"]),
            vec![vec![
                Value::from("T00001"),
                Value::from("2024-01-05"),
                Value::from("completed"),
                Value::from("100.00"),
            ]],
        )
        .unwrap();

        let out = normalize(&raw, Side::Report, &report_options()).unwrap();

        assert_eq!(
            out.records.columns(),
            &cols(&["transaction_id", "date", "status", "amount"])[..]
        );
        assert_eq!(out.records.value(0, "date"), Some(&Value::Date(date(2024, 1, 5))));
        assert_eq!(
            out.records.value(0, "amount"),
            Some(&Value::Number(Amount::from(100)))
        );
        assert_eq!(out.records.value(0, "status"), Some(&Value::from("completed")));
        assert!(out.findings.is_empty());
        // original untouched
        assert_eq!(raw.columns()[0], " PAYMENT_GATEWAY_ID ");
    }

    #[test]
    fn test_bad_date_becomes_marker_and_finding() {
        let raw = RecordSet::from_rows(
            cols(&["transaction_id", "date"]),
            vec![
                vec![Value::from("T1"), Value::from("not-a-date")],
                vec![Value::from("T2"), Value::Null],
                vec![Value::from("T3"), Value::from("2024-02-30")],
            ],
        )
        .unwrap();

        let out = normalize(&raw, Side::Ledger, &report_options()).unwrap();

        assert_eq!(
            out.records.value(0, "date"),
            Some(&Value::InvalidDate("not-a-date".to_string()))
        );
        assert_eq!(out.records.value(1, "date"), Some(&Value::Null));
        assert_eq!(
            out.records.value(2, "date"),
            Some(&Value::InvalidDate("2024-02-30".to_string()))
        );
        assert_eq!(out.findings.len(), 2);
        assert_eq!(
            out.findings[0],
            Finding::UnparseableDate {
                side: Side::Ledger,
                row: 1,
                field: "date".to_string(),
                raw: "not-a-date".to_string(),
            }
        );
    }

    #[test]
    fn test_unparseable_amount_kept_as_text() {
        let raw = RecordSet::from_rows(
            cols(&["transaction_id", "amount"]),
            vec![vec![Value::from("T1"), Value::from("12,50 EUR")]],
        )
        .unwrap();

        let out = normalize(&raw, Side::Report, &report_options()).unwrap();

        assert_eq!(out.records.value(0, "amount"), Some(&Value::from("12,50 EUR")));
        assert_eq!(out.findings.len(), 1);
        assert_eq!(out.findings[0].category(), "unparseable_amount");
    }

    #[test]
    fn test_normalizing_twice_is_a_no_op() {
        let raw = RecordSet::from_rows(
            cols(&["Payment_Gateway_ID", "transaction_date", "charged_amount", "note"]),
            vec![
                vec![
                    Value::from("T1"),
                    Value::from("2024-01-05 13:45:00"),
                    Value::from("10.5"),
                    Value::from("x"),
                ],
                vec![
                    Value::from("T2"),
                    Value::from("garbage"),
                    Value::Null,
                    Value::Null,
                ],
            ],
        )
        .unwrap();

        let once = normalize(&raw, Side::Report, &report_options()).unwrap();
        let twice = normalize(&once.records, Side::Report, &report_options()).unwrap();

        assert_eq!(once.records, twice.records);
        assert!(twice.findings.is_empty());
    }

    #[test]
    fn test_duplicate_canonical_name_is_rejected() {
        let raw = RecordSet::from_rows(
            cols(&["charged_amount", "AMOUNT"]),
            vec![vec![Value::from("1"), Value::from("2")]],
        )
        .unwrap();

        let err = normalize(&raw, Side::Report, &report_options()).unwrap_err();
        assert!(matches!(err, ReconError::DuplicateColumn { side: Side::Report, .. }));
    }

    #[test]
    fn test_parse_date_layouts() {
        assert_eq!(parse_date("2024-01-05"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date(" 2024/01/05 "), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("01/05/2024"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05 23:59:59"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T08:00:00.123"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T08:00:00+02:00"), Some(date(2024, 1, 5)));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_numeric_date_is_invalid() {
        let raw = RecordSet::from_rows(
            cols(&["date"]),
            vec![vec![Value::Number(Amount::from(20240105))]],
        )
        .unwrap();

        let out = normalize(&raw, Side::Ledger, &report_options()).unwrap();
        assert_eq!(
            out.records.value(0, "date"),
            Some(&Value::InvalidDate("20240105".to_string()))
        );
        assert_eq!(out.findings.len(), 1);
    }
}
