//! Matcher: full outer join of the normalized ledger (left) and processor
//! report (right) on a shared key.
//!
//! Every output row carries exactly one [`Provenance`] tag derived only from
//! which sides the key was found on. Duplicate keys are never collapsed: each
//! left row is paired with every right row sharing its key. Keys compare on
//! their text form ([`Value::key_text`]), never as numbers.

use crate::error::{ReconError, Result};
use crate::quality::Finding;
use crate::record::{RecordSet, Side, Value};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Where a joined row's key was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Key present only in the ledger.
    LeftOnly,
    /// Key present only in the processor report.
    RightOnly,
    /// Key present on both sides.
    Both,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::LeftOnly => write!(f, "left_only"),
            Provenance::RightOnly => write!(f, "right_only"),
            Provenance::Both => write!(f, "both"),
        }
    }
}

/// Join key and the suffixes that disambiguate colliding field names.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOptions {
    pub key: String,
    pub left_suffix: String,
    pub right_suffix: String,
}

impl Default for JoinOptions {
    fn default() -> Self {
        JoinOptions {
            key: "transaction_id".to_string(),
            left_suffix: "_db".to_string(),
            right_suffix: "_csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub provenance: Provenance,
    pub values: Vec<Value>,
}

/// Result of the outer join: ledger columns, then report columns.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedSet {
    columns: Vec<String>,
    rows: Vec<JoinedRow>,
    key_index: usize,
}

impl JoinedSet {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[JoinedRow] {
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

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r.values[idx])
    }

    pub fn key(&self, row: usize) -> Option<&Value> {
        self.rows.get(row).map(|r| &r.values[self.key_index])
    }

    /// Number of rows carrying the given tag.
    pub fn count(&self, provenance: Provenance) -> usize {
        self.rows
            .iter()
            .filter(|r| r.provenance == provenance)
            .count()
    }

    /// Number of distinct non-null keys, optionally restricted to one tag.
    pub fn distinct_keys(&self, provenance: Option<Provenance>) -> usize {
        self.rows
            .iter()
            .filter(|r| provenance.map_or(true, |p| r.provenance == p))
            .filter_map(|r| r.values[self.key_index].key_text())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// A joined set plus duplicate and empty key findings.
#[derive(Debug, Clone)]
pub struct JoinOutput {
    pub joined: JoinedSet,
    pub findings: Vec<Finding>,
}

/// Verifies that both normalized sets carry the join key and returns its
/// column position on each side.
///
/// Run this before [`full_outer_join`] so a misconfigured key is reported by
/// name rather than surfacing as a missing column deep inside the join.
pub fn check_join_key(left: &RecordSet, right: &RecordSet, key: &str) -> Result<(usize, usize)> {
    match (left.column_index(key), right.column_index(key)) {
        (Some(kl), Some(kr)) => Ok((kl, kr)),
        (kl, kr) => {
            let mut missing = Vec::new();
            if kl.is_none() {
                missing.push(Side::Ledger);
            }
            if kr.is_none() {
                missing.push(Side::Report);
            }
            Err(ReconError::MissingJoinKey {
                key: key.to_string(),
                missing,
            })
        }
    }
}

/// Full outer join of `left` (ledger) and `right` (report) on `options.key`.
///
/// Output rows are the left rows in input order, each expanded to its right
/// matches in input order, followed by the unmatched right rows. Rows with an
/// empty key never match.
pub fn full_outer_join(
    left: &RecordSet,
    right: &RecordSet,
    options: &JoinOptions,
) -> Result<JoinOutput> {
    let key = options.key.as_str();
    let (kl, kr) = check_join_key(left, right, key)?;

    let columns = joined_columns(left, right, options)?;
    let right_width = right.columns().len() - 1;

    let mut findings = key_findings(left, kl, Side::Ledger);
    findings.extend(key_findings(right, kr, Side::Report));
    for finding in &findings {
        warn!("{}", finding);
    }

    let mut right_index: HashMap<String, Vec<usize>> = HashMap::new();
    for (j, row) in right.rows().iter().enumerate() {
        if let Some(k) = row[kr].key_text() {
            right_index.entry(k).or_default().push(j);
        }
    }

    let mut rows = Vec::with_capacity(left.len().max(right.len()));
    let mut right_matched = vec![false; right.len()];

    for lrow in left.rows() {
        let matches = lrow[kl].key_text().and_then(|k| right_index.get(&k));

        match matches {
            Some(indices) => {
                for &j in indices {
                    right_matched[j] = true;
                    let mut values = lrow.clone();
                    values.extend(right_values(&right.rows()[j], kr));
                    rows.push(JoinedRow {
                        provenance: Provenance::Both,
                        values,
                    });
                }
            }
            None => {
                let mut values = lrow.clone();
                values.extend(std::iter::repeat(Value::Null).take(right_width));
                rows.push(JoinedRow {
                    provenance: Provenance::LeftOnly,
                    values,
                });
            }
        }
    }

    for (j, rrow) in right.rows().iter().enumerate() {
        if right_matched[j] {
            continue;
        }
        let mut values = vec![Value::Null; left.columns().len()];
        values[kl] = rrow[kr].clone();
        values.extend(right_values(rrow, kr));
        rows.push(JoinedRow {
            provenance: Provenance::RightOnly,
            values,
        });
    }

    let joined = JoinedSet {
        columns,
        rows,
        key_index: kl,
    };
    info!(
        "Joined on '{}': {} both, {} ledger-only, {} report-only",
        key,
        joined.count(Provenance::Both),
        joined.count(Provenance::LeftOnly),
        joined.count(Provenance::RightOnly)
    );

    Ok(JoinOutput { joined, findings })
}

/// Left columns in order, then right columns minus the key. Names present on
/// both sides receive the side suffixes.
fn joined_columns(left: &RecordSet, right: &RecordSet, options: &JoinOptions) -> Result<Vec<String>> {
    let key = options.key.as_str();
    let mut columns = Vec::with_capacity(left.columns().len() + right.columns().len());

    for column in left.columns() {
        if column != key && right.has_column(column) {
            columns.push(format!("{}{}", column, options.left_suffix));
        } else {
            columns.push(column.clone());
        }
    }
    for column in right.columns().iter().filter(|c| *c != key) {
        if left.has_column(column) {
            columns.push(format!("{}{}", column, options.right_suffix));
        } else {
            columns.push(column.clone());
        }
    }

    let mut seen = HashSet::new();
    for (i, column) in columns.iter().enumerate() {
        if !seen.insert(column.as_str()) {
            let side = if i < left.columns().len() {
                Side::Ledger
            } else {
                Side::Report
            };
            return Err(ReconError::DuplicateColumn {
                side,
                column: column.clone(),
            });
        }
    }

    debug!("Joined columns: {:?}", columns);
    Ok(columns)
}

fn right_values(row: &[Value], kr: usize) -> impl Iterator<Item = Value> + '_ {
    row.iter()
        .enumerate()
        .filter(move |(i, _)| *i != kr)
        .map(|(_, v)| v.clone())
}

/// Empty keys and keys occurring more than once on one side.
fn key_findings(set: &RecordSet, key_idx: usize, side: Side) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();

    for (i, row) in set.rows().iter().enumerate() {
        let value = &row[key_idx];
        let key = match value.key_text() {
            Some(key) => key,
            None => {
                findings.push(Finding::NullKey { side, row: i + 1 });
                continue;
            }
        };
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push((key, value));
        }
        *count += 1;
    }

    for (key, value) in order {
        let occurrences = counts[&key];
        if occurrences > 1 {
            findings.push(Finding::DuplicateKey {
                side,
                key: value.clone(),
                occurrences,
            });
        }
    }
    findings
}
