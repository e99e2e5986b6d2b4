//! Classifier: partitions joined rows into discrepancy buckets.
//!
//! Buckets are computed independently and may overlap; a matched row with a
//! different amount and a failed status lands in both `amount_mismatches` and
//! `failed_payments`.

use crate::error::{ReconError, Result};
use crate::matcher::{JoinedSet, Provenance};
use crate::quality::Finding;
use crate::record::Value;
use log::{debug, info, warn};
use std::fmt;

/// The four discrepancy categories, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    /// In the ledger, absent from the processor report.
    MissingInProcessor,
    /// In the processor report, absent from the ledger.
    MissingInDb,
    /// On both sides with different amounts.
    AmountMismatches,
    /// Any row whose status is the failed status.
    FailedPayments,
}

impl BucketKind {
    pub const ALL: [BucketKind; 4] = [
        BucketKind::MissingInProcessor,
        BucketKind::MissingInDb,
        BucketKind::AmountMismatches,
        BucketKind::FailedPayments,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BucketKind::MissingInProcessor => "missing_in_processor",
            BucketKind::MissingInDb => "missing_in_db",
            BucketKind::AmountMismatches => "amount_mismatches",
            BucketKind::FailedPayments => "failed_payments",
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which joined fields the classifier compares.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyOptions {
    /// Side-qualified ledger amount field, e.g. `amount_db`.
    pub ledger_amount: String,
    /// Side-qualified report amount field, e.g. `amount_csv`.
    pub report_amount: String,
    /// Candidate status fields, in precedence order.
    pub status_fields: Vec<String>,
    /// Status value that marks a failed payment.
    pub failed_status: String,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        ClassifyOptions {
            ledger_amount: "amount_db".to_string(),
            report_amount: "amount_csv".to_string(),
            status_fields: vec![
                "status".to_string(),
                "status_csv".to_string(),
                "status_db".to_string(),
            ],
            failed_status: "failed".to_string(),
        }
    }
}

/// Row indices (into the joined set) per bucket, in joined-row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discrepancies {
    pub missing_in_processor: Vec<usize>,
    pub missing_in_db: Vec<usize>,
    pub amount_mismatches: Vec<usize>,
    pub failed_payments: Vec<usize>,
}

impl Discrepancies {
    pub fn get(&self, kind: BucketKind) -> &[usize] {
        match kind {
            BucketKind::MissingInProcessor => &self.missing_in_processor,
            BucketKind::MissingInDb => &self.missing_in_db,
            BucketKind::AmountMismatches => &self.amount_mismatches,
            BucketKind::FailedPayments => &self.failed_payments,
        }
    }

    /// Buckets in report order.
    pub fn iter(&self) -> impl Iterator<Item = (BucketKind, &[usize])> + '_ {
        BucketKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    /// Every bucket containing the given joined row.
    pub fn buckets_for(&self, row: usize) -> Vec<BucketKind> {
        self.iter()
            .filter(|(_, rows)| rows.binary_search(&row).is_ok())
            .map(|(kind, _)| kind)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub discrepancies: Discrepancies,
    /// Status fields actually found in the joined set, in precedence order.
    pub status_fields: Vec<String>,
    pub findings: Vec<Finding>,
}

/// Computes the four buckets over `joined`.
///
/// Both amount fields must exist in the joined set. Missing status fields are
/// not an error: `failed_payments` is left empty and a finding is recorded.
pub fn classify(joined: &JoinedSet, options: &ClassifyOptions) -> Result<Classification> {
    let ledger_amount = required_column(joined, &options.ledger_amount)?;
    let report_amount = required_column(joined, &options.report_amount)?;

    let status_fields: Vec<String> = options
        .status_fields
        .iter()
        .filter(|f| joined.has_column(f))
        .cloned()
        .collect();
    let status_idx: Vec<usize> = status_fields
        .iter()
        .filter_map(|f| joined.column_index(f))
        .collect();

    let mut findings = Vec::new();
    if status_idx.is_empty() {
        let finding = Finding::NoStatusField {
            candidates: options.status_fields.clone(),
        };
        warn!("{}", finding);
        findings.push(finding);
    } else {
        debug!("Checking failed status in {:?}", status_fields);
    }

    let mut discrepancies = Discrepancies::default();
    for (i, row) in joined.rows().iter().enumerate() {
        match row.provenance {
            Provenance::LeftOnly => discrepancies.missing_in_processor.push(i),
            Provenance::RightOnly => discrepancies.missing_in_db.push(i),
            Provenance::Both => {
                if amounts_differ(&row.values[ledger_amount], &row.values[report_amount]) {
                    discrepancies.amount_mismatches.push(i);
                }
            }
        }

        let failed = status_idx
            .iter()
            .any(|&idx| is_status(&row.values[idx], &options.failed_status));
        if failed {
            discrepancies.failed_payments.push(i);
        }
    }

    info!(
        "Classified {} rows: {} missing in processor, {} missing in db, {} amount mismatches, {} failed payments",
        joined.len(),
        discrepancies.missing_in_processor.len(),
        discrepancies.missing_in_db.len(),
        discrepancies.amount_mismatches.len(),
        discrepancies.failed_payments.len()
    );

    Ok(Classification {
        discrepancies,
        status_fields,
        findings,
    })
}

fn required_column(joined: &JoinedSet, column: &str) -> Result<usize> {
    joined
        .column_index(column)
        .ok_or_else(|| ReconError::MissingColumn {
            column: column.to_string(),
            purpose: "amount comparison",
        })
}

/// Matched amounts are equal only when both are numbers with the same exact
/// value; an empty or non-numeric amount on a matched row is a mismatch.
fn amounts_differ(ledger: &Value, report: &Value) -> bool {
    match (ledger.as_amount(), report.as_amount()) {
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

/// Compares on the displayed form so numeric status codes (an INTEGER ledger
/// column, say) match a configured code like `"2"`.
fn is_status(value: &Value, status: &str) -> bool {
    !value.is_null() && value.to_string().trim().eq_ignore_ascii_case(status.trim())
}
