//! Core reconciliation engine.
//!
//! Runs the Normalizer over both sources, checks the join key, performs the
//! outer join and classifies the result. The engine does no I/O: callers hand
//! it fully loaded record sets and receive an immutable [`Reconciliation`].

use crate::classify::{classify, BucketKind, ClassifyOptions, Discrepancies};
use crate::error::Result;
use crate::matcher::{check_join_key, full_outer_join, JoinOptions, JoinedSet, Provenance};
use crate::normalize::{normalize, NormalizeOptions};
use crate::quality::Finding;
use crate::record::{RecordSet, Side};
use log::info;
use std::io::Write;

/// Every setting the core stages consume, passed explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconOptions {
    pub ledger: NormalizeOptions,
    pub report: NormalizeOptions,
    pub join: JoinOptions,
    pub classify: ClassifyOptions,
}

/// Headline counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconSummary {
    pub ledger_rows: usize,
    pub report_rows: usize,
    pub joined_rows: usize,
    /// Distinct non-empty keys across both sides.
    pub distinct_keys: usize,
    /// Distinct keys present on both sides.
    pub matched_keys: usize,
    pub missing_in_processor: usize,
    pub missing_in_db: usize,
    pub amount_mismatches: usize,
    pub failed_payments: usize,
    pub findings: usize,
}

impl ReconSummary {
    pub fn bucket_count(&self, kind: BucketKind) -> usize {
        match kind {
            BucketKind::MissingInProcessor => self.missing_in_processor,
            BucketKind::MissingInDb => self.missing_in_db,
            BucketKind::AmountMismatches => self.amount_mismatches,
            BucketKind::FailedPayments => self.failed_payments,
        }
    }

    /// Total rows across all buckets (a row in two buckets counts twice).
    pub fn total_discrepancies(&self) -> usize {
        BucketKind::ALL.iter().map(|k| self.bucket_count(*k)).sum()
    }
}

/// Output of one reconciliation.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub joined: JoinedSet,
    pub discrepancies: Discrepancies,
    /// Status fields used for failed-payment detection.
    pub status_fields: Vec<String>,
    /// Data-quality findings from every stage, in stage order.
    pub findings: Vec<Finding>,
    pub summary: ReconSummary,
}

impl Reconciliation {
    /// Writes the summary as a two-column `metric,count` CSV table.
    pub fn write_summary<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let s = &self.summary;

        csv_writer.write_record(["metric", "count"])?;
        let rows = [
            ("ledger_rows", s.ledger_rows),
            ("report_rows", s.report_rows),
            ("distinct_keys", s.distinct_keys),
            ("matched_keys", s.matched_keys),
            (BucketKind::MissingInProcessor.name(), s.missing_in_processor),
            (BucketKind::MissingInDb.name(), s.missing_in_db),
            (BucketKind::AmountMismatches.name(), s.amount_mismatches),
            (BucketKind::FailedPayments.name(), s.failed_payments),
            ("data_quality_findings", s.findings),
        ];
        for (metric, count) in rows {
            csv_writer.write_record([metric.to_string(), count.to_string()])?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

/// The reconciliation pipeline with its options fixed at construction.
pub struct Reconciler {
    options: ReconOptions,
}

impl Reconciler {
    pub fn new(options: ReconOptions) -> Self {
        Reconciler { options }
    }

    /// Reconciles a raw ledger set against a raw processor report set.
    ///
    /// Fails only on precondition violations (missing join key, duplicate or
    /// missing columns). Data-quality problems are returned as findings.
    pub fn reconcile(&self, ledger: &RecordSet, report: &RecordSet) -> Result<Reconciliation> {
        info!("Normalizing ledger ({} records)", ledger.len());
        let ledger_norm = normalize(ledger, Side::Ledger, &self.options.ledger)?;
        info!("Normalizing report ({} records)", report.len());
        let report_norm = normalize(report, Side::Report, &self.options.report)?;

        check_join_key(&ledger_norm.records, &report_norm.records, &self.options.join.key)?;

        let mut findings = ledger_norm.findings;
        findings.extend(report_norm.findings);

        let join = full_outer_join(&ledger_norm.records, &report_norm.records, &self.options.join)?;
        findings.extend(join.findings);

        let classification = classify(&join.joined, &self.options.classify)?;
        findings.extend(classification.findings);

        let joined = join.joined;
        let d = &classification.discrepancies;
        let summary = ReconSummary {
            ledger_rows: ledger.len(),
            report_rows: report.len(),
            joined_rows: joined.len(),
            distinct_keys: joined.distinct_keys(None),
            matched_keys: joined.distinct_keys(Some(Provenance::Both)),
            missing_in_processor: d.missing_in_processor.len(),
            missing_in_db: d.missing_in_db.len(),
            amount_mismatches: d.amount_mismatches.len(),
            failed_payments: d.failed_payments.len(),
            findings: findings.len(),
        };

        Ok(Reconciliation {
            joined,
            discrepancies: classification.discrepancies,
            status_fields: classification.status_fields,
            findings,
            summary,
        })
    }
}
