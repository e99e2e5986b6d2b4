//! End-to-end run: load both sources, reconcile, write the workbook.

use crate::config::Settings;
use crate::engine::{Reconciler, Reconciliation};
use crate::error::Result;
use crate::source::{load_ledger, load_report};
use crate::report::write_report;
use chrono::Local;
use log::info;
use std::path::PathBuf;

/// What a successful run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report_path: PathBuf,
    pub reconciliation: Reconciliation,
}

/// Runs one reconciliation with the given settings.
///
/// Both sources are fully loaded (and their handles released) before any
/// reconciliation starts. Any error aborts the run before the workbook is
/// renamed into place.
pub fn run(settings: &Settings) -> Result<RunOutcome> {
    info!("Starting daily reconciliation");

    info!("Loading ledger");
    let ledger = load_ledger(&settings.ledger_path, &settings.ledger_table)?;
    info!("Loading processor report");
    let report = load_report(&settings.report_path, settings.report_delimiter)?;

    let reconciler = Reconciler::new(settings.options.clone());
    let reconciliation = reconciler.reconcile(&ledger, &report)?;

    let report_path = write_report(
        &reconciliation,
        &settings.output_dir,
        &settings.output_prefix,
        Local::now().naive_local(),
    )?;

    info!(
        "Reconciliation completed: {} discrepancies across {} keys",
        reconciliation.summary.total_discrepancies(),
        reconciliation.summary.distinct_keys
    );

    Ok(RunOutcome {
        report_path,
        reconciliation,
    })
}
