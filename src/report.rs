//! Reporter: renders a [`Reconciliation`] into an `.xlsx` workbook with one
//! sheet per discrepancy bucket and a `data_quality` sheet.

use crate::engine::Reconciliation;
use crate::error::{ReconError, Result};
use crate::record::Value;
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

/// Name of the sheet listing data-quality findings.
pub const DATA_QUALITY_SHEET: &str = "data_quality";

/// Header of the extra column carrying each row's provenance tag.
pub const PROVENANCE_COLUMN: &str = "provenance";

/// Writes the workbook into `dir` and returns its path.
///
/// The file is named `<prefix><YYYY-MM-DD_HHMMSS>.xlsx` (with `_1`, `_2`, ...
/// appended when taken); an existing file is never overwritten. The workbook
/// is saved to a temporary sibling first and linked into place, so a failure
/// leaves no partial artifact behind.
pub fn write_report(
    recon: &Reconciliation,
    dir: &Path,
    prefix: &str,
    at: NaiveDateTime,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stem = format!("{}{}", prefix, at.format("%Y-%m-%d_%H%M%S"));
    let tmp = dir.join(format!("{}.{}.xlsx.tmp", stem, process::id()));

    let mut workbook = build_workbook(recon)?;
    let published = workbook
        .save(&tmp)
        .map_err(ReconError::from)
        .and_then(|()| publish(&tmp, dir, &stem));
    if let Err(e) = fs::remove_file(&tmp) {
        debug!("No temporary workbook to remove at {}: {}", tmp.display(), e);
    }
    let path = published?;

    info!("Reconciliation report written: {}", path.display());
    Ok(path)
}

/// Links `tmp` under the first free `<stem>[_n].xlsx` name in `dir`.
///
/// `hard_link` fails when the target exists, so a run started in the same
/// second by another process can never replace this one's workbook.
fn publish(tmp: &Path, dir: &Path, stem: &str) -> Result<PathBuf> {
    let mut n = 0;
    loop {
        let path = if n == 0 {
            dir.join(format!("{}.xlsx", stem))
        } else {
            dir.join(format!("{}_{}.xlsx", stem, n))
        };
        match fs::hard_link(tmp, &path) {
            Ok(()) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{} already exists", path.display());
                n += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn build_workbook(recon: &Reconciliation) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let joined = &recon.joined;

    for (kind, rows) in recon.discrepancies.iter() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(kind.name())?;

        let mut headers: Vec<&str> = joined.columns().iter().map(|c| c.as_str()).collect();
        headers.push(PROVENANCE_COLUMN);
        write_header(sheet, &headers, &header)?;

        for (out_row, &idx) in rows.iter().enumerate() {
            let row = &joined.rows()[idx];
            let r = (out_row + 1) as u32;
            for (col, value) in row.values.iter().enumerate() {
                write_value(sheet, r, col as u16, value)?;
            }
            sheet.write_string(r, row.values.len() as u16, row.provenance.to_string())?;
        }
        debug!("Sheet {}: {} rows", kind, rows.len());
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(DATA_QUALITY_SHEET)?;
    write_header(sheet, &["category", "side", "detail"], &header)?;
    for (i, finding) in recon.findings.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, finding.category())?;
        if let Some(side) = finding.side() {
            sheet.write_string(r, 1, side.to_string())?;
        }
        sheet.write_string(r, 2, finding.to_string())?;
    }
    if !recon.findings.is_empty() {
        warn!(
            "{} data-quality finding(s) recorded in sheet '{}'",
            recon.findings.len(),
            DATA_QUALITY_SHEET
        );
    }

    Ok(workbook)
}

fn write_header(sheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<()> {
    for (col, name) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, format)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_value(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Number(amount) => {
            sheet.write_number(row, col, amount.to_f64())?;
        }
        other => {
            sheet.write_string(row, col, other.to_string())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ReconOptions, Reconciler};
    use crate::record::RecordSet;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn reconciliation() -> Reconciliation {
        let cols = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        let ledger = RecordSet::from_rows(
            cols(&["transaction_id", "amount"]),
            vec![
                vec![Value::from_cell("T1"), Value::from_cell("10.00")],
                vec![Value::from_cell("T2"), Value::from_cell("20.00")],
            ],
        )
        .unwrap();
        let report = RecordSet::from_rows(
            cols(&["transaction_id", "amount", "status"]),
            vec![
                vec![Value::from_cell("T1"), Value::from_cell("11.00"), Value::from_cell("failed")],
                vec![Value::from_cell("T3"), Value::from_cell("5"), Value::from_cell("completed")],
            ],
        )
        .unwrap();
        Reconciler::new(ReconOptions::default())
            .reconcile(&ledger, &report)
            .unwrap()
    }

    #[test]
    fn test_report_name_uses_prefix_and_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(&reconciliation(), dir.path(), "reconciliation_report_", at()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "reconciliation_report_2024-06-01_093000.xlsx"
        );
    }

    #[test]
    fn test_existing_workbook_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let taken = dir.path().join("r_2024-06-01_093000.xlsx");
        fs::write(&taken, b"previous run").unwrap();

        let second = write_report(&reconciliation(), dir.path(), "r_", at()).unwrap();
        let third = write_report(&reconciliation(), dir.path(), "r_", at()).unwrap();

        assert_eq!(fs::read(&taken).unwrap(), b"previous run");
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "r_2024-06-01_093000_1.xlsx"
        );
        assert_eq!(
            third.file_name().unwrap().to_str().unwrap(),
            "r_2024-06-01_093000_2.xlsx"
        );
    }

    #[test]
    fn test_write_report_creates_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("reports");

        let path = write_report(&reconciliation(), &out_dir, "recon_", at()).unwrap();

        assert!(path.exists());
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let leftovers: Vec<_> = fs::read_dir(&out_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
