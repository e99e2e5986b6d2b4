//! Integration tests for the ledger-recon CLI.
//!
//! These tests build a SQLite ledger from `tests/data/sales.sql`, run the
//! actual binary against the fixture report and inspect stdout, stderr and
//! the output directory.

use assert_cmd::Command;
use predicates::prelude::*;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get path to test data file
fn test_data_path(filename: &str) -> String {
    format!("tests/data/{}", filename)
}

/// Creates `sales.db` in `dir` from the SQL fixture
fn build_ledger(dir: &Path) -> PathBuf {
    let path = dir.join("sales.db");
    let sql = fs::read_to_string(test_data_path("sales.sql")).unwrap();
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&sql).unwrap();
    path
}

/// Files in `dir` with the given extension
fn files_with_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().map_or(false, |e| e == ext))
        .collect()
}

fn recon_cmd() -> Command {
    let mut cmd = Command::cargo_bin("ledger-recon").unwrap();
    for var in [
        "RECON_CONFIG",
        "RECON_LEDGER",
        "RECON_LEDGER_TABLE",
        "RECON_REPORT",
        "RECON_OUTPUT_DIR",
        "RECON_PREFIX",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Run the binary on the fixtures and return (stdout, output dir)
fn run_recon(tmp: &TempDir, report: &str) -> (String, PathBuf) {
    let ledger = build_ledger(tmp.path());
    let out_dir = tmp.path().join("reports");

    let assert = recon_cmd()
        .arg("--config")
        .arg(test_data_path("reconcile.toml"))
        .arg("--ledger")
        .arg(&ledger)
        .arg("--report")
        .arg(test_data_path(report))
        .arg("--output-dir")
        .arg(&out_dir)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    (stdout, out_dir)
}

#[test]
fn test_fixture_reconciliation_summary() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _) = run_recon(&tmp, "processor_report.csv");

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "metric,count",
            "ledger_rows,5",
            "report_rows,5",
            "distinct_keys,6",
            "matched_keys,4",
            "missing_in_processor,1",
            "missing_in_db,1",
            "amount_mismatches,1",
            "failed_payments,1",
            "data_quality_findings,0",
        ]
    );
}

#[test]
fn test_writes_single_timestamped_workbook() {
    let tmp = TempDir::new().unwrap();
    let (_, out_dir) = run_recon(&tmp, "processor_report.csv");

    let workbooks = files_with_extension(&out_dir, "xlsx");
    assert_eq!(workbooks.len(), 1);

    let name = workbooks[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("reconciliation_report_"), "{}", name);
    assert_eq!(&fs::read(&workbooks[0]).unwrap()[..2], b"PK");
    assert!(files_with_extension(&out_dir, "tmp").is_empty());
}

#[test]
fn test_bad_dates_are_findings_not_failures() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _) = run_recon(&tmp, "processor_report_bad_dates.csv");

    assert!(stdout.contains("matched_keys,5"));
    assert!(stdout.contains("amount_mismatches,0"));
    assert!(stdout.contains("data_quality_findings,2"));
}

#[test]
fn test_prefix_flag_names_the_workbook() {
    let tmp = TempDir::new().unwrap();
    let ledger = build_ledger(tmp.path());
    let out_dir = tmp.path().join("out");

    recon_cmd()
        .arg("--config")
        .arg(test_data_path("reconcile.toml"))
        .arg("--ledger")
        .arg(&ledger)
        .arg("--report")
        .arg(test_data_path("processor_report.csv"))
        .arg("--output-dir")
        .arg(&out_dir)
        .arg("--prefix")
        .arg("daily_")
        .assert()
        .success();

    let workbooks = files_with_extension(&out_dir, "xlsx");
    assert_eq!(workbooks.len(), 1);
    assert!(workbooks[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("daily_"));
}

#[test]
fn test_missing_configuration_error() {
    recon_cmd()
        .arg("--report")
        .arg(test_data_path("processor_report.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required configuration option 'paths.db_path'"));
}

#[test]
fn test_missing_config_file_error() {
    recon_cmd()
        .arg("--config")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read configuration"));
}

#[test]
fn test_missing_ledger_error_leaves_no_workbook() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("reports");

    recon_cmd()
        .arg("--config")
        .arg(test_data_path("reconcile.toml"))
        .arg("--ledger")
        .arg(tmp.path().join("absent.db"))
        .arg("--report")
        .arg(test_data_path("processor_report.csv"))
        .arg("--output-dir")
        .arg(&out_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read ledger"));

    assert!(files_with_extension(&out_dir, "xlsx").is_empty());
    assert!(!tmp.path().join("absent.db").exists());
}

#[test]
fn test_missing_join_key_error() {
    let tmp = TempDir::new().unwrap();
    let ledger = tmp.path().join("sales.db");
    let conn = Connection::open(&ledger).unwrap();
    conn.execute_batch(
        "CREATE TABLE sales (id TEXT, amount REAL);
         INSERT INTO sales VALUES ('T00001', 100.0);",
    )
    .unwrap();
    drop(conn);

    recon_cmd()
        .arg("--config")
        .arg(test_data_path("reconcile.toml"))
        .arg("--ledger")
        .arg(&ledger)
        .arg("--report")
        .arg(test_data_path("processor_report.csv"))
        .arg("--output-dir")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "join key 'transaction_id' is missing from the ledger record set",
        ));
}

#[test]
fn test_failure_queues_alert_in_outbox() {
    let tmp = TempDir::new().unwrap();
    let outbox = tmp.path().join("outbox");
    let config_path = tmp.path().join("reconcile.toml");
    let config = format!(
        "{}\n[alerts]\nsender = \"recon@example.com\"\nrecipients = [\"ops@example.com\"]\nspool_dir = {:?}\n",
        fs::read_to_string(test_data_path("reconcile.toml")).unwrap(),
        outbox.to_string_lossy()
    );
    fs::write(&config_path, config).unwrap();

    recon_cmd()
        .arg("--config")
        .arg(&config_path)
        .arg("--ledger")
        .arg(tmp.path().join("absent.db"))
        .arg("--report")
        .arg(test_data_path("processor_report.csv"))
        .arg("--output-dir")
        .arg(tmp.path().join("reports"))
        .assert()
        .failure();

    let messages = files_with_extension(&outbox, "eml");
    assert_eq!(messages.len(), 1);
    let message = fs::read_to_string(&messages[0]).unwrap();
    assert!(message.contains("Subject: Reconciliation workflow failed"));
    assert!(message.contains("cannot read ledger"));
}
