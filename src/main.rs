//! Ledger Recon CLI
//!
//! Reconciles the sales ledger against the payment processor report, writes an
//! `.xlsx` discrepancy workbook and prints a `metric,count` summary to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --config reconcile.toml > summary.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: logging verbosity (defaults to `info`)
//! - `RECON_CONFIG`, `RECON_LEDGER`, `RECON_LEDGER_TABLE`, `RECON_REPORT`,
//!   `RECON_OUTPUT_DIR`, `RECON_PREFIX`: fallbacks for the matching flags

use clap::Parser;
use ledger_recon::alert::notify;
use ledger_recon::{Config, Overrides, Result, Settings};
use log::{error, info};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "ledger-recon", version, about = "Reconcile a sales ledger against a payment processor report")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "RECON_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite ledger database
    #[arg(long, env = "RECON_LEDGER")]
    ledger: Option<PathBuf>,

    /// Ledger table name
    #[arg(long, env = "RECON_LEDGER_TABLE")]
    ledger_table: Option<String>,

    /// Processor report (delimited text with header row)
    #[arg(long, env = "RECON_REPORT")]
    report: Option<PathBuf>,

    /// Directory for the output workbook
    #[arg(short, long, env = "RECON_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Output file name prefix
    #[arg(long, env = "RECON_PREFIX")]
    prefix: Option<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let settings = match resolve(cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = execute(&settings) {
        error!("Error during reconciliation workflow: {}", e);
        notify(
            settings.alerter().as_ref(),
            "Reconciliation workflow failed",
            &format!(
                "The daily reconciliation run failed.\n\nError: {}\nLedger: {}\nReport: {}\n",
                e,
                settings.ledger_path.display(),
                settings.report_path.display()
            ),
        );
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Builds settings from the optional config file plus flag overrides.
fn resolve(cli: Cli) -> Result<Settings> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply(Overrides {
        db_path: cli.ledger,
        db_table: cli.ledger_table,
        csv_path: cli.report,
        report_dir: cli.output_dir,
        report_prefix: cli.prefix,
    });
    config.resolve()
}

fn execute(settings: &Settings) -> Result<()> {
    let outcome = ledger_recon::run(settings)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    outcome.reconciliation.write_summary(handle)?;

    info!("Report: {}", outcome.report_path.display());
    Ok(())
}
