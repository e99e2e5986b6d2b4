//! Run configuration.
//!
//! A TOML file (optionally overridden from the command line) is deserialized
//! into [`Config`] and then resolved once into immutable [`Settings`]. Every
//! stage receives the part of the settings it needs; nothing reads global
//! state.

use crate::alert::{Alerter, LogAlerter, SpoolAlerter};
use crate::classify::ClassifyOptions;
use crate::engine::ReconOptions;
use crate::error::{ReconError, Result};
use crate::matcher::JoinOptions;
use crate::normalize::NormalizeOptions;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_TABLE: &str = "sales";
const DEFAULT_PREFIX: &str = "reconciliation_report_";
const DEFAULT_SPOOL_DIR: &str = "outbox";

/// Raw configuration as written in the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub paths: PathsConfig,
    pub report: ReportConfig,
    pub mapping: MappingConfig,
    pub reconcile: ReconcileConfig,
    pub alerts: Option<AlertsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub db_path: Option<PathBuf>,
    pub db_table: Option<String>,
    pub csv_path: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub report_prefix: Option<String>,
    pub csv_delimiter: Option<char>,
}

/// Native field name to canonical field name, per source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MappingConfig {
    pub ledger: BTreeMap<String, String>,
    pub report: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    pub join_key: Option<String>,
    pub date_fields: Option<Vec<String>>,
    pub amount_fields: Option<Vec<String>>,
    pub ledger_suffix: Option<String>,
    pub report_suffix: Option<String>,
    pub ledger_amount_field: Option<String>,
    pub report_amount_field: Option<String>,
    pub status_fields: Option<Vec<String>>,
    pub failed_status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertsConfig {
    pub sender: String,
    pub recipients: Vec<String>,
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub db_table: Option<String>,
    pub csv_path: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
    pub report_prefix: Option<String>,
}

/// Fully resolved, immutable settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ledger_path: PathBuf,
    pub ledger_table: String,
    pub report_path: PathBuf,
    pub report_delimiter: u8,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub options: ReconOptions,
    pub alerts: Option<SpoolAlerter>,
}

impl Settings {
    /// The configured alert channel, or the log when none is configured.
    pub fn alerter(&self) -> Box<dyn Alerter> {
        match &self.alerts {
            Some(spool) => Box::new(spool.clone()),
            None => Box::new(LogAlerter),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|source| ReconError::ConfigUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml(&text)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        let paths = &mut self.paths;
        if overrides.db_path.is_some() {
            paths.db_path = overrides.db_path;
        }
        if overrides.db_table.is_some() {
            paths.db_table = overrides.db_table;
        }
        if overrides.csv_path.is_some() {
            paths.csv_path = overrides.csv_path;
        }
        if overrides.report_dir.is_some() {
            paths.report_dir = overrides.report_dir;
        }
        if overrides.report_prefix.is_some() {
            self.report.report_prefix = overrides.report_prefix;
        }
    }

    /// Validates the configuration and fills defaults. Performs no I/O.
    pub fn resolve(&self) -> Result<Settings> {
        let ledger_path = self
            .paths
            .db_path
            .clone()
            .ok_or(ReconError::MissingConfig("paths.db_path"))?;
        let report_path = self
            .paths
            .csv_path
            .clone()
            .ok_or(ReconError::MissingConfig("paths.csv_path"))?;
        let output_dir = self
            .paths
            .report_dir
            .clone()
            .ok_or(ReconError::MissingConfig("paths.report_dir"))?;

        let ledger_table = non_empty(
            "paths.db_table",
            self.paths.db_table.as_deref().unwrap_or(DEFAULT_TABLE),
        )?;
        let output_prefix = self
            .report
            .report_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        let report_delimiter = match self.report.csv_delimiter.unwrap_or(',') {
            c if c.is_ascii() && c != '"' && c != '\n' && c != '\r' => c as u8,
            c => {
                return Err(ReconError::InvalidConfig(format!(
                    "report.csv_delimiter {:?} must be a single ASCII character",
                    c
                )))
            }
        };

        let options = self.recon_options()?;
        let alerts = match &self.alerts {
            Some(a) if a.recipients.is_empty() => {
                return Err(ReconError::InvalidConfig(
                    "alerts.recipients must list at least one address".to_string(),
                ))
            }
            Some(a) => Some(SpoolAlerter {
                sender: a.sender.clone(),
                recipients: a.recipients.clone(),
                spool_dir: a
                    .spool_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SPOOL_DIR)),
            }),
            None => None,
        };

        Ok(Settings {
            ledger_path,
            ledger_table,
            report_path,
            report_delimiter,
            output_dir,
            output_prefix,
            options,
            alerts,
        })
    }

    fn recon_options(&self) -> Result<ReconOptions> {
        let r = &self.reconcile;
        let join_defaults = JoinOptions::default();
        let classify_defaults = ClassifyOptions::default();

        let join = JoinOptions {
            key: non_empty(
                "reconcile.join_key",
                r.join_key.as_deref().unwrap_or(&join_defaults.key),
            )?,
            left_suffix: r.ledger_suffix.clone().unwrap_or(join_defaults.left_suffix),
            right_suffix: r.report_suffix.clone().unwrap_or(join_defaults.right_suffix),
        };
        if join.left_suffix == join.right_suffix {
            return Err(ReconError::InvalidConfig(format!(
                "reconcile.ledger_suffix and reconcile.report_suffix must differ (both '{}')",
                join.left_suffix
            )));
        }

        let normalize_defaults = NormalizeOptions::default();
        let date_fields = r
            .date_fields
            .clone()
            .unwrap_or(normalize_defaults.date_fields);
        let amount_fields = r
            .amount_fields
            .clone()
            .unwrap_or(normalize_defaults.amount_fields);

        let classify = ClassifyOptions {
            ledger_amount: r
                .ledger_amount_field
                .clone()
                .unwrap_or(classify_defaults.ledger_amount),
            report_amount: r
                .report_amount_field
                .clone()
                .unwrap_or(classify_defaults.report_amount),
            status_fields: r
                .status_fields
                .clone()
                .unwrap_or(classify_defaults.status_fields),
            failed_status: r
                .failed_status
                .clone()
                .unwrap_or(classify_defaults.failed_status),
        };

        Ok(ReconOptions {
            ledger: NormalizeOptions {
                rename: self.mapping.ledger.clone(),
                date_fields: date_fields.clone(),
                amount_fields: amount_fields.clone(),
            },
            report: NormalizeOptions {
                rename: self.mapping.report.clone(),
                date_fields,
                amount_fields,
            },
            join,
            classify,
        })
    }
}

fn non_empty(option: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReconError::InvalidConfig(format!("{} must not be empty", option)));
    }
    Ok(trimmed.to_string())
}
