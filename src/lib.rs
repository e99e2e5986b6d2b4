//! # Ledger Recon
//!
//! Reconciles an internal sales ledger against a payment-processor report and
//! classifies every mismatch into a discrepancy bucket.
//!
//! ## Pipeline
//!
//! - **Normalizer**: maps each source onto the canonical schema
//!   (`transaction_id`, `amount`, `status`, `date`) and parses dates
//! - **Matcher**: full outer join on the key, tagging each row `left_only`,
//!   `right_only` or `both`
//! - **Classifier**: derives `missing_in_processor`, `missing_in_db`,
//!   `amount_mismatches` and `failed_payments`
//!
//! Amounts are exact decimals via `rust_decimal`; malformed dates and missing
//! status columns are reported as findings instead of aborting the run.
//!
//! ## Example
//!
//! ```
//! use ledger_recon::{ReconOptions, Reconciler, RecordSet, Value};
//!
//! let cols = |c: &[&str]| c.iter().map(|s| s.to_string()).collect::<Vec<_>>();
//! let ledger = RecordSet::from_rows(
//!     cols(&["transaction_id", "amount"]),
//!     vec![vec![Value::from_cell("T1"), Value::from_cell("100.00")]],
//! ).unwrap();
//! let report = RecordSet::from_rows(
//!     cols(&["transaction_id", "amount", "status"]),
//!     vec![vec![Value::from_cell("T1"), Value::from_cell("100"), Value::from_cell("completed")]],
//! ).unwrap();
//!
//! let recon = Reconciler::new(ReconOptions::default())
//!     .reconcile(&ledger, &report)
//!     .unwrap();
//! assert_eq!(recon.summary.total_discrepancies(), 0);
//! ```

pub mod alert;
pub mod amount;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod quality;
pub mod record;
pub mod report;
pub mod source;
pub mod workflow;

pub use amount::Amount;
pub use classify::{BucketKind, ClassifyOptions, Discrepancies};
pub use config::{Config, Overrides, Settings};
pub use engine::{ReconOptions, ReconSummary, Reconciler, Reconciliation};
pub use error::{ErrorKind, ReconError, Result};
pub use matcher::{JoinOptions, JoinedSet, Provenance};
pub use normalize::NormalizeOptions;
pub use quality::Finding;
pub use record::{RecordSet, Side, Value};
pub use workflow::{run, RunOutcome};
