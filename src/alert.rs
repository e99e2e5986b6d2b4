//! Failure alerting.
//!
//! Alerts are delivered synchronously at the point of failure. The spool
//! alerter hands each message to a durable outbox directory that a mail
//! transfer agent drains, so a process exit cannot drop a queued alert.
//! Delivery problems are logged and never returned to the caller.

use chrono::Local;
use log::{error, info, warn};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A notification about a failed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum AlertError {
    /// The outbox could not be written
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No recipients are configured
    #[error("no alert recipients configured")]
    NoRecipients,
}

/// A delivery channel for alerts.
pub trait Alerter {
    fn send(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Writes alerts to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlerter;

impl Alerter for LogAlerter {
    fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        error!("ALERT: {}\n{}", alert.subject, alert.body);
        Ok(())
    }
}

/// Queues RFC 5322 messages in an outbox directory.
#[derive(Debug, Clone)]
pub struct SpoolAlerter {
    pub sender: String,
    pub recipients: Vec<String>,
    pub spool_dir: PathBuf,
}

impl SpoolAlerter {
    /// Renders the message exactly as it is written to the outbox.
    pub fn render(&self, alert: &Alert) -> String {
        let mut message = String::new();
        message.push_str(&format!("From: {}\r\n", header_value(&self.sender)));
        message.push_str(&format!(
            "To: {}\r\n",
            header_value(&self.recipients.join(", "))
        ));
        message.push_str(&format!("Subject: {}\r\n", header_value(&alert.subject)));
        message.push_str(&format!("Date: {}\r\n", Local::now().to_rfc2822()));
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
        for line in alert.body.lines() {
            message.push_str(line);
            message.push_str("\r\n");
        }
        message
    }
}

impl Alerter for SpoolAlerter {
    fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        if self.recipients.is_empty() {
            return Err(AlertError::NoRecipients);
        }
        fs::create_dir_all(&self.spool_dir)?;

        let name = format!(
            "{}-{}",
            Local::now().format("%Y%m%dT%H%M%S%.9f"),
            std::process::id()
        );
        let tmp = self.spool_dir.join(format!("{}.eml.tmp", name));
        let path = self.spool_dir.join(format!("{}.eml", name));

        fs::write(&tmp, self.render(alert))?;
        fs::rename(&tmp, &path)?;
        info!("Alert queued for {}: {}", self.recipients.join(", "), path.display());
        Ok(())
    }
}

/// Sends an alert, logging (never returning) any delivery failure.
///
/// Returns whether the alert was handed off.
pub fn notify(alerter: &dyn Alerter, subject: &str, body: &str) -> bool {
    let alert = Alert {
        subject: subject.to_string(),
        body: body.to_string(),
    };
    info!("Sending alert: {}", alert.subject);
    match alerter.send(&alert) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to deliver alert '{}': {}", alert.subject, e);
            false
        }
    }
}

/// Header values are single-line.
fn header_value(value: &str) -> String {
    value.replace(&['\r', '\n'][..], " ")
}
