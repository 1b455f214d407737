//! Aggregated outcome of one import run

use serde::Serialize;

use super::error::ImportError;

/// Terminal state of one successfully processed group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOutcome {
    /// Posted, paid and reconciled.
    Paid,
    /// Imported for the audit trail, then voided (invoice cancelled,
    /// order cancelled, no payment).
    Voided,
}

/// Severity of the user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupFailure {
    pub reference: String,
    pub message: String,
}

/// The single notification surfaced to the invoking shell.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

/// Per-run tally the CLI renders for the user.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub paid: Vec<String>,
    pub voided: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<GroupFailure>,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&mut self, reference: &str, outcome: GroupOutcome) {
        match outcome {
            GroupOutcome::Paid => self.paid.push(reference.to_string()),
            GroupOutcome::Voided => self.voided.push(reference.to_string()),
        }
    }

    pub fn record_skipped(&mut self, reference: &str) {
        self.skipped.push(reference.to_string());
    }

    pub fn record_failure(&mut self, reference: &str, error: &ImportError) {
        self.failed.push(GroupFailure {
            reference: reference.to_string(),
            message: error.to_string(),
        });
    }

    pub fn succeeded(&self) -> usize {
        self.paid.len() + self.voided.len()
    }

    /// Collapse the run into the single notification shown to the user.
    pub fn notification(&self) -> Notification {
        let severity = if self.failed.is_empty() {
            Severity::Success
        } else if self.succeeded() > 0 {
            Severity::Warning
        } else {
            Severity::Danger
        };

        let title = match severity {
            Severity::Success => "Import complete",
            Severity::Warning => "Import finished with failures",
            Severity::Danger => "Import failed",
        };

        Notification {
            title: title.to_string(),
            message: format!(
                "{} paid, {} voided, {} skipped, {} failed",
                self.paid.len(),
                self.voided.len(),
                self.skipped.len(),
                self.failed.len(),
            ),
            severity,
        }
    }
}
