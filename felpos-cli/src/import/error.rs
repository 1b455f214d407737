//! Error taxonomy for the import pipeline

use thiserror::Error;

use crate::ledger::LedgerError;

/// Failures raised by the import pipeline.
///
/// Variants split into run-fatal failures (unreadable workbook, nothing
/// to import, misconfigured sales journal) and per-group failures that
/// roll back one transaction and let the batch continue. Messages carry
/// the offending value so the user can find the row, never wire detail.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The workbook could not be opened or has no usable sheet.
    #[error("could not read workbook: {0}")]
    Workbook(String),

    /// No row carried a grouping reference.
    #[error("the file contains no groupable sales rows")]
    EmptyInput,

    /// A date cell held a non-empty value in none of the accepted encodings.
    #[error("unrecognized date value: {value}")]
    MalformedDate { value: String },

    /// A group's header row has no date at all.
    #[error("transaction {reference} has no date")]
    MissingDate { reference: String },

    /// The sales journal named in the file does not exist.
    #[error("no sales journal named: {name}")]
    JournalNotFound { name: String },

    /// The composite payment journal is not a known bank/cash journal.
    #[error("no bank or cash journal named: {name}")]
    PaymentJournalNotFound { name: String },

    #[error("could not resolve customer for {reference}: {message}")]
    CustomerResolution { reference: String, message: String },

    #[error("could not resolve product {code}: {message}")]
    ProductResolution { code: String, message: String },

    /// The ledger backend failed mid-group.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ImportError {
    /// Whether this failure aborts the whole run instead of skipping the
    /// offending group. See DESIGN.md for the policy split.
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            Self::Workbook(_) | Self::EmptyInput | Self::JournalNotFound { .. }
        )
    }
}
