//! Narrow interface onto the external ledger system
//!
//! The importer only ever needs these operations; double-entry posting,
//! the reconciliation engine and stock validation all stay on the other
//! side of this trait. `RpcLedger` implements it against the remote
//! service; the test suite substitutes an in-memory implementation with
//! the same savepoint contract.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use super::models::{
    Customer, Delivery, FiscalStamp, Invoice, Journal, JournalKind, LedgerLine, OrderDraft,
    Payment, PaymentDraft, Product, ProductKind, RecordId, SalesOrder,
};

/// Failure at the ledger boundary.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The service could not be reached.
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// The service understood the request and refused it.
    #[error("ledger rejected the request: {0}")]
    Rejected(String),

    /// The service answered with something the client cannot decode.
    #[error("unexpected ledger response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

/// Token for a group-scoped transaction on the ledger side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint(pub u64);

/// The collaborator surface the workflow engine drives.
///
/// Groups are processed strictly one at a time, so implementations only
/// ever see one open savepoint per importer run. `rollback` must undo
/// every write made since the matching `begin` and nothing else.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Open a savepoint covering one transaction group's writes.
    async fn begin(&self) -> Result<Savepoint, LedgerError>;
    async fn commit(&self, savepoint: Savepoint) -> Result<(), LedgerError>;
    /// Undo every write made since `savepoint` was opened.
    async fn rollback(&self, savepoint: Savepoint) -> Result<(), LedgerError>;

    /// Exact-name journal lookup restricted to the given kinds.
    async fn find_journal(
        &self,
        name: &str,
        kinds: &[JournalKind],
    ) -> Result<Option<Journal>, LedgerError>;

    async fn find_customer_by_tax_id(&self, tax_id: &str)
    -> Result<Option<Customer>, LedgerError>;
    async fn find_customer_by_name(&self, name: &str) -> Result<Option<Customer>, LedgerError>;
    /// Create a minimal customer record marked as a sales counterpart.
    async fn create_customer(
        &self,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Customer, LedgerError>;

    async fn find_product_by_code(&self, code: &str) -> Result<Option<Product>, LedgerError>;
    async fn create_product(
        &self,
        code: &str,
        name: &str,
        kind: ProductKind,
    ) -> Result<Product, LedgerError>;

    async fn create_order(&self, draft: &OrderDraft) -> Result<SalesOrder, LedgerError>;
    /// Confirm the order; the ledger materializes any stock deliveries.
    async fn confirm_order(&self, order: RecordId) -> Result<(), LedgerError>;
    async fn cancel_order(&self, order: RecordId) -> Result<(), LedgerError>;

    /// Deliveries linked to the order that are not yet validated.
    async fn pending_deliveries(&self, order: RecordId) -> Result<Vec<Delivery>, LedgerError>;
    async fn confirm_delivery(&self, delivery: RecordId) -> Result<(), LedgerError>;
    async fn reserve_delivery(&self, delivery: RecordId) -> Result<(), LedgerError>;
    async fn set_move_fulfilled(
        &self,
        stock_move: RecordId,
        quantity: f64,
    ) -> Result<(), LedgerError>;
    async fn validate_delivery(&self, delivery: RecordId) -> Result<(), LedgerError>;

    async fn create_invoice_from_order(&self, order: RecordId) -> Result<Invoice, LedgerError>;
    /// Write the FEL identifiers and the normalized date onto the draft.
    async fn stamp_invoice(
        &self,
        invoice: RecordId,
        stamp: &FiscalStamp,
        date: NaiveDate,
    ) -> Result<(), LedgerError>;
    /// Post the invoice and return it with its final totals.
    async fn post_invoice(&self, invoice: RecordId) -> Result<Invoice, LedgerError>;
    /// Reset a posted invoice to draft and cancel it.
    async fn void_invoice(&self, invoice: RecordId) -> Result<(), LedgerError>;

    async fn create_payment(&self, draft: &PaymentDraft) -> Result<Payment, LedgerError>;
    async fn post_payment(&self, payment: RecordId) -> Result<(), LedgerError>;

    async fn invoice_lines(&self, invoice: RecordId) -> Result<Vec<LedgerLine>, LedgerError>;
    async fn payment_lines(&self, payment: RecordId) -> Result<Vec<LedgerLine>, LedgerError>;
    /// Reconcile the given open lines against each other.
    async fn reconcile(&self, lines: &[RecordId]) -> Result<(), LedgerError>;
}
