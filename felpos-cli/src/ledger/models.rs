//! Data model for ledger-owned records
//!
//! Everything here is owned by the remote ledger service; the importer
//! only reads these records and, for customers/products, performs
//! at-most-one creation per unmatched natural key within a run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a record inside the ledger service.
pub type RecordId = i64;

/// Journal kinds the importer cares about.
///
/// Sales journals receive the invoices; bank/cash journals receive the
/// payments. Journals are setup data and are never created from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalKind {
    Sale,
    Bank,
    Cash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    pub id: RecordId,
    pub name: String,
    pub kind: JournalKind,
}

/// A sales counterpart, keyed by tax id when one is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: RecordId,
    pub name: String,
    pub tax_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Service,
    Storable,
}

/// A sellable product, keyed by its code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: RecordId,
    pub code: String,
    pub name: String,
    pub kind: ProductKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Draft,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: RecordId,
    /// External reference carried on the order document.
    pub reference: String,
    pub state: OrderState,
}

/// One requested product movement on a delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMove {
    pub id: RecordId,
    pub product: RecordId,
    pub requested: f64,
    pub fulfilled: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Pending,
    Confirmed,
    Reserved,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: RecordId,
    pub state: DeliveryState,
    pub moves: Vec<StockMove>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceState {
    Draft,
    Posted,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: RecordId,
    pub state: InvoiceState,
    pub amount_total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Draft,
    Posted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: RecordId,
    pub state: PaymentState,
    pub amount: f64,
}

/// A journal item. Payments settle against the invoice's receivable line;
/// reconciliation matches lines on the same account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerLine {
    pub id: RecordId,
    pub account: RecordId,
    pub receivable: bool,
    pub reconciled: bool,
}

/// FEL identifiers stamped onto an invoice before posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalStamp {
    /// Certification UUID (also the transaction grouping reference).
    pub uuid: String,
    /// FEL document number.
    pub number: String,
    /// FEL series.
    pub series: String,
}

/// Input for order creation.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDraft {
    pub customer: RecordId,
    /// Sales journal the eventual invoice books into.
    pub journal: RecordId,
    pub date: NaiveDate,
    /// External reference carried through to the order document.
    pub reference: String,
    pub lines: Vec<OrderLineDraft>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLineDraft {
    pub product: RecordId,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_pct: f64,
}

/// Input for registering an inbound customer payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentDraft {
    pub customer: RecordId,
    pub journal: RecordId,
    pub amount: f64,
    pub date: NaiveDate,
}
