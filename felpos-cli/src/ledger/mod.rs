//! Client surface onto the external ledger system
//!
//! `backend::Ledger` is the narrow contract the import workflow drives;
//! `rpc::RpcLedger` implements it over JSON-RPC. The in-memory
//! implementation in `memory` backs the test suite.

pub mod backend;
#[cfg(test)]
pub mod memory;
pub mod models;
pub mod rpc;

pub use backend::{Ledger, LedgerError, Savepoint};
pub use models::{
    Customer, Delivery, DeliveryState, FiscalStamp, Invoice, InvoiceState, Journal, JournalKind,
    LedgerLine, OrderDraft, OrderLineDraft, OrderState, Payment, PaymentDraft, PaymentState,
    Product, ProductKind, RecordId, SalesOrder, StockMove,
};
pub use rpc::RpcLedger;
