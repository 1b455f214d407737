//! JSON-RPC client for the remote ledger service

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::EnvironmentConfig;

use super::backend::{Ledger, LedgerError, Savepoint};
use super::models::{
    Customer, Delivery, FiscalStamp, Invoice, Journal, JournalKind, LedgerLine, OrderDraft,
    Payment, PaymentDraft, Product, ProductKind, RecordId, SalesOrder,
};

/// Remote ledger over JSON-RPC.
///
/// One logical session per import run: [`RpcLedger::connect`]
/// authenticates with the environment's API key and every subsequent call
/// reuses the returned session token.
pub struct RpcLedger {
    http: reqwest::Client,
    endpoint: String,
    database: String,
    session: String,
    next_request_id: AtomicU64,
}

impl RpcLedger {
    /// Authenticate against `env` and return a ready client.
    pub async fn connect(env: &EnvironmentConfig) -> Result<Self, LedgerError> {
        let mut ledger = Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/jsonrpc", env.url.trim_end_matches('/')),
            database: env.database.clone(),
            session: String::new(),
            next_request_id: AtomicU64::new(1),
        };

        ledger.session = ledger
            .call(
                "session",
                "authenticate",
                json!({
                    "login": env.username,
                    "api_key": env.api_key,
                }),
            )
            .await?;

        log::info!("authenticated against {} as {}", env.url, env.username);
        Ok(ledger)
    }

    /// Perform one JSON-RPC call and decode the `result` field.
    async fn call<T: DeserializeOwned>(
        &self,
        service: &str,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": format!("{service}.{method}"),
            "params": {
                "database": self.database,
                "session": self.session,
                "args": params,
            },
            "id": self.next_request_id.fetch_add(1, Ordering::Relaxed),
        });

        log::debug!("ledger call {service}.{method}");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let envelope: Value = response.json().await?;

        if let Some(error) = envelope.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(LedgerError::Rejected(message.to_string()));
        }

        let result = envelope.get("result").cloned().unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| LedgerError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn begin(&self) -> Result<Savepoint, LedgerError> {
        let id: u64 = self.call("tx", "begin", json!({})).await?;
        Ok(Savepoint(id))
    }

    async fn commit(&self, savepoint: Savepoint) -> Result<(), LedgerError> {
        self.call("tx", "commit", json!({ "savepoint": savepoint.0 }))
            .await
    }

    async fn rollback(&self, savepoint: Savepoint) -> Result<(), LedgerError> {
        self.call("tx", "rollback", json!({ "savepoint": savepoint.0 }))
            .await
    }

    async fn find_journal(
        &self,
        name: &str,
        kinds: &[JournalKind],
    ) -> Result<Option<Journal>, LedgerError> {
        self.call("ledger", "find_journal", json!({ "name": name, "kinds": kinds }))
            .await
    }

    async fn find_customer_by_tax_id(
        &self,
        tax_id: &str,
    ) -> Result<Option<Customer>, LedgerError> {
        self.call("ledger", "find_customer", json!({ "tax_id": tax_id }))
            .await
    }

    async fn find_customer_by_name(&self, name: &str) -> Result<Option<Customer>, LedgerError> {
        self.call("ledger", "find_customer", json!({ "name": name }))
            .await
    }

    async fn create_customer(
        &self,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Customer, LedgerError> {
        self.call(
            "ledger",
            "create_customer",
            json!({ "name": name, "tax_id": tax_id, "customer": true }),
        )
        .await
    }

    async fn find_product_by_code(&self, code: &str) -> Result<Option<Product>, LedgerError> {
        self.call("ledger", "find_product", json!({ "code": code }))
            .await
    }

    async fn create_product(
        &self,
        code: &str,
        name: &str,
        kind: ProductKind,
    ) -> Result<Product, LedgerError> {
        self.call(
            "ledger",
            "create_product",
            json!({ "code": code, "name": name, "kind": kind }),
        )
        .await
    }

    async fn create_order(&self, draft: &OrderDraft) -> Result<SalesOrder, LedgerError> {
        self.call("sales", "create_order", json!(draft)).await
    }

    async fn confirm_order(&self, order: RecordId) -> Result<(), LedgerError> {
        self.call("sales", "confirm_order", json!({ "order": order }))
            .await
    }

    async fn cancel_order(&self, order: RecordId) -> Result<(), LedgerError> {
        self.call("sales", "cancel_order", json!({ "order": order }))
            .await
    }

    async fn pending_deliveries(&self, order: RecordId) -> Result<Vec<Delivery>, LedgerError> {
        self.call("stock", "pending_deliveries", json!({ "order": order }))
            .await
    }

    async fn confirm_delivery(&self, delivery: RecordId) -> Result<(), LedgerError> {
        self.call("stock", "confirm_delivery", json!({ "delivery": delivery }))
            .await
    }

    async fn reserve_delivery(&self, delivery: RecordId) -> Result<(), LedgerError> {
        self.call("stock", "reserve_delivery", json!({ "delivery": delivery }))
            .await
    }

    async fn set_move_fulfilled(
        &self,
        stock_move: RecordId,
        quantity: f64,
    ) -> Result<(), LedgerError> {
        self.call(
            "stock",
            "set_move_fulfilled",
            json!({ "move": stock_move, "quantity": quantity }),
        )
        .await
    }

    async fn validate_delivery(&self, delivery: RecordId) -> Result<(), LedgerError> {
        self.call("stock", "validate_delivery", json!({ "delivery": delivery }))
            .await
    }

    async fn create_invoice_from_order(&self, order: RecordId) -> Result<Invoice, LedgerError> {
        self.call("invoicing", "create_from_order", json!({ "order": order }))
            .await
    }

    async fn stamp_invoice(
        &self,
        invoice: RecordId,
        stamp: &FiscalStamp,
        date: NaiveDate,
    ) -> Result<(), LedgerError> {
        self.call(
            "invoicing",
            "stamp",
            json!({ "invoice": invoice, "stamp": stamp, "date": date }),
        )
        .await
    }

    async fn post_invoice(&self, invoice: RecordId) -> Result<Invoice, LedgerError> {
        self.call("invoicing", "post", json!({ "invoice": invoice }))
            .await
    }

    async fn void_invoice(&self, invoice: RecordId) -> Result<(), LedgerError> {
        self.call("invoicing", "void", json!({ "invoice": invoice }))
            .await
    }

    async fn create_payment(&self, draft: &PaymentDraft) -> Result<Payment, LedgerError> {
        self.call("payments", "create", json!(draft)).await
    }

    async fn post_payment(&self, payment: RecordId) -> Result<(), LedgerError> {
        self.call("payments", "post", json!({ "payment": payment }))
            .await
    }

    async fn invoice_lines(&self, invoice: RecordId) -> Result<Vec<LedgerLine>, LedgerError> {
        self.call("ledger", "invoice_lines", json!({ "invoice": invoice }))
            .await
    }

    async fn payment_lines(&self, payment: RecordId) -> Result<Vec<LedgerLine>, LedgerError> {
        self.call("ledger", "payment_lines", json!({ "payment": payment }))
            .await
    }

    async fn reconcile(&self, lines: &[RecordId]) -> Result<(), LedgerError> {
        self.call("ledger", "reconcile", json!({ "lines": lines }))
            .await
    }
}
