//! In-memory ledger used by the workflow tests
//!
//! Honors the same savepoint contract as the remote service by cloning
//! the whole state on `begin` and restoring the clone on `rollback`, so a
//! rolled-back group leaves no trace while earlier commits stay visible.
//! Posting synthesizes receivable/income/liquidity journal items with
//! fixed account ids, which is all the reconciliation step looks at.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::backend::{Ledger, LedgerError, Savepoint};
use super::models::{
    Customer, Delivery, DeliveryState, FiscalStamp, Invoice, InvoiceState, Journal, JournalKind,
    LedgerLine, OrderDraft, OrderLineDraft, OrderState, Payment, PaymentDraft, PaymentState,
    Product, ProductKind, RecordId, SalesOrder, StockMove,
};

pub const ACCOUNT_RECEIVABLE: RecordId = 1;
pub const ACCOUNT_INCOME: RecordId = 2;
pub const ACCOUNT_LIQUIDITY: RecordId = 3;

#[derive(Debug, Clone)]
struct OrderRecord {
    order: SalesOrder,
    customer: RecordId,
    #[allow(dead_code)]
    journal: RecordId,
    date: NaiveDate,
    lines: Vec<OrderLineDraft>,
}

#[derive(Debug, Clone)]
struct DeliveryRecord {
    delivery: Delivery,
    order: RecordId,
}

#[derive(Debug, Clone)]
struct InvoiceRecord {
    invoice: Invoice,
    order: RecordId,
    #[allow(dead_code)]
    customer: RecordId,
    stamp: Option<FiscalStamp>,
    date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
struct PaymentRecord {
    payment: Payment,
    #[allow(dead_code)]
    customer: RecordId,
    journal: RecordId,
    date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOwner {
    Invoice(RecordId),
    Payment(RecordId),
}

#[derive(Debug, Clone)]
struct LineRecord {
    line: LedgerLine,
    owner: LineOwner,
}

#[derive(Debug, Clone, Default)]
struct State {
    next_id: RecordId,
    journals: Vec<Journal>,
    customers: Vec<Customer>,
    products: Vec<Product>,
    orders: Vec<OrderRecord>,
    deliveries: Vec<DeliveryRecord>,
    invoices: Vec<InvoiceRecord>,
    payments: Vec<PaymentRecord>,
    lines: Vec<LineRecord>,
}

impl State {
    fn take_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    fn order_mut(&mut self, id: RecordId) -> Result<&mut OrderRecord, LedgerError> {
        self.orders
            .iter_mut()
            .find(|o| o.order.id == id)
            .ok_or_else(|| LedgerError::Rejected(format!("unknown order {id}")))
    }

    fn delivery_mut(&mut self, id: RecordId) -> Result<&mut DeliveryRecord, LedgerError> {
        self.deliveries
            .iter_mut()
            .find(|d| d.delivery.id == id)
            .ok_or_else(|| LedgerError::Rejected(format!("unknown delivery {id}")))
    }

    fn invoice_mut(&mut self, id: RecordId) -> Result<&mut InvoiceRecord, LedgerError> {
        self.invoices
            .iter_mut()
            .find(|i| i.invoice.id == id)
            .ok_or_else(|| LedgerError::Rejected(format!("unknown invoice {id}")))
    }

    fn payment_mut(&mut self, id: RecordId) -> Result<&mut PaymentRecord, LedgerError> {
        self.payments
            .iter_mut()
            .find(|p| p.payment.id == id)
            .ok_or_else(|| LedgerError::Rejected(format!("unknown payment {id}")))
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    savepoints: Vec<(u64, State)>,
    next_savepoint: u64,
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_journal(&self, name: &str, kind: JournalKind) -> Journal {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.state.take_id();
        let journal = Journal {
            id,
            name: name.to_string(),
            kind,
        };
        inner.state.journals.push(journal.clone());
        journal
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.inner.lock().unwrap().state.customers.clone()
    }

    pub fn products(&self) -> Vec<Product> {
        self.inner.lock().unwrap().state.products.clone()
    }

    pub fn orders(&self) -> Vec<SalesOrder> {
        let inner = self.inner.lock().unwrap();
        inner.state.orders.iter().map(|o| o.order.clone()).collect()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        let inner = self.inner.lock().unwrap();
        inner
            .state
            .deliveries
            .iter()
            .map(|d| d.delivery.clone())
            .collect()
    }

    pub fn invoices(&self) -> Vec<Invoice> {
        let inner = self.inner.lock().unwrap();
        inner
            .state
            .invoices
            .iter()
            .map(|i| i.invoice.clone())
            .collect()
    }

    pub fn payments(&self) -> Vec<Payment> {
        let inner = self.inner.lock().unwrap();
        inner
            .state
            .payments
            .iter()
            .map(|p| p.payment.clone())
            .collect()
    }

    pub fn invoice_stamp(&self, invoice: RecordId) -> Option<FiscalStamp> {
        let inner = self.inner.lock().unwrap();
        inner
            .state
            .invoices
            .iter()
            .find(|i| i.invoice.id == invoice)
            .and_then(|i| i.stamp.clone())
    }

    pub fn order_date(&self, order: RecordId) -> Option<NaiveDate> {
        let inner = self.inner.lock().unwrap();
        inner
            .state
            .orders
            .iter()
            .find(|o| o.order.id == order)
            .map(|o| o.date)
    }

    pub fn invoice_date(&self, invoice: RecordId) -> Option<NaiveDate> {
        let inner = self.inner.lock().unwrap();
        inner
            .state
            .invoices
            .iter()
            .find(|i| i.invoice.id == invoice)
            .and_then(|i| i.date)
    }

    /// Journal and date the payment was registered with.
    pub fn payment_booking(&self, payment: RecordId) -> Option<(RecordId, NaiveDate)> {
        let inner = self.inner.lock().unwrap();
        inner
            .state
            .payments
            .iter()
            .find(|p| p.payment.id == payment)
            .map(|p| (p.journal, p.date))
    }

    pub fn lines_for_invoice(&self, invoice: RecordId) -> Vec<LedgerLine> {
        let inner = self.inner.lock().unwrap();
        inner
            .state
            .lines
            .iter()
            .filter(|l| l.owner == LineOwner::Invoice(invoice))
            .map(|l| l.line.clone())
            .collect()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn begin(&self) -> Result<Savepoint, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_savepoint += 1;
        let id = inner.next_savepoint;
        let snapshot = inner.state.clone();
        inner.savepoints.push((id, snapshot));
        Ok(Savepoint(id))
    }

    async fn commit(&self, savepoint: Savepoint) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let position = inner
            .savepoints
            .iter()
            .position(|(id, _)| *id == savepoint.0)
            .ok_or_else(|| LedgerError::Rejected(format!("unknown savepoint {}", savepoint.0)))?;
        inner.savepoints.truncate(position);
        Ok(())
    }

    async fn rollback(&self, savepoint: Savepoint) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let position = inner
            .savepoints
            .iter()
            .position(|(id, _)| *id == savepoint.0)
            .ok_or_else(|| LedgerError::Rejected(format!("unknown savepoint {}", savepoint.0)))?;
        let (_, snapshot) = inner.savepoints.remove(position);
        inner.savepoints.truncate(position);
        inner.state = snapshot;
        Ok(())
    }

    async fn find_journal(
        &self,
        name: &str,
        kinds: &[JournalKind],
    ) -> Result<Option<Journal>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .state
            .journals
            .iter()
            .find(|j| j.name == name && kinds.contains(&j.kind))
            .cloned())
    }

    async fn find_customer_by_tax_id(
        &self,
        tax_id: &str,
    ) -> Result<Option<Customer>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .state
            .customers
            .iter()
            .find(|c| c.tax_id.as_deref() == Some(tax_id))
            .cloned())
    }

    async fn find_customer_by_name(&self, name: &str) -> Result<Option<Customer>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .state
            .customers
            .iter()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn create_customer(
        &self,
        name: &str,
        tax_id: Option<&str>,
    ) -> Result<Customer, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.state.take_id();
        let customer = Customer {
            id,
            name: name.to_string(),
            tax_id: tax_id.map(str::to_string),
        };
        inner.state.customers.push(customer.clone());
        Ok(customer)
    }

    async fn find_product_by_code(&self, code: &str) -> Result<Option<Product>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .state
            .products
            .iter()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn create_product(
        &self,
        code: &str,
        name: &str,
        kind: ProductKind,
    ) -> Result<Product, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.state.take_id();
        let product = Product {
            id,
            code: code.to_string(),
            name: name.to_string(),
            kind,
        };
        inner.state.products.push(product.clone());
        Ok(product)
    }

    async fn create_order(&self, draft: &OrderDraft) -> Result<SalesOrder, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.state.journals.iter().any(|j| j.id == draft.journal) {
            return Err(LedgerError::Rejected(format!(
                "unknown journal {}",
                draft.journal
            )));
        }
        let id = inner.state.take_id();
        let order = SalesOrder {
            id,
            reference: draft.reference.clone(),
            state: OrderState::Draft,
        };
        inner.state.orders.push(OrderRecord {
            order: order.clone(),
            customer: draft.customer,
            journal: draft.journal,
            date: draft.date,
            lines: draft.lines.clone(),
        });
        Ok(order)
    }

    async fn confirm_order(&self, order: RecordId) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let state = &mut inner.state;

        let record = state.order_mut(order)?;
        if record.order.state != OrderState::Draft {
            return Err(LedgerError::Rejected(format!(
                "order {order} is not a draft"
            )));
        }
        record.order.state = OrderState::Confirmed;
        let lines = record.lines.clone();

        // The real service materializes a delivery for storable lines.
        let mut moves = Vec::new();
        for line in &lines {
            let storable = state
                .products
                .iter()
                .any(|p| p.id == line.product && p.kind == ProductKind::Storable);
            if storable {
                let id = state.take_id();
                moves.push(StockMove {
                    id,
                    product: line.product,
                    requested: line.quantity,
                    fulfilled: 0.0,
                });
            }
        }
        if !moves.is_empty() {
            let id = state.take_id();
            state.deliveries.push(DeliveryRecord {
                delivery: Delivery {
                    id,
                    state: DeliveryState::Pending,
                    moves,
                },
                order,
            });
        }
        Ok(())
    }

    async fn cancel_order(&self, order: RecordId) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.state.order_mut(order)?;
        record.order.state = OrderState::Cancelled;
        Ok(())
    }

    async fn pending_deliveries(&self, order: RecordId) -> Result<Vec<Delivery>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .state
            .deliveries
            .iter()
            .filter(|d| d.order == order && d.delivery.state != DeliveryState::Done)
            .map(|d| d.delivery.clone())
            .collect())
    }

    async fn confirm_delivery(&self, delivery: RecordId) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.state.delivery_mut(delivery)?;
        if record.delivery.state == DeliveryState::Done {
            return Err(LedgerError::Rejected(format!(
                "delivery {delivery} is already done"
            )));
        }
        record.delivery.state = DeliveryState::Confirmed;
        Ok(())
    }

    async fn reserve_delivery(&self, delivery: RecordId) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.state.delivery_mut(delivery)?;
        if record.delivery.state == DeliveryState::Done {
            return Err(LedgerError::Rejected(format!(
                "delivery {delivery} is already done"
            )));
        }
        record.delivery.state = DeliveryState::Reserved;
        Ok(())
    }

    async fn set_move_fulfilled(
        &self,
        stock_move: RecordId,
        quantity: f64,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        for record in &mut inner.state.deliveries {
            if let Some(found) = record
                .delivery
                .moves
                .iter_mut()
                .find(|m| m.id == stock_move)
            {
                found.fulfilled = quantity;
                return Ok(());
            }
        }
        Err(LedgerError::Rejected(format!(
            "unknown stock move {stock_move}"
        )))
    }

    async fn validate_delivery(&self, delivery: RecordId) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.state.delivery_mut(delivery)?;
        if record.delivery.moves.iter().any(|m| m.fulfilled == 0.0) {
            return Err(LedgerError::Rejected(format!(
                "delivery {delivery} has unfulfilled moves"
            )));
        }
        record.delivery.state = DeliveryState::Done;
        Ok(())
    }

    async fn create_invoice_from_order(&self, order: RecordId) -> Result<Invoice, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let state = &mut inner.state;

        if state.invoices.iter().any(|i| i.order == order) {
            return Err(LedgerError::Rejected(format!(
                "order {order} is already invoiced"
            )));
        }

        let record = state.order_mut(order)?;
        if record.order.state != OrderState::Confirmed {
            return Err(LedgerError::Rejected(format!(
                "order {order} is not confirmed"
            )));
        }
        let customer = record.customer;
        let amount_total: f64 = record
            .lines
            .iter()
            .map(|l| l.quantity * l.unit_price * (1.0 - l.discount_pct / 100.0))
            .sum();

        let id = state.take_id();
        let invoice = Invoice {
            id,
            state: InvoiceState::Draft,
            amount_total,
        };
        state.invoices.push(InvoiceRecord {
            invoice: invoice.clone(),
            order,
            customer,
            stamp: None,
            date: None,
        });
        Ok(invoice)
    }

    async fn stamp_invoice(
        &self,
        invoice: RecordId,
        stamp: &FiscalStamp,
        date: NaiveDate,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.state.invoice_mut(invoice)?;
        if record.invoice.state != InvoiceState::Draft {
            return Err(LedgerError::Rejected(format!(
                "invoice {invoice} is not a draft"
            )));
        }
        record.stamp = Some(stamp.clone());
        record.date = Some(date);
        Ok(())
    }

    async fn post_invoice(&self, invoice: RecordId) -> Result<Invoice, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let state = &mut inner.state;

        let record = state.invoice_mut(invoice)?;
        if record.invoice.state != InvoiceState::Draft {
            return Err(LedgerError::Rejected(format!(
                "invoice {invoice} is not a draft"
            )));
        }
        record.invoice.state = InvoiceState::Posted;
        let posted = record.invoice.clone();

        for (account, receivable) in [(ACCOUNT_RECEIVABLE, true), (ACCOUNT_INCOME, false)] {
            let id = state.take_id();
            state.lines.push(LineRecord {
                line: LedgerLine {
                    id,
                    account,
                    receivable,
                    reconciled: false,
                },
                owner: LineOwner::Invoice(invoice),
            });
        }
        Ok(posted)
    }

    async fn void_invoice(&self, invoice: RecordId) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let state = &mut inner.state;

        let record = state.invoice_mut(invoice)?;
        if record.invoice.state != InvoiceState::Posted {
            return Err(LedgerError::Rejected(format!(
                "invoice {invoice} is not posted"
            )));
        }
        record.invoice.state = InvoiceState::Cancelled;
        state
            .lines
            .retain(|l| l.owner != LineOwner::Invoice(invoice));
        Ok(())
    }

    async fn create_payment(&self, draft: &PaymentDraft) -> Result<Payment, LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let valid_journal = inner.state.journals.iter().any(|j| {
            j.id == draft.journal && matches!(j.kind, JournalKind::Bank | JournalKind::Cash)
        });
        if !valid_journal {
            return Err(LedgerError::Rejected(format!(
                "journal {} cannot receive payments",
                draft.journal
            )));
        }
        let id = inner.state.take_id();
        let payment = Payment {
            id,
            state: PaymentState::Draft,
            amount: draft.amount,
        };
        inner.state.payments.push(PaymentRecord {
            payment: payment.clone(),
            customer: draft.customer,
            journal: draft.journal,
            date: draft.date,
        });
        Ok(payment)
    }

    async fn post_payment(&self, payment: RecordId) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let state = &mut inner.state;

        let record = state.payment_mut(payment)?;
        if record.payment.state != PaymentState::Draft {
            return Err(LedgerError::Rejected(format!(
                "payment {payment} is not a draft"
            )));
        }
        record.payment.state = PaymentState::Posted;

        for (account, receivable) in [(ACCOUNT_RECEIVABLE, true), (ACCOUNT_LIQUIDITY, false)] {
            let id = state.take_id();
            state.lines.push(LineRecord {
                line: LedgerLine {
                    id,
                    account,
                    receivable,
                    reconciled: false,
                },
                owner: LineOwner::Payment(payment),
            });
        }
        Ok(())
    }

    async fn invoice_lines(&self, invoice: RecordId) -> Result<Vec<LedgerLine>, LedgerError> {
        Ok(self.lines_for_invoice(invoice))
    }

    async fn payment_lines(&self, payment: RecordId) -> Result<Vec<LedgerLine>, LedgerError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .state
            .lines
            .iter()
            .filter(|l| l.owner == LineOwner::Payment(payment))
            .map(|l| l.line.clone())
            .collect())
    }

    async fn reconcile(&self, lines: &[RecordId]) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        let state = &mut inner.state;

        let mut account = None;
        for id in lines {
            let record = state
                .lines
                .iter()
                .find(|l| l.line.id == *id)
                .ok_or_else(|| LedgerError::Rejected(format!("unknown ledger line {id}")))?;
            if record.line.reconciled {
                return Err(LedgerError::Rejected(format!(
                    "ledger line {id} is already reconciled"
                )));
            }
            match account {
                None => account = Some(record.line.account),
                Some(expected) if expected != record.line.account => {
                    return Err(LedgerError::Rejected(
                        "cannot reconcile lines across accounts".to_string(),
                    ));
                }
                Some(_) => {}
            }
        }

        for record in &mut state.lines {
            if lines.contains(&record.line.id) {
                record.line.reconciled = true;
            }
        }
        Ok(())
    }
}
