//! Transaction workflow engine
//!
//! Drives each group through the ledger: Built → OrderCreated →
//! Confirmed → Delivered → Invoiced → Posted → Paid|Voided. Every group
//! runs inside its own savepoint; a failed group is rolled back and the
//! batch continues, except for the run-fatal classes listed in
//! [`ImportError::aborts_run`].

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::config::ImportOptions;
use crate::ledger::{
    Customer, FiscalStamp, Invoice, JournalKind, Ledger, OrderDraft, OrderLineDraft, PaymentDraft,
    Product, RecordId,
};

use super::error::ImportError;
use super::group;
use super::report::{GroupOutcome, ImportReport};
use super::sheet::RawRow;
use super::types::{LineItem, TransactionGroup};

/// States a group moves through, in order. Every ledger step requires
/// the state its predecessor established; `Delivered` is reached even
/// when the order produced no deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Built,
    OrderCreated,
    Confirmed,
    Delivered,
    Invoiced,
    Posted,
    Paid,
    Voided,
}

pub struct Importer<'a, L: Ledger> {
    ledger: &'a L,
    options: &'a ImportOptions,
}

impl<'a, L: Ledger> Importer<'a, L> {
    pub fn new(ledger: &'a L, options: &'a ImportOptions) -> Self {
        Self { ledger, options }
    }

    /// Process every group in worksheet order, one savepoint per group.
    ///
    /// Later groups see the customers and products created by earlier
    /// ones; a rolled-back group leaves them untouched.
    pub async fn run(
        &self,
        groups: &IndexMap<String, Vec<RawRow>>,
    ) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport::new();

        for (reference, rows) in groups {
            let group = match group::build_group(reference, rows) {
                Ok(Some(group)) => group,
                Ok(None) => {
                    info!("{reference}: no resolvable lines, skipped");
                    report.record_skipped(reference);
                    continue;
                }
                Err(error) => {
                    warn!("{reference}: {error}");
                    report.record_failure(reference, &error);
                    continue;
                }
            };

            let savepoint = self.ledger.begin().await?;
            match self.process_group(&group).await {
                Ok(outcome) => {
                    self.ledger.commit(savepoint).await?;
                    report.record_outcome(&group.reference, outcome);
                }
                Err(error) if error.aborts_run() => {
                    self.ledger.rollback(savepoint).await?;
                    return Err(error);
                }
                Err(error) => {
                    self.ledger.rollback(savepoint).await?;
                    warn!("{}: {error}", group.reference);
                    report.record_failure(&group.reference, &error);
                }
            }
        }

        Ok(report)
    }

    /// Run one group through the full workflow. On error the caller rolls
    /// the savepoint back, so partial writes never survive.
    async fn process_group(&self, group: &TransactionGroup) -> Result<GroupOutcome, ImportError> {
        let mut state = WorkflowState::Built;
        debug!(
            "{}: processing {} lines ({state:?})",
            group.reference,
            group.lines.len()
        );

        let customer = self.resolve_customer(group).await?;

        let mut lines = Vec::with_capacity(group.lines.len());
        for item in &group.lines {
            let product = self.resolve_product(item).await?;
            lines.push(OrderLineDraft {
                product: product.id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                discount_pct: item.discount_pct,
            });
        }

        let sales_journal = self
            .ledger
            .find_journal(&group.journal_name, &[JournalKind::Sale])
            .await?
            .ok_or_else(|| ImportError::JournalNotFound {
                name: group.journal_name.clone(),
            })?;

        let order = self
            .ledger
            .create_order(&OrderDraft {
                customer: customer.id,
                journal: sales_journal.id,
                date: group.date,
                reference: group.reference.clone(),
                lines,
            })
            .await?;
        self.advance(group, &mut state, WorkflowState::OrderCreated);

        self.ledger.confirm_order(order.id).await?;
        self.advance(group, &mut state, WorkflowState::Confirmed);

        for delivery in self.ledger.pending_deliveries(order.id).await? {
            self.ledger.confirm_delivery(delivery.id).await?;
            self.ledger.reserve_delivery(delivery.id).await?;
            for stock_move in &delivery.moves {
                if stock_move.fulfilled == 0.0 {
                    self.ledger
                        .set_move_fulfilled(stock_move.id, stock_move.requested)
                        .await?;
                }
            }
            // Only certified sales actually left the warehouse.
            if group.is_certified() {
                self.ledger.validate_delivery(delivery.id).await?;
            }
        }
        self.advance(group, &mut state, WorkflowState::Delivered);

        let invoice = self.ledger.create_invoice_from_order(order.id).await?;
        let stamp = FiscalStamp {
            uuid: group.reference.clone(),
            number: group.fel_number.clone(),
            series: group.fel_series.clone(),
        };
        self.ledger.stamp_invoice(invoice.id, &stamp, group.date).await?;
        self.advance(group, &mut state, WorkflowState::Invoiced);

        let invoice = self.ledger.post_invoice(invoice.id).await?;
        self.advance(group, &mut state, WorkflowState::Posted);

        if group.is_certified() {
            self.pay_and_reconcile(group, &customer, &invoice).await?;
            self.advance(group, &mut state, WorkflowState::Paid);
            info!(
                "{}: posted and paid {:.2}",
                group.reference, invoice.amount_total
            );
            Ok(GroupOutcome::Paid)
        } else {
            self.ledger.void_invoice(invoice.id).await?;
            self.ledger.cancel_order(order.id).await?;
            self.advance(group, &mut state, WorkflowState::Voided);
            info!(
                "{}: status {:?} is not certified, voided",
                group.reference, group.status_flag
            );
            Ok(GroupOutcome::Voided)
        }
    }

    /// Record a state transition; steps only run off the state their
    /// predecessor established.
    fn advance(&self, group: &TransactionGroup, state: &mut WorkflowState, next: WorkflowState) {
        debug!("{}: {state:?} -> {next:?}", group.reference);
        *state = next;
    }

    /// Find the group's customer by tax id (by name when the row has no
    /// tax id), creating a minimal sales counterpart on a miss. The query
    /// runs immediately before the create, so repeated resolution of the
    /// same key within a run never duplicates.
    async fn resolve_customer(&self, group: &TransactionGroup) -> Result<Customer, ImportError> {
        let found = match group.customer_tax_id.as_deref() {
            Some(tax_id) => self.ledger.find_customer_by_tax_id(tax_id).await?,
            None => self.ledger.find_customer_by_name(&group.customer_name).await?,
        };
        if let Some(customer) = found {
            return Ok(customer);
        }

        if group.customer_name.is_empty() {
            return Err(ImportError::CustomerResolution {
                reference: group.reference.clone(),
                message: "row has neither a known tax id nor a customer name".to_string(),
            });
        }

        debug!("{}: creating customer {}", group.reference, group.customer_name);
        self.ledger
            .create_customer(&group.customer_name, group.customer_tax_id.as_deref())
            .await
            .map_err(|e| ImportError::CustomerResolution {
                reference: group.reference.clone(),
                message: e.to_string(),
            })
    }

    /// Find a line's product by code, creating it with the configured
    /// default kind on a miss.
    async fn resolve_product(&self, item: &LineItem) -> Result<Product, ImportError> {
        if let Some(product) = self.ledger.find_product_by_code(&item.product_code).await? {
            return Ok(product);
        }

        debug!("creating product {} ({})", item.product_code, item.product_name);
        self.ledger
            .create_product(
                &item.product_code,
                &item.product_name,
                self.options.default_product_kind,
            )
            .await
            .map_err(|e| ImportError::ProductResolution {
                code: item.product_code.clone(),
                message: e.to_string(),
            })
    }

    /// Register an inbound payment for the posted invoice total and
    /// reconcile it against the invoice's receivable line.
    async fn pay_and_reconcile(
        &self,
        group: &TransactionGroup,
        customer: &Customer,
        invoice: &Invoice,
    ) -> Result<(), ImportError> {
        let journal_name = group.payment_journal_name(&self.options.payment_journal_separator);
        let journal = self
            .ledger
            .find_journal(&journal_name, &[JournalKind::Bank, JournalKind::Cash])
            .await?
            .ok_or(ImportError::PaymentJournalNotFound { name: journal_name })?;

        let payment = self
            .ledger
            .create_payment(&PaymentDraft {
                customer: customer.id,
                journal: journal.id,
                amount: invoice.amount_total,
                date: group.date,
            })
            .await?;
        self.ledger.post_payment(payment.id).await?;

        let invoice_lines = self.ledger.invoice_lines(invoice.id).await?;
        let receivable_account = invoice_lines
            .iter()
            .find(|line| line.receivable)
            .map(|line| line.account)
            .ok_or_else(|| {
                ImportError::Ledger(crate::ledger::LedgerError::Protocol(format!(
                    "posted invoice {} has no receivable line",
                    invoice.id
                )))
            })?;

        let payment_lines = self.ledger.payment_lines(payment.id).await?;
        let to_reconcile: Vec<RecordId> = invoice_lines
            .iter()
            .chain(payment_lines.iter())
            .filter(|line| line.account == receivable_account && !line.reconciled)
            .map(|line| line.id)
            .collect();

        self.ledger.reconcile(&to_reconcile).await?;
        Ok(())
    }
}
