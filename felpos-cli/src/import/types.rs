//! Transaction model built from grouped worksheet rows

use chrono::NaiveDate;
use serde::Serialize;

/// Status flag value marking a certified (finalized) sale. Anything else
/// is imported for the audit trail but voided instead of paid.
pub const STATUS_CERTIFIED: &str = "Certificada";

/// One invoiceable sale line within a transaction group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub product_code: String,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_pct: f64,
}

impl LineItem {
    /// Line amount after discount.
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_price * (1.0 - self.discount_pct / 100.0)
    }
}

/// All rows sharing one grouping reference: one customer order.
///
/// Header fields come from the group's first row; every row contributes
/// one line.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionGroup {
    /// FEL certification UUID, the grouping key.
    pub reference: String,
    pub date: NaiveDate,
    /// Sales journal name (column B).
    pub journal_name: String,
    pub fel_number: String,
    pub fel_series: String,
    pub customer_tax_id: Option<String>,
    pub customer_name: String,
    pub status_flag: String,
    /// The two fragments whose concatenation names the payment journal.
    pub payment_journal_fragments: (String, String),
    pub lines: Vec<LineItem>,
}

impl TransactionGroup {
    pub fn is_certified(&self) -> bool {
        self.status_flag == STATUS_CERTIFIED
    }

    /// Composite payment-journal name. The separator between the two
    /// fragments is a configured policy, not per-row string munging.
    pub fn payment_journal_name(&self, separator: &str) -> String {
        let (a, b) = &self.payment_journal_fragments;
        format!("{a}{separator}{b}")
    }

    /// Order amount after per-line discounts.
    pub fn total(&self) -> f64 {
        self.lines.iter().map(LineItem::subtotal).sum()
    }
}
