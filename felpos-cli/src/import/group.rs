//! Partition worksheet rows into transaction groups

use indexmap::IndexMap;

use super::error::ImportError;
use super::sheet::{self, RawRow, cols};
use super::types::{LineItem, TransactionGroup};

/// Group data rows by their column-C reference.
///
/// Rows without a reference are skipped. Group order and row order within
/// a group follow the worksheet, never a sort.
pub fn group_rows(rows: Vec<RawRow>) -> Result<IndexMap<String, Vec<RawRow>>, ImportError> {
    let mut groups: IndexMap<String, Vec<RawRow>> = IndexMap::new();

    for row in rows {
        let reference = sheet::cell_string(&row, cols::REFERENCE);
        if reference.is_empty() {
            log::debug!("skipping row without a grouping reference");
            continue;
        }
        groups.entry(reference).or_default().push(row);
    }

    if groups.is_empty() {
        return Err(ImportError::EmptyInput);
    }

    for reference in groups.keys() {
        if uuid::Uuid::parse_str(reference).is_err() {
            log::warn!("grouping reference {reference} is not a FEL UUID");
        }
    }

    log::info!("grouped input into {} transactions", groups.len());
    Ok(groups)
}

/// Build a [`TransactionGroup`] from one keyed bucket.
///
/// Header fields come from the group's first row; each row contributes
/// one line. Rows without a product code are dropped, and a group left
/// with no lines at all is returned as `None`: skipped, not errored.
pub fn build_group(
    reference: &str,
    rows: &[RawRow],
) -> Result<Option<TransactionGroup>, ImportError> {
    let first = match rows.first() {
        Some(row) => row,
        None => return Ok(None),
    };

    let mut lines = Vec::new();
    for row in rows {
        let product_code = sheet::cell_string(row, cols::PRODUCT_CODE);
        if product_code.is_empty() {
            log::debug!("{reference}: dropping line without a product code");
            continue;
        }
        lines.push(LineItem {
            product_code,
            product_name: sheet::cell_string(row, cols::PRODUCT_NAME),
            quantity: sheet::cell_f64_or(row, cols::QUANTITY, 1.0),
            unit_price: sheet::cell_f64_or(row, cols::UNIT_PRICE, 0.0),
            discount_pct: sheet::cell_f64_or(row, cols::DISCOUNT_PCT, 0.0),
        });
    }

    if lines.is_empty() {
        return Ok(None);
    }

    let date = sheet::cell_date(first, cols::DATE)?.ok_or_else(|| ImportError::MissingDate {
        reference: reference.to_string(),
    })?;

    Ok(Some(TransactionGroup {
        reference: reference.to_string(),
        date,
        journal_name: sheet::cell_string(first, cols::SALES_JOURNAL),
        fel_number: sheet::cell_string(first, cols::FEL_NUMBER),
        fel_series: sheet::cell_string(first, cols::FEL_SERIES),
        customer_tax_id: sheet::cell_opt_string(first, cols::CUSTOMER_TAX_ID),
        customer_name: sheet::cell_string(first, cols::CUSTOMER_NAME),
        status_flag: sheet::cell_string(first, cols::STATUS),
        payment_journal_fragments: (
            sheet::cell_string(first, cols::PAYMENT_JOURNAL_A),
            sheet::cell_string(first, cols::PAYMENT_JOURNAL_B),
        ),
        lines,
    }))
}
