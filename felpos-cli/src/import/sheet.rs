//! Workbook reading and typed cell extraction
//!
//! The sales export has a fixed column layout agreed with the point-of-
//! sale exporter; there is no header-name binding. Offsets live in
//! [`cols`] so a structural change in the source file is a one-place fix.

use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::{NaiveDate, NaiveDateTime};

use super::error::ImportError;

/// A data row from the worksheet, cells at fixed offsets.
pub type RawRow = Vec<Data>;

/// Column offsets (0-based) of the sales export.
pub mod cols {
    /// Transaction/order date.
    pub const DATE: usize = 0;
    /// Sales journal name.
    pub const SALES_JOURNAL: usize = 1;
    /// FEL certification UUID, the grouping key.
    pub const REFERENCE: usize = 2;
    /// FEL document number.
    pub const FEL_NUMBER: usize = 3;
    /// FEL series.
    pub const FEL_SERIES: usize = 4;
    /// Customer tax id (NIT).
    pub const CUSTOMER_TAX_ID: usize = 5;
    /// Customer display name.
    pub const CUSTOMER_NAME: usize = 6;
    /// Certification status flag.
    pub const STATUS: usize = 7;
    /// First fragment of the payment-journal name.
    pub const PAYMENT_JOURNAL_A: usize = 8;
    /// Second fragment of the payment-journal name.
    pub const PAYMENT_JOURNAL_B: usize = 12;
    /// Product display name.
    pub const PRODUCT_NAME: usize = 18;
    /// Product code.
    pub const PRODUCT_CODE: usize = 19;
    pub const QUANTITY: usize = 20;
    pub const UNIT_PRICE: usize = 21;
    pub const DISCOUNT_PCT: usize = 25;
}

/// String date encodings accepted by [`cell_date`], tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y"];

/// Read the data rows of the first worksheet, skipping the header row.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, ImportError> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| ImportError::Workbook(format!("{}: {e}", path.display())))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::Workbook(format!("{}: no sheets", path.display())))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::Workbook(format!("sheet {sheet_name}: {e}")))?;

    log::debug!("read {} rows from sheet {sheet_name}", range.rows().count());

    Ok(range.rows().skip(1).map(|r| r.to_vec()).collect())
}

/// Trimmed string content of a cell. Numeric cells render without a
/// trailing `.0` (codes and tax ids often arrive as numbers); empty and
/// error cells yield `""`.
pub fn cell_string(row: &[Data], col: usize) -> String {
    row.get(col)
        .map(|c| match c {
            Data::String(s) => s.trim().to_string(),
            Data::Int(i) => i.to_string(),
            Data::Float(f) => {
                if f.fract() == 0.0 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Data::Bool(b) => b.to_string(),
            Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
            _ => String::new(),
        })
        .unwrap_or_default()
}

/// Like [`cell_string`] but maps `""` to `None`.
pub fn cell_opt_string(row: &[Data], col: usize) -> Option<String> {
    let value = cell_string(row, col);
    if value.is_empty() { None } else { Some(value) }
}

/// Numeric cell with a documented default for blank cells. String cells
/// holding a number are accepted.
pub fn cell_f64_or(row: &[Data], col: usize, default: f64) -> f64 {
    row.get(col)
        .and_then(|c| match c {
            Data::Int(i) => Some(*i as f64),
            Data::Float(f) => Some(*f),
            Data::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(default)
}

/// Date cell as a calendar date.
///
/// Accepts native date/datetime cells and the encodings in
/// [`DATE_FORMATS`]/[`DATETIME_FORMATS`]. A blank cell is `None`; any
/// other unparseable value is [`ImportError::MalformedDate`].
pub fn cell_date(row: &[Data], col: usize) -> Result<Option<NaiveDate>, ImportError> {
    let cell = match row.get(col) {
        Some(c) => c,
        None => return Ok(None),
    };

    match cell {
        Data::Empty => Ok(None),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Some(d.date()))
            .ok_or_else(|| ImportError::MalformedDate {
                value: format!("{dt}"),
            }),
        Data::String(s) if s.trim().is_empty() => Ok(None),
        Data::String(s) => parse_date_str(s).map(Some),
        Data::DateTimeIso(s) => parse_date_str(s).map(Some),
        other => Err(ImportError::MalformedDate {
            value: other.to_string(),
        }),
    }
}

fn parse_date_str(raw: &str) -> Result<NaiveDate, ImportError> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(datetime.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(date);
        }
    }
    Err(ImportError::MalformedDate {
        value: raw.to_string(),
    })
}
