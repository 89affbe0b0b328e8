use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One order row pulled from the spreadsheet's four-column data band.
/// All fields are raw cell text; resolution happens later against the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRow {
    pub customer: String,
    pub product: String,
    pub size: String,
    pub quantity: String,
}

/// A date-labelled slice of a harvest-day section. Transient extraction
/// result; never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetSection {
    /// Day label of the enclosing section, e.g. "Friday".
    pub day_label: String,
    /// The date header exactly as written in the sheet.
    pub raw_date: String,
    pub date: NaiveDate,
    /// Bounding row indices within the scanned range, `[start_row, end_row)`.
    pub start_row: usize,
    pub end_row: usize,
    pub rows: Vec<OrderRow>,
}

impl SheetSection {
    pub fn distinct_customers(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for row in &self.rows {
            let trimmed = row.customer.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !names.iter().any(|name| name.eq_ignore_ascii_case(trimmed)) {
                names.push(trimmed.to_string());
            }
        }
        names
    }
}
