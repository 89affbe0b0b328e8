use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Column band of the orders tab the scanner reads while hunting for
/// section boundaries. Date headers live in column D, inside this band.
pub const SCAN_BAND: ColumnBand = ColumnBand { first: 'C', last: 'E' };

/// Column band holding the order data itself: Customer | Product | Size | Qty.
pub const DATA_BAND: ColumnBand = ColumnBand { first: 'D', last: 'G' };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnBand {
    pub first: char,
    pub last: char,
}

impl ColumnBand {
    /// 0-based index of the band's first column within the sheet.
    pub fn offset(&self) -> usize {
        (self.first as u8 - b'A') as usize
    }

    pub fn width(&self) -> usize {
        (self.last as u8 - self.first as u8) as usize + 1
    }
}

/// A contiguous row span of a fixed column band, 1-based and inclusive, the
/// way the values API addresses ranges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowRange {
    pub band: ColumnBand,
    pub start_row: usize,
    pub end_row: usize,
}

impl RowRange {
    pub fn a1(&self, tab: &str) -> String {
        format!(
            "{tab}!{first}{start}:{last}{end}",
            first = self.band.first,
            start = self.start_row,
            last = self.band.last,
            end = self.end_row,
        )
    }
}

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("spreadsheet request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("spreadsheet API returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("spreadsheet credentials are missing: {0}")]
    MissingCredentials(String),
}

/// Batch range-read capability over one spreadsheet tab. Returns rows of
/// cell text; rows past the end of data are simply absent, which is how
/// callers detect end-of-sheet.
#[async_trait]
pub trait SheetRows: Send + Sync {
    async fn fetch(&self, range: &RowRange) -> Result<Vec<Vec<String>>, SheetError>;
}

/// Google Sheets v4 values client.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    tab: String,
    api_token: SecretString,
}

impl GoogleSheetsClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        tab: impl Into<String>,
        api_token: Option<SecretString>,
    ) -> Result<Self, SheetError> {
        let api_token = api_token.ok_or_else(|| {
            SheetError::MissingCredentials("sheets.api_token is not configured".to_string())
        })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            tab: tab.into(),
            api_token,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[async_trait]
impl SheetRows for GoogleSheetsClient {
    async fn fetch(&self, range: &RowRange) -> Result<Vec<Vec<String>>, SheetError> {
        let url = format!(
            "{base}/v4/spreadsheets/{id}/values/{range}",
            base = self.base_url,
            id = self.spreadsheet_id,
            range = range.a1(&self.tab),
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(self.api_token.expose_secret())
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SheetError::Api { status: status.as_u16(), message });
        }

        let payload: ValuesResponse = response.json().await?;
        Ok(payload.values.into_iter().map(|row| row.into_iter().map(cell_text).collect()).collect())
    }
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Fixed in-memory grid implementing the same capability, for tests and
/// offline runs. The grid is addressed with full-sheet column indices
/// (column A = 0), matching what a real tab looks like.
#[derive(Clone, Debug, Default)]
pub struct InMemorySheet {
    grid: Vec<Vec<String>>,
}

impl InMemorySheet {
    pub fn new(grid: Vec<Vec<String>>) -> Self {
        Self { grid }
    }

    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = &'static str>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(str::to_string).collect())
                .collect(),
        )
    }
}

#[async_trait]
impl SheetRows for InMemorySheet {
    async fn fetch(&self, range: &RowRange) -> Result<Vec<Vec<String>>, SheetError> {
        let start = range.start_row.saturating_sub(1);
        let end = range.end_row.min(self.grid.len());
        if start >= end {
            return Ok(Vec::new());
        }

        let offset = range.band.offset();
        let width = range.band.width();
        let rows = self.grid[start..end]
            .iter()
            .map(|row| {
                (0..width)
                    .map(|column| row.get(offset + column).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnBand, InMemorySheet, RowRange, SheetRows, DATA_BAND, SCAN_BAND};

    #[test]
    fn a1_notation_spans_band_and_rows() {
        let range = RowRange { band: SCAN_BAND, start_row: 1, end_row: 10_000 };
        assert_eq!(range.a1("ORDERS"), "ORDERS!C1:E10000");

        let range = RowRange { band: DATA_BAND, start_row: 42, end_row: 57 };
        assert_eq!(range.a1("ORDERS"), "ORDERS!D42:G57");
    }

    #[test]
    fn band_offsets_match_sheet_columns() {
        assert_eq!(SCAN_BAND.offset(), 2);
        assert_eq!(SCAN_BAND.width(), 3);
        assert_eq!(DATA_BAND.offset(), 3);
        assert_eq!(DATA_BAND.width(), 4);
    }

    #[tokio::test]
    async fn in_memory_sheet_slices_band_and_stops_at_end_of_data() {
        let sheet = InMemorySheet::from_rows([
            ["", "", "x1", "y1", "z1", "", ""],
            ["", "", "x2", "y2", "z2", "", ""],
            ["", "", "x3", "y3", "z3", "", ""],
        ]);

        let rows = sheet
            .fetch(&RowRange { band: SCAN_BAND, start_row: 2, end_row: 10 })
            .await
            .expect("fetch");

        // Short fetch: only two rows remained.
        assert_eq!(rows, vec![vec!["x2", "y2", "z2"], vec!["x3", "y3", "z3"]]);
    }

    #[tokio::test]
    async fn in_memory_sheet_pads_missing_cells() {
        let sheet = InMemorySheet::from_rows([["", "", "", "only-d"]]);
        let band = ColumnBand { first: 'D', last: 'G' };

        let rows =
            sheet.fetch(&RowRange { band, start_row: 1, end_row: 1 }).await.expect("fetch");

        assert_eq!(rows, vec![vec!["only-d", "", "", ""]]);
    }
}
