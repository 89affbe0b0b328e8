use chrono::NaiveDate;
use thiserror::Error;

use crate::client::{RowRange, SheetError, SheetRows, SCAN_BAND};
use crate::dates;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("section `{0}` not found in spreadsheet")]
    SectionNotFound(String),
    #[error("no date sections found within `{0}`")]
    NoDateSections(String),
    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// Identifies one day section: a specific day label inside a family of
/// sections sharing a parent-category label, e.g. day "friday" within
/// family "Harvests" → heading "Friday Harvests".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionLabel {
    day: String,
    family: String,
}

impl SectionLabel {
    pub fn new(day: impl Into<String>, family: impl Into<String>) -> Self {
        Self { day: day.into().to_lowercase(), family: family.into() }
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    pub fn day_title(&self) -> String {
        let mut chars = self.day.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn heading(&self) -> String {
        format!("{} {}", self.day_title(), self.family)
    }
}

/// A date sub-header discovered inside a scanned section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateHeader {
    /// 0-based row index within the scanned range.
    pub row_index: usize,
    pub raw: String,
    pub date: NaiveDate,
}

/// Result of the boundary scan: the section's row bounds plus its date
/// sub-headers. `rows` holds everything read so far so the window filter can
/// reuse indices without refetching the scan band.
#[derive(Clone, Debug)]
pub struct ScannedSection {
    pub label: SectionLabel,
    /// Row index of the section heading.
    pub start_row: usize,
    /// Exclusive end bound: the next family heading, or the last row read.
    pub end_row: usize,
    pub headers: Vec<DateHeader>,
}

/// Streams the scan band in fixed-size chunks and locates a named section
/// without ever materializing the whole grid.
pub struct SectionScanner {
    chunk_size: usize,
}

impl SectionScanner {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size: chunk_size.max(1) }
    }

    pub async fn scan(
        &self,
        sheet: &dyn SheetRows,
        label: &SectionLabel,
    ) -> Result<ScannedSection, ScanError> {
        let heading = label.heading().to_lowercase();
        let family = label.family.to_lowercase();
        let day = label.day.clone();

        let mut scanned: Vec<Vec<String>> = Vec::new();
        let mut section_start: Option<usize> = None;
        let mut section_end: Option<usize> = None;
        let mut offset = 0usize;

        loop {
            let range = RowRange {
                band: SCAN_BAND,
                start_row: offset + 1,
                end_row: offset + self.chunk_size,
            };
            let chunk = sheet.fetch(&range).await?;
            if chunk.is_empty() {
                break;
            }

            for (index, row) in chunk.iter().enumerate() {
                let global_index = offset + index;
                let row_text = dates::join_cells(row).to_lowercase();

                match section_start {
                    None => {
                        if row_text.contains(&heading) {
                            section_start = Some(global_index);
                        }
                    }
                    Some(_) => {
                        // A family heading for a different day closes the section.
                        if row_text.contains(&family) && !row_text.contains(&day) {
                            section_end = Some(global_index);
                            break;
                        }
                    }
                }
            }

            let fetched = chunk.len();
            scanned.extend(chunk);
            offset += fetched;

            if section_end.is_some() {
                break;
            }
            if fetched < self.chunk_size {
                // Short fetch: end of data.
                break;
            }

            tracing::debug!(rows_scanned = offset, section = %label.heading(), "scanning for section boundaries");
        }

        let start_row =
            section_start.ok_or_else(|| ScanError::SectionNotFound(label.heading()))?;
        let end_row = section_end.unwrap_or(scanned.len());

        let mut headers = Vec::new();
        for row_index in (start_row + 1)..end_row {
            let Some(row) = scanned.get(row_index) else { break };
            if let Some(row_date) = dates::normalize_row(row) {
                headers.push(DateHeader {
                    row_index,
                    raw: row_date.raw,
                    date: row_date.date,
                });
            }
        }

        if headers.is_empty() {
            return Err(ScanError::NoDateSections(label.heading()));
        }

        tracing::info!(
            section = %label.heading(),
            start_row,
            end_row,
            date_sections = headers.len(),
            "section boundaries located"
        );

        Ok(ScannedSection { label: label.clone(), start_row, end_row, headers })
    }
}

#[cfg(test)]
mod tests {
    use crate::client::InMemorySheet;

    use super::{ScanError, SectionLabel, SectionScanner};

    // Grid columns are A..G; the scanner reads C:E, data lives in D:G.
    fn fixture() -> InMemorySheet {
        InMemorySheet::from_rows([
            ["", "", "", "Some banner", "", "", ""],
            ["", "", "", "Tuesday Harvests", "", "", ""],
            ["", "", "", "Tuesday, March 3, 2026", "", "", ""],
            ["", "", "", "Customer", "Product", "Size", "Qty"],
            ["", "", "", "Cafe Sushi", "Basil", "L", "3"],
            ["", "", "", "Friday Harvests", "", "", ""],
            ["", "", "", "Friday, March 6, 2026", "", "", ""],
            ["", "", "", "Customer", "Product", "Size", "Qty"],
            ["", "", "", "Juniper", "Pea Shoots", "T20", "1"],
            ["", "", "", "Friday, March 13, 2026", "", "", ""],
            ["", "", "", "Henrietta's Table", "Arugula", "S", "2"],
        ])
    }

    #[tokio::test]
    async fn locates_bounds_and_date_headers() {
        let sheet = fixture();
        let scanner = SectionScanner::new(10_000);
        let label = SectionLabel::new("friday", "Harvests");

        let scanned = scanner.scan(&sheet, &label).await.expect("scan");

        assert_eq!(scanned.start_row, 5);
        // No later family heading exists, so the bound defaults to the last row read.
        assert_eq!(scanned.end_row, 11);
        let dates: Vec<String> =
            scanned.headers.iter().map(|header| header.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-03-06", "2026-03-13"]);
    }

    #[tokio::test]
    async fn closes_section_at_next_family_heading() {
        let sheet = fixture();
        let scanner = SectionScanner::new(10_000);
        let label = SectionLabel::new("tuesday", "Harvests");

        let scanned = scanner.scan(&sheet, &label).await.expect("scan");

        assert_eq!(scanned.start_row, 1);
        assert_eq!(scanned.end_row, 5);
        assert_eq!(scanned.headers.len(), 1);
        assert_eq!(scanned.headers[0].row_index, 2);
    }

    #[tokio::test]
    async fn bounds_are_invariant_under_chunk_size() {
        let sheet = fixture();
        let label = SectionLabel::new("friday", "Harvests");
        let reference = SectionScanner::new(10_000)
            .scan(&sheet, &label)
            .await
            .expect("reference scan");

        for chunk_size in [1, 2, 3, 5, 7, 11] {
            let scanned = SectionScanner::new(chunk_size)
                .scan(&sheet, &label)
                .await
                .unwrap_or_else(|error| panic!("chunk size {chunk_size}: {error}"));

            assert_eq!(scanned.start_row, reference.start_row, "chunk size {chunk_size}");
            assert_eq!(scanned.end_row, reference.end_row, "chunk size {chunk_size}");
            assert_eq!(scanned.headers, reference.headers, "chunk size {chunk_size}");
        }
    }

    #[tokio::test]
    async fn missing_section_is_an_error() {
        let sheet = fixture();
        let scanner = SectionScanner::new(100);
        let label = SectionLabel::new("wednesday", "Harvests");

        let error = scanner.scan(&sheet, &label).await.expect_err("no wednesday section");
        assert!(matches!(error, ScanError::SectionNotFound(_)));
    }

    #[tokio::test]
    async fn section_without_dates_is_an_error() {
        let sheet = InMemorySheet::from_rows([
            ["", "", "", "Friday Harvests", "", "", ""],
            ["", "", "", "Customer", "Product", "Size", "Qty"],
            ["", "", "", "Cafe Sushi", "Basil", "L", "3"],
        ]);
        let scanner = SectionScanner::new(100);
        let label = SectionLabel::new("friday", "Harvests");

        let error = scanner.scan(&sheet, &label).await.expect_err("no date headers");
        assert!(matches!(error, ScanError::NoDateSections(_)));
    }
}
