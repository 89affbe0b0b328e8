use chrono::{Duration, NaiveDate};

use orderly_core::domain::section::{OrderRow, SheetSection};

use crate::client::{RowRange, SheetRows, DATA_BAND};
use crate::scan::{DateHeader, ScanError, ScannedSection};

/// Rows whose first cell matches one of these (case-insensitive) are layout
/// furniture, not orders.
pub const SKIP_LABELS: [&str; 2] = ["customer", "one-time orders"];

/// Selects the date sub-sections falling inside `[today, today + window_days]`.
#[derive(Clone, Copy, Debug)]
pub struct WindowFilter {
    pub today: NaiveDate,
    pub window_days: u32,
}

impl WindowFilter {
    pub fn new(today: NaiveDate, window_days: u32) -> Self {
        Self { today, window_days }
    }

    /// Never returns an empty set when at least one header exists: if nothing
    /// falls inside the window, the most recent header (last in scan order)
    /// is used instead, so a misconfigured window degrades loudly in the
    /// report rather than silently doing nothing.
    pub fn select<'a>(&self, headers: &'a [DateHeader]) -> Vec<&'a DateHeader> {
        let window_end = self.today + Duration::days(i64::from(self.window_days));
        let in_window: Vec<&DateHeader> = headers
            .iter()
            .filter(|header| header.date >= self.today && header.date <= window_end)
            .collect();

        if in_window.is_empty() {
            tracing::warn!(
                today = %self.today,
                window_end = %window_end,
                "no date sections in window; falling back to most recent"
            );
            return headers.last().into_iter().collect();
        }

        in_window
    }
}

/// Fetch the order rows for every selected date sub-section.
///
/// A sub-section's data span runs from the row after its header up to the
/// next header, or the outer section's end for the last one.
pub async fn collect_sections(
    sheet: &dyn SheetRows,
    scanned: &ScannedSection,
    filter: &WindowFilter,
) -> Result<Vec<SheetSection>, ScanError> {
    let selected = filter.select(&scanned.headers);
    let mut sections = Vec::with_capacity(selected.len());

    for header in selected {
        let position = scanned
            .headers
            .iter()
            .position(|candidate| candidate.row_index == header.row_index)
            .unwrap_or(0);

        let data_start = header.row_index + 1;
        let data_end = scanned
            .headers
            .get(position + 1)
            .map(|next| next.row_index)
            .unwrap_or(scanned.end_row);

        let rows = if data_start < data_end {
            // Convert 0-based [data_start, data_end) to the API's 1-based
            // inclusive rows.
            let range =
                RowRange { band: DATA_BAND, start_row: data_start + 1, end_row: data_end };
            sheet.fetch(&range).await?
        } else {
            Vec::new()
        };

        let order_rows: Vec<OrderRow> = rows.iter().filter_map(|row| order_row(row)).collect();

        tracing::info!(
            date = %header.date,
            rows = order_rows.len(),
            span_start = data_start,
            span_end = data_end,
            "collected date sub-section"
        );

        sections.push(SheetSection {
            day_label: scanned.label.day_title(),
            raw_date: header.raw.clone(),
            date: header.date,
            start_row: data_start,
            end_row: data_end,
            rows: order_rows,
        });
    }

    Ok(sections)
}

fn order_row(cells: &[String]) -> Option<OrderRow> {
    if cells.len() < 2 {
        return None;
    }

    let first = cells[0].trim();
    if first.is_empty() {
        return None;
    }
    let lowered = first.to_lowercase();
    if SKIP_LABELS.contains(&lowered.as_str()) {
        return None;
    }

    Some(OrderRow {
        customer: first.to_string(),
        product: cells.get(1).map(|cell| cell.trim().to_string()).unwrap_or_default(),
        size: cells.get(2).map(|cell| cell.trim().to_string()).unwrap_or_default(),
        quantity: cells.get(3).map(|cell| cell.trim().to_string()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::client::InMemorySheet;
    use crate::scan::{SectionLabel, SectionScanner};

    use super::{collect_sections, WindowFilter};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn fixture() -> InMemorySheet {
        InMemorySheet::from_rows([
            ["", "", "", "Friday Harvests", "", "", ""],
            ["", "", "", "Friday, March 6, 2026", "", "", ""],
            ["", "", "", "Customer", "Product", "Size", "Qty"],
            ["", "", "", "Cafe Sushi", "Basil", "L", "3"],
            ["", "", "", "Cafe Sushi", "Arugula", "S", "2"],
            ["", "", "", "", "", "", ""],
            ["", "", "", "One-time Orders", "", "", ""],
            ["", "", "", "Juniper", "Pea Shoots", "T20", "1"],
            ["", "", "", "Friday, March 13, 2026", "", "", ""],
            ["", "", "", "Henrietta's Table", "Sunflower", "S", "4"],
        ])
    }

    async fn scan(sheet: &InMemorySheet) -> crate::scan::ScannedSection {
        SectionScanner::new(10_000)
            .scan(sheet, &SectionLabel::new("friday", "Harvests"))
            .await
            .expect("scan fixture")
    }

    #[tokio::test]
    async fn collects_rows_and_drops_layout_furniture() {
        let sheet = fixture();
        let scanned = scan(&sheet).await;
        let filter = WindowFilter::new(date(2026, 3, 2), 7);

        let sections = collect_sections(&sheet, &scanned, &filter).await.expect("collect");

        assert_eq!(sections.len(), 1);
        let section = &sections[0];
        assert_eq!(section.date, date(2026, 3, 6));
        assert_eq!(section.day_label, "Friday");
        let customers: Vec<&str> =
            section.rows.iter().map(|row| row.customer.as_str()).collect();
        // Header row, blank row, and the one-time label are dropped; the row
        // under the one-time label still belongs to the sub-section.
        assert_eq!(customers, vec!["Cafe Sushi", "Cafe Sushi", "Juniper"]);
        assert_eq!(section.rows[0].quantity, "3");
    }

    #[tokio::test]
    async fn window_covers_both_dates() {
        let sheet = fixture();
        let scanned = scan(&sheet).await;
        let filter = WindowFilter::new(date(2026, 3, 2), 14);

        let sections = collect_sections(&sheet, &scanned, &filter).await.expect("collect");

        let dates: Vec<String> =
            sections.iter().map(|section| section.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-03-06", "2026-03-13"]);
        assert_eq!(sections[1].rows.len(), 1);
        assert_eq!(sections[1].rows[0].customer, "Henrietta's Table");
    }

    #[tokio::test]
    async fn stale_window_falls_back_to_most_recent_section() {
        let sheet = fixture();
        let scanned = scan(&sheet).await;
        // Both sheet dates are long past this window.
        let filter = WindowFilter::new(date(2026, 6, 1), 7);

        let sections = collect_sections(&sheet, &scanned, &filter).await.expect("collect");

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].date, date(2026, 3, 13));
    }

    #[tokio::test]
    async fn future_only_window_excludes_past_dates() {
        let sheet = fixture();
        let scanned = scan(&sheet).await;
        let filter = WindowFilter::new(date(2026, 3, 10), 7);

        let sections = collect_sections(&sheet, &scanned, &filter).await.expect("collect");

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].date, date(2026, 3, 13));
    }
}
