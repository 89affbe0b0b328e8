//! Normalization of human-written date headers.
//!
//! The feed writes dates like "Friday, August 15, 2025", sometimes split
//! across adjacent cells. Normalization strips an optional weekday prefix and
//! tries a fixed, ordered pattern table; no locale support beyond it.

use chrono::NaiveDate;

pub const WEEKDAYS: [&str; 7] =
    ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];

/// Tried in order; first successful parse wins.
pub const DATE_FORMATS: [&str; 4] = ["%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%Y-%m-%d"];

/// Cells retried individually when the whole-row join fails to parse.
/// Within the scan band (C:E), index 1 is column D where dates usually live.
const FALLBACK_CELLS: [usize; 2] = [1, 2];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowDate {
    /// The header text exactly as joined from the row.
    pub raw: String,
    pub date: NaiveDate,
}

/// Parse a single candidate string into a canonical date.
pub fn normalize(text: &str) -> Option<NaiveDate> {
    let cleaned = strip_weekday_prefix(text);
    if cleaned.is_empty() {
        return None;
    }

    DATE_FORMATS.iter().find_map(|format| NaiveDate::parse_from_str(cleaned, format).ok())
}

/// Try the joined row text first, then individual candidate cells in fixed
/// fallback order.
pub fn normalize_row(cells: &[String]) -> Option<RowDate> {
    let combined = join_cells(cells);

    if let Some(date) = normalize(&combined) {
        return Some(RowDate { raw: combined, date });
    }

    for index in FALLBACK_CELLS {
        let Some(cell) = cells.get(index) else { continue };
        if let Some(date) = normalize(cell) {
            return Some(RowDate { raw: combined, date });
        }
    }

    None
}

pub fn join_cells(cells: &[String]) -> String {
    cells.iter().map(|cell| cell.trim()).collect::<Vec<_>>().join(" ").trim().to_string()
}

fn strip_weekday_prefix(text: &str) -> &str {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();

    for weekday in WEEKDAYS {
        if lowered.starts_with(weekday) {
            return trimmed[weekday.len()..].trim_start_matches(',').trim_start();
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{normalize, normalize_row, DATE_FORMATS};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn parses_long_form_with_weekday_prefix() {
        assert_eq!(normalize("Friday, August 15, 2025"), Some(date(2025, 8, 15)));
        assert_eq!(normalize("friday august 15 2025"), Some(date(2025, 8, 15)));
    }

    #[test]
    fn parses_abbreviated_month_and_canonical_forms() {
        assert_eq!(normalize("Tue, Mar 3, 2026"), None); // abbreviated weekday is not stripped
        assert_eq!(normalize("Tuesday, Mar 3, 2026"), Some(date(2026, 3, 3)));
        assert_eq!(normalize("2026-03-03"), Some(date(2026, 3, 3)));
    }

    #[test]
    fn rejects_non_dates() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("Cafe Sushi"), None);
        assert_eq!(normalize("One-time Orders"), None);
    }

    #[test]
    fn every_supported_format_round_trips() {
        let original = date(2026, 3, 3);
        for format in DATE_FORMATS {
            let rendered = original.format(format).to_string();
            assert_eq!(
                normalize(&rendered),
                Some(original),
                "format {format} should round-trip via {rendered}"
            );
        }
    }

    #[test]
    fn row_join_wins_over_cell_fallback() {
        let cells =
            vec!["".to_string(), "Friday, August 15,".to_string(), "2025".to_string()];
        let row_date = normalize_row(&cells).expect("joined cells parse");
        assert_eq!(row_date.date, date(2025, 8, 15));
        assert_eq!(row_date.raw, "Friday, August 15, 2025");
    }

    #[test]
    fn falls_back_to_individual_cells() {
        let cells = vec![
            "garnish".to_string(),
            "Friday, August 15, 2025".to_string(),
            "".to_string(),
        ];
        let row_date = normalize_row(&cells).expect("cell fallback parses");
        assert_eq!(row_date.date, date(2025, 8, 15));
    }

    #[test]
    fn plain_text_rows_do_not_normalize() {
        let cells = vec!["Cafe Sushi".to_string(), "Basil".to_string(), "L".to_string()];
        assert_eq!(normalize_row(&cells), None);
    }
}
