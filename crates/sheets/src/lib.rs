//! Section-bounded extraction over a loosely-structured spreadsheet feed.
//!
//! The orders tab is one long grid partitioned into day sections ("Tuesday
//! Harvests", "Friday Harvests", ...), each subdivided by date headers. This
//! crate streams the grid in chunks, finds one day section's bounds, parses
//! its date headers, and pulls the order rows for the dates inside a window,
//! all without loading the full grid.

pub mod client;
pub mod dates;
pub mod scan;
pub mod window;

pub use client::{
    ColumnBand, GoogleSheetsClient, InMemorySheet, RowRange, SheetError, SheetRows, DATA_BAND,
    SCAN_BAND,
};
pub use scan::{DateHeader, ScanError, ScannedSection, SectionLabel, SectionScanner};
pub use window::{collect_sections, WindowFilter, SKIP_LABELS};
