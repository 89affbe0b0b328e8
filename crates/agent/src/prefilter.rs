//! Idempotency prefilter: drop rows for customers who already hold a live
//! order for the section's date, before any engine turn is spent on them.

use std::collections::HashSet;

use orderly_core::catalog::CatalogIndex;
use orderly_core::domain::section::{OrderRow, SheetSection};
use orderly_db::{OrderRepository, RepositoryError};

use crate::report::{SkipRecord, SKIP_REASON_EXISTING_ORDER};

#[derive(Clone, Debug, Default)]
pub struct PrefilterOutcome {
    pub keep: Vec<OrderRow>,
    pub pre_skipped: Vec<SkipRecord>,
}

pub struct IdempotencyPrefilter<'a> {
    orders: &'a dyn OrderRepository,
    catalog: &'a CatalogIndex,
}

impl<'a> IdempotencyPrefilter<'a> {
    pub fn new(orders: &'a dyn OrderRepository, catalog: &'a CatalogIndex) -> Self {
        Self { orders, catalog }
    }

    pub async fn partition(
        &self,
        section: &SheetSection,
    ) -> Result<PrefilterOutcome, RepositoryError> {
        let customer_ids = self.orders.customers_with_live_orders(section.date).await?;

        let existing_names: HashSet<String> = customer_ids
            .iter()
            .filter_map(|customer_id| self.catalog.customer(customer_id))
            .map(|customer| normalize(&customer.name))
            .collect();

        let outcome = partition_rows(section, &existing_names);

        tracing::info!(
            date = %section.date,
            kept = outcome.keep.len(),
            pre_skipped = outcome.pre_skipped.len(),
            "idempotency prefilter applied"
        );

        Ok(outcome)
    }
}

/// Deterministic core of the prefilter. Skip entries are deduplicated per
/// customer name, so repeated rows for an already-ordered customer yield
/// exactly one record.
pub fn partition_rows(section: &SheetSection, existing_names: &HashSet<String>) -> PrefilterOutcome {
    let mut outcome = PrefilterOutcome::default();
    let mut skipped_names: HashSet<String> = HashSet::new();

    for row in &section.rows {
        let customer_name = row.customer.trim();
        let normalized = normalize(customer_name);

        if existing_names.contains(&normalized) {
            if skipped_names.insert(normalized) {
                outcome.pre_skipped.push(SkipRecord {
                    customer_name: customer_name.to_string(),
                    delivery_date: section.date,
                    existing_order_id: None,
                    reason: SKIP_REASON_EXISTING_ORDER,
                });
            }
            continue;
        }

        outcome.keep.push(row.clone());
    }

    outcome
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use orderly_core::domain::section::{OrderRow, SheetSection};

    use super::partition_rows;

    fn row(customer: &str, product: &str) -> OrderRow {
        OrderRow {
            customer: customer.to_string(),
            product: product.to_string(),
            size: "S".to_string(),
            quantity: "1".to_string(),
        }
    }

    fn section(rows: Vec<OrderRow>) -> SheetSection {
        SheetSection {
            day_label: "Friday".to_string(),
            raw_date: "Friday, March 6, 2026".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 6).expect("date"),
            start_row: 1,
            end_row: 10,
            rows,
        }
    }

    #[test]
    fn repeated_rows_for_existing_customer_skip_once() {
        let section = section(vec![
            row("Cafe Sushi", "Basil"),
            row("cafe sushi", "Arugula"),
            row("Juniper", "Pea Shoots"),
        ]);
        let existing: HashSet<String> = ["cafe sushi".to_string()].into();

        let outcome = partition_rows(&section, &existing);

        assert_eq!(outcome.keep.len(), 1);
        assert_eq!(outcome.keep[0].customer, "Juniper");
        assert_eq!(outcome.pre_skipped.len(), 1);
        assert_eq!(outcome.pre_skipped[0].customer_name, "Cafe Sushi");
        assert_eq!(outcome.pre_skipped[0].reason, "existing_order");
    }

    #[test]
    fn partition_is_idempotent_and_covers_all_customers() {
        let section = section(vec![
            row("Cafe Sushi", "Basil"),
            row("Juniper", "Pea Shoots"),
            row("Henrietta's Table", "Sunflower"),
        ]);
        let existing: HashSet<String> = ["juniper".to_string()].into();

        let first = partition_rows(&section, &existing);
        let second = partition_rows(&section, &existing);

        assert_eq!(first.keep, second.keep);
        assert_eq!(first.pre_skipped, second.pre_skipped);

        let mut covered: Vec<String> = first
            .keep
            .iter()
            .map(|row| row.customer.to_lowercase())
            .chain(first.pre_skipped.iter().map(|skip| skip.customer_name.to_lowercase()))
            .collect();
        covered.sort();
        let mut all: Vec<String> =
            section.rows.iter().map(|row| row.customer.to_lowercase()).collect();
        all.sort();
        all.dedup();
        assert_eq!(covered, all);
    }

    #[test]
    fn no_existing_orders_keeps_everything() {
        let section = section(vec![row("Cafe Sushi", "Basil")]);
        let outcome = partition_rows(&section, &HashSet::new());

        assert_eq!(outcome.keep.len(), 1);
        assert!(outcome.pre_skipped.is_empty());
    }
}
