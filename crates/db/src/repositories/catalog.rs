use std::collections::HashMap;

use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use orderly_core::domain::customer::{Customer, CustomerId, CustomerItemNote};
use orderly_core::domain::item::{Item, ItemId, ItemVariant, VariantId};

use super::{CatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, email, phone, notes
             FROM customers
             WHERE active = 1
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut customers =
            rows.into_iter().map(customer_from_row).collect::<Result<Vec<_>, _>>()?;

        let note_rows = sqlx::query(
            "SELECT customer_id, item_name, note
             FROM customer_item_notes
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut notes_by_customer: HashMap<Uuid, Vec<CustomerItemNote>> = HashMap::new();
        for row in note_rows {
            let customer_id = parse_uuid(&row.get::<String, _>("customer_id"))?;
            notes_by_customer.entry(customer_id).or_default().push(CustomerItemNote {
                item_name: row.get("item_name"),
                note: row.get("note"),
            });
        }

        for customer in &mut customers {
            if let Some(notes) = notes_by_customer.remove(&customer.id.0) {
                customer.item_notes = notes;
            }
        }

        Ok(customers)
    }

    async fn list_items(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, sku, name, description
             FROM items
             WHERE active = 1
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut items = rows.into_iter().map(item_from_row).collect::<Result<Vec<_>, _>>()?;

        let variant_rows = sqlx::query(
            "SELECT id, item_id, variant_code, variant_name, notes
             FROM item_variants
             ORDER BY variant_code",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut variants_by_item: HashMap<Uuid, Vec<ItemVariant>> = HashMap::new();
        for row in variant_rows {
            let item_id = parse_uuid(&row.get::<String, _>("item_id"))?;
            variants_by_item.entry(item_id).or_default().push(ItemVariant {
                id: VariantId(parse_uuid(&row.get::<String, _>("id"))?),
                variant_code: row.get("variant_code"),
                variant_name: row.get("variant_name"),
                notes: row.get("notes"),
            });
        }

        for item in &mut items {
            if let Some(variants) = variants_by_item.remove(&item.id.0) {
                item.variants = variants;
            }
        }

        Ok(items)
    }
}

fn customer_from_row(row: SqliteRow) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: CustomerId(parse_uuid(&row.get::<String, _>("id"))?),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        notes: row.get("notes"),
        item_notes: Vec::new(),
    })
}

fn item_from_row(row: SqliteRow) -> Result<Item, RepositoryError> {
    Ok(Item {
        id: ItemId(parse_uuid(&row.get::<String, _>("id"))?),
        sku: row.get("sku"),
        name: row.get("name"),
        description: row.get("description"),
        variants: Vec::new(),
    })
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value)
        .map_err(|error| RepositoryError::Decode(format!("invalid uuid `{value}`: {error}")))
}
