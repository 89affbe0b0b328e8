//! Deterministic demo dataset for the `seed` command and integration tests.
//!
//! Ids are fixed so repeated seeding is idempotent and test assertions can
//! reference stable identifiers.

use uuid::Uuid;

use orderly_core::domain::customer::{Customer, CustomerId};
use orderly_core::domain::item::{Item, ItemId, ItemVariant, VariantId};

use crate::repositories::RepositoryError;
use crate::DbPool;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub customers: usize,
    pub items: usize,
    pub variants: usize,
}

pub fn demo_customers() -> Vec<Customer> {
    vec![
        customer(0x1001, "Cafe Sushi", Some("orders@cafesushi.example")),
        customer(0x1002, "Henrietta's Table", None),
        customer(0x1003, "Juniper", Some("kitchen@juniper.example")),
    ]
}

pub fn demo_items() -> Vec<Item> {
    vec![
        item(0x2001, "MG-ARU", "Arugula"),
        item(0x2002, "MG-BAS", "Basil"),
        item(0x2003, "MG-PEA", "Pea Shoots"),
    ]
}

fn customer(seed: u128, name: &str, email: Option<&str>) -> Customer {
    Customer {
        id: CustomerId(Uuid::from_u128(seed)),
        name: name.to_string(),
        email: email.map(str::to_string),
        phone: None,
        notes: None,
        item_notes: Vec::new(),
    }
}

fn item(seed: u128, sku: &str, name: &str) -> Item {
    Item {
        id: ItemId(Uuid::from_u128(seed)),
        sku: sku.to_string(),
        name: name.to_string(),
        description: None,
        variants: vec![
            variant(seed, 1, "S", "Small"),
            variant(seed, 2, "L", "Large"),
            variant(seed, 3, "T20", "Tray 20"),
        ],
    }
}

fn variant(item_seed: u128, ordinal: u128, code: &str, name: &str) -> ItemVariant {
    ItemVariant {
        id: VariantId(Uuid::from_u128(item_seed << 8 | ordinal)),
        variant_code: code.to_string(),
        variant_name: name.to_string(),
        notes: None,
    }
}

pub async fn seed_demo(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
    let mut result = SeedResult::default();

    for customer in demo_customers() {
        sqlx::query(
            "INSERT OR IGNORE INTO customers (id, name, email, phone, notes, active)
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(customer.id.0.to_string())
        .bind(&customer.name)
        .bind(customer.email.as_deref())
        .bind(customer.phone.as_deref())
        .bind(customer.notes.as_deref())
        .execute(pool)
        .await?;
        result.customers += 1;
    }

    for item in demo_items() {
        sqlx::query(
            "INSERT OR IGNORE INTO items (id, sku, name, description, active)
             VALUES (?, ?, ?, ?, 1)",
        )
        .bind(item.id.0.to_string())
        .bind(&item.sku)
        .bind(&item.name)
        .bind(item.description.as_deref())
        .execute(pool)
        .await?;
        result.items += 1;

        for variant in &item.variants {
            sqlx::query(
                "INSERT OR IGNORE INTO item_variants (id, item_id, variant_code, variant_name, notes)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(variant.id.0.to_string())
            .bind(item.id.0.to_string())
            .bind(&variant.variant_code)
            .bind(&variant.variant_name)
            .bind(variant.notes.as_deref())
            .execute(pool)
            .await?;
            result.variants += 1;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use crate::repositories::{CatalogRepository, SqlCatalogRepository};
    use crate::{connect_with_settings, migrations};

    use super::{demo_customers, demo_items, seed_demo};

    #[test]
    fn demo_ids_are_stable_across_calls() {
        assert_eq!(demo_customers(), demo_customers());
        assert_eq!(demo_items(), demo_items());
    }

    #[tokio::test]
    async fn seeding_twice_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        seed_demo(&pool).await.expect("first seed");
        seed_demo(&pool).await.expect("second seed");

        let repo = SqlCatalogRepository::new(pool);
        let customers = repo.list_customers().await.expect("list customers");
        let items = repo.list_items().await.expect("list items");

        assert_eq!(customers.len(), 3);
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item.variants.len() == 3));
    }
}
