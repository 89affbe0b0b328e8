//! Fast-lookup index over the customer and item catalogs.
//!
//! Built once per run from flat reference lists and passed explicitly to
//! every component that needs resolution. Lookups never fail hard: unknown
//! references resolve to display placeholders so a single bad id cannot sink
//! a whole mutation.

use std::collections::HashMap;

use crate::domain::customer::{Customer, CustomerId};
use crate::domain::item::{Item, ItemId, ItemVariant, VariantId};

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_VARIANT_CODE: &str = "?";

/// Back-reference from a variant to its parent item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantRef {
    pub variant: ItemVariant,
    pub item_id: ItemId,
    pub item_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedLine {
    pub item_name: String,
    pub variant_code: String,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogIndex {
    customers: Vec<Customer>,
    items: Vec<Item>,
    customer_index_by_id: HashMap<CustomerId, usize>,
    customer_index_by_name: HashMap<String, usize>,
    item_index_by_id: HashMap<ItemId, usize>,
    variants_by_id: HashMap<VariantId, VariantRef>,
}

impl CatalogIndex {
    pub fn build(customers: Vec<Customer>, items: Vec<Item>) -> Self {
        let mut customer_index_by_id = HashMap::with_capacity(customers.len());
        let mut customer_index_by_name = HashMap::with_capacity(customers.len());
        for (index, customer) in customers.iter().enumerate() {
            customer_index_by_id.insert(customer.id.clone(), index);
            customer_index_by_name.insert(normalize_name(&customer.name), index);
        }

        let mut item_index_by_id = HashMap::with_capacity(items.len());
        let mut variants_by_id = HashMap::new();
        for (index, item) in items.iter().enumerate() {
            item_index_by_id.insert(item.id.clone(), index);
            for variant in &item.variants {
                variants_by_id.insert(
                    variant.id.clone(),
                    VariantRef {
                        variant: variant.clone(),
                        item_id: item.id.clone(),
                        item_name: item.name.clone(),
                    },
                );
            }
        }

        Self {
            customers,
            items,
            customer_index_by_id,
            customer_index_by_name,
            item_index_by_id,
            variants_by_id,
        }
    }

    /// Customers in load order, for prompt construction.
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// Items in load order, for prompt construction.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn customer(&self, id: &CustomerId) -> Option<&Customer> {
        self.customer_index_by_id.get(id).map(|index| &self.customers[*index])
    }

    pub fn customer_name(&self, id: &CustomerId) -> &str {
        self.customer(id).map(|customer| customer.name.as_str()).unwrap_or(UNKNOWN_NAME)
    }

    /// Case-insensitive, whitespace-trimmed name lookup.
    pub fn customer_by_name(&self, name: &str) -> Option<&Customer> {
        self.customer_index_by_name
            .get(&normalize_name(name))
            .map(|index| &self.customers[*index])
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.item_index_by_id.get(id).map(|index| &self.items[*index])
    }

    pub fn variant(&self, id: &VariantId) -> Option<&VariantRef> {
        self.variants_by_id.get(id)
    }

    /// Display names for an (item, variant) pair. Unresolved references come
    /// back as placeholders rather than errors.
    pub fn resolve_line(&self, item_id: &ItemId, variant_id: &VariantId) -> ResolvedLine {
        let item_name = self
            .item(item_id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());
        let variant_code = self
            .variant(variant_id)
            .map(|variant_ref| variant_ref.variant.variant_code.clone())
            .unwrap_or_else(|| UNKNOWN_VARIANT_CODE.to_string());

        ResolvedLine { item_name, variant_code }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::domain::customer::{Customer, CustomerId};
    use crate::domain::item::{Item, ItemId, ItemVariant, VariantId};

    use super::{CatalogIndex, UNKNOWN_NAME, UNKNOWN_VARIANT_CODE};

    fn customer(name: &str) -> Customer {
        Customer {
            id: CustomerId(Uuid::new_v4()),
            name: name.to_string(),
            email: None,
            phone: None,
            notes: None,
            item_notes: Vec::new(),
        }
    }

    fn basil() -> Item {
        Item {
            id: ItemId(Uuid::new_v4()),
            sku: "MG-BAS".to_string(),
            name: "Basil".to_string(),
            description: None,
            variants: vec![
                ItemVariant {
                    id: VariantId(Uuid::new_v4()),
                    variant_code: "S".to_string(),
                    variant_name: "Small".to_string(),
                    notes: None,
                },
                ItemVariant {
                    id: VariantId(Uuid::new_v4()),
                    variant_code: "L".to_string(),
                    variant_name: "Large".to_string(),
                    notes: None,
                },
            ],
        }
    }

    #[test]
    fn name_lookup_is_case_insensitive_and_trimmed() {
        let index = CatalogIndex::build(vec![customer("Cafe Sushi")], vec![]);

        assert!(index.customer_by_name("  cafe sushi ").is_some());
        assert!(index.customer_by_name("CAFE SUSHI").is_some());
        assert!(index.customer_by_name("Cafe Sush").is_none());
    }

    #[test]
    fn variants_carry_parent_item_back_reference() {
        let item = basil();
        let variant_id = item.variants[1].id.clone();
        let item_id = item.id.clone();
        let index = CatalogIndex::build(vec![], vec![item]);

        let variant_ref = index.variant(&variant_id).expect("variant indexed");
        assert_eq!(variant_ref.item_id, item_id);
        assert_eq!(variant_ref.item_name, "Basil");
        assert_eq!(variant_ref.variant.variant_code, "L");
    }

    #[test]
    fn unresolved_references_resolve_to_placeholders() {
        let index = CatalogIndex::build(vec![], vec![]);

        let resolved =
            index.resolve_line(&ItemId(Uuid::new_v4()), &VariantId(Uuid::new_v4()));
        assert_eq!(resolved.item_name, UNKNOWN_NAME);
        assert_eq!(resolved.variant_code, UNKNOWN_VARIANT_CODE);

        assert_eq!(index.customer_name(&CustomerId(Uuid::new_v4())), UNKNOWN_NAME);
    }

    #[test]
    fn resolve_line_uses_display_names() {
        let item = basil();
        let item_id = item.id.clone();
        let small = item.variants[0].id.clone();
        let index = CatalogIndex::build(vec![], vec![item]);

        let resolved = index.resolve_line(&item_id, &small);
        assert_eq!(resolved.item_name, "Basil");
        assert_eq!(resolved.variant_code, "S");
    }
}
