//! Tool catalog and argument validation.
//!
//! Tool arguments arrive as loose JSON from the engine. Each tool gets its
//! own typed variant; decoding happens once at the dispatch boundary, so the
//! mutation engine only ever sees validated arguments.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use orderly_core::config::WriteMode;
use orderly_core::domain::customer::CustomerId;
use orderly_core::domain::item::{ItemId, VariantId};
use orderly_core::domain::order::{OrderId, OrderLineId};
use orderly_core::domain::proposal::OrderFrequency;
use orderly_db::RepositoryError;

use crate::engine::ToolSpec;

pub const TOOL_GET_EXISTING_ORDERS: &str = "get_existing_orders";
pub const TOOL_CREATE_ORDER: &str = "create_order";
pub const TOOL_MODIFY_ORDER: &str = "modify_order";
pub const TOOL_CANCEL_ORDER: &str = "cancel_order";

/// Tool failures surfaced back to the engine as tool-result errors. None of
/// these abort the orchestration loop.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("data reference error: {0}")]
    DataReference(String),
    #[error("store error: {0}")]
    Store(String),
}

impl From<RepositoryError> for ToolError {
    fn from(error: RepositoryError) -> Self {
        Self::Store(error.to_string())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GetExistingOrdersArgs {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct NewOrderItem {
    pub item_id: ItemId,
    pub variant_id: VariantId,
    pub quantity: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CreateOrderArgs {
    pub customer_id: CustomerId,
    pub delivery_date: NaiveDate,
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub order_frequency: OrderFrequency,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemChangeType {
    Add,
    Update,
    Remove,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ItemChange {
    #[serde(rename = "type")]
    pub change: ItemChangeType,
    #[serde(default)]
    pub order_line_id: Option<OrderLineId>,
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default)]
    pub quantity: Option<f64>,
}

impl ItemChange {
    /// Which fields are required depends on the change type.
    pub fn validate(&self) -> Result<(), ToolError> {
        match self.change {
            ItemChangeType::Add => {
                if self.item_id.is_none() || self.variant_id.is_none() || self.quantity.is_none()
                {
                    return Err(ToolError::Validation(
                        "add change requires item_id, variant_id, and quantity".to_string(),
                    ));
                }
            }
            ItemChangeType::Update | ItemChangeType::Remove => {
                if self.order_line_id.is_none() {
                    return Err(ToolError::Validation(format!(
                        "{} change requires order_line_id",
                        match self.change {
                            ItemChangeType::Update => "update",
                            _ => "remove",
                        }
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct OrderChanges {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<ItemChange>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ModifyOrderArgs {
    pub order_id: OrderId,
    pub changes: OrderChanges,
    #[serde(default)]
    pub order_frequency: OrderFrequency,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CancelOrderArgs {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    #[serde(default)]
    pub order_frequency: OrderFrequency,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ToolCall {
    GetExistingOrders(GetExistingOrdersArgs),
    CreateOrder(CreateOrderArgs),
    ModifyOrder(ModifyOrderArgs),
    CancelOrder(CancelOrderArgs),
}

impl ToolCall {
    pub fn parse(name: &str, input: Value) -> Result<Self, ToolError> {
        match name {
            TOOL_GET_EXISTING_ORDERS => {
                serde_json::from_value(input).map(Self::GetExistingOrders).map_err(invalid_args)
            }
            TOOL_CREATE_ORDER => {
                serde_json::from_value(input).map(Self::CreateOrder).map_err(invalid_args)
            }
            TOOL_MODIFY_ORDER => {
                serde_json::from_value(input).map(Self::ModifyOrder).map_err(invalid_args)
            }
            TOOL_CANCEL_ORDER => {
                serde_json::from_value(input).map(Self::CancelOrder).map_err(invalid_args)
            }
            other => Err(ToolError::Validation(format!("unknown tool `{other}`"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetExistingOrders(_) => TOOL_GET_EXISTING_ORDERS,
            Self::CreateOrder(_) => TOOL_CREATE_ORDER,
            Self::ModifyOrder(_) => TOOL_MODIFY_ORDER,
            Self::CancelOrder(_) => TOOL_CANCEL_ORDER,
        }
    }
}

fn invalid_args(error: serde_json::Error) -> ToolError {
    ToolError::Validation(format!("invalid tool arguments: {error}"))
}

/// The tools offered to the engine. The sheet feed only creates, so direct
/// mode exposes the read/create pair; review mode adds change and cancel.
pub fn tool_catalog(mode: WriteMode) -> Vec<ToolSpec> {
    let mut tools = vec![get_existing_orders_spec(mode), create_order_spec(mode)];
    if mode == WriteMode::Review {
        tools.push(modify_order_spec());
        tools.push(cancel_order_spec());
    }
    tools
}

fn get_existing_orders_spec(mode: WriteMode) -> ToolSpec {
    let description = match mode {
        WriteMode::Direct => {
            "Check if a customer already has an order for a specific delivery date. \
             If an order already exists, SKIP that customer - do not create a duplicate."
        }
        WriteMode::Review => {
            "Get a customer's upcoming orders (delivery_date >= today). Use this to \
             determine if the incoming order is NEW or a CHANGE to an existing order. \
             Returns order ID, delivery date, status, and current line items."
        }
    };

    ToolSpec {
        name: TOOL_GET_EXISTING_ORDERS.to_string(),
        description: description.to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "customer_id": {"type": "string", "description": "The customer UUID"},
                "delivery_date": {
                    "type": "string",
                    "description": "Optional: filter to a specific date (YYYY-MM-DD)"
                }
            },
            "required": ["customer_id"]
        }),
    }
}

fn create_order_spec(mode: WriteMode) -> ToolSpec {
    let description = match mode {
        WriteMode::Direct => {
            "Create a new order directly in the system. Only call this if \
             get_existing_orders returned NO existing order for this customer + date."
        }
        WriteMode::Review => {
            "Create a proposal for a brand new order. Use this when NO existing order \
             exists for this customer + delivery date."
        }
    };

    ToolSpec {
        name: TOOL_CREATE_ORDER.to_string(),
        description: description.to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "customer_id": {"type": "string"},
                "delivery_date": {"type": "string", "description": "YYYY-MM-DD"},
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "item_id": {"type": "string", "description": "Item UUID from the catalog"},
                            "variant_id": {"type": "string", "description": "Variant UUID from the catalog"},
                            "quantity": {"type": "number"}
                        },
                        "required": ["item_id", "variant_id", "quantity"]
                    }
                },
                "order_frequency": {
                    "type": "string",
                    "enum": ["one-time", "recurring"],
                    "description": "Whether this is a one-time order or a recurring/standing order"
                }
            },
            "required": ["customer_id", "delivery_date", "items"]
        }),
    }
}

fn modify_order_spec() -> ToolSpec {
    ToolSpec {
        name: TOOL_MODIFY_ORDER.to_string(),
        description: "Modify an existing order. Provide the order_id and a changes object \
                      describing what to change."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "order_id": {"type": "string", "description": "The existing order UUID"},
                "changes": {
                    "type": "object",
                    "description": "Fields to change. All are optional - only include what's changing.",
                    "properties": {
                        "customer_id": {"type": "string", "description": "New customer ID, if the order is being reassigned"},
                        "delivery_date": {"type": "string", "description": "New delivery date (YYYY-MM-DD), if the date is changing"},
                        "items": {
                            "type": "array",
                            "description": "Item-level changes (add/update/remove)",
                            "items": {
                                "type": "object",
                                "description": "A single item change. The 'type' field determines which other fields are expected:\n- add: requires item_id, variant_id, quantity\n- update: requires order_line_id, plus any fields being changed (variant_id, quantity)\n- remove: requires order_line_id only",
                                "properties": {
                                    "type": {"type": "string", "enum": ["add", "update", "remove"]},
                                    "order_line_id": {"type": "string", "description": "Existing order_line ID from get_existing_orders. Required for update/remove."},
                                    "item_id": {"type": "string", "description": "Item UUID. Required for add."},
                                    "variant_id": {"type": "string", "description": "Variant UUID. Required for add. Optional for update (only if variant is changing)."},
                                    "quantity": {"type": "number", "description": "Required for add. Optional for update (only if quantity is changing)."}
                                },
                                "required": ["type"]
                            }
                        }
                    }
                },
                "order_frequency": {
                    "type": "string",
                    "enum": ["one-time", "recurring"],
                    "description": "Whether this is a one-time change or a recurring/standing order change"
                }
            },
            "required": ["order_id", "changes"]
        }),
    }
}

fn cancel_order_spec() -> ToolSpec {
    ToolSpec {
        name: TOOL_CANCEL_ORDER.to_string(),
        description: "Cancel an existing order entirely.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "order_id": {"type": "string", "description": "The existing order UUID"},
                "customer_id": {"type": "string"},
                "order_frequency": {
                    "type": "string",
                    "enum": ["one-time", "recurring"],
                    "description": "Whether this cancels a one-time order or a recurring/standing order"
                }
            },
            "required": ["order_id", "customer_id"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use orderly_core::config::WriteMode;
    use orderly_core::domain::proposal::OrderFrequency;

    use super::{
        tool_catalog, ItemChange, ItemChangeType, ToolCall, ToolError, TOOL_CREATE_ORDER,
        TOOL_MODIFY_ORDER,
    };

    #[test]
    fn direct_catalog_has_no_change_tools() {
        let names: Vec<String> =
            tool_catalog(WriteMode::Direct).into_iter().map(|tool| tool.name).collect();
        assert_eq!(names, vec!["get_existing_orders", "create_order"]);

        let names: Vec<String> =
            tool_catalog(WriteMode::Review).into_iter().map(|tool| tool.name).collect();
        assert_eq!(
            names,
            vec!["get_existing_orders", "create_order", "modify_order", "cancel_order"]
        );
    }

    #[test]
    fn create_order_args_decode_with_frequency_default() {
        let call = ToolCall::parse(
            TOOL_CREATE_ORDER,
            json!({
                "customer_id": "11111111-1111-1111-1111-111111111111",
                "delivery_date": "2026-03-03",
                "items": [
                    {"item_id": "22222222-2222-2222-2222-222222222222",
                     "variant_id": "33333333-3333-3333-3333-333333333333",
                     "quantity": 3}
                ]
            }),
        )
        .expect("parse create_order");

        let ToolCall::CreateOrder(args) = call else { panic!("wrong variant") };
        assert_eq!(args.items.len(), 1);
        assert_eq!(args.order_frequency, OrderFrequency::OneTime);
    }

    #[test]
    fn missing_required_field_is_a_validation_error() {
        let error = ToolCall::parse(
            TOOL_CREATE_ORDER,
            json!({"customer_id": "11111111-1111-1111-1111-111111111111"}),
        )
        .expect_err("missing fields");

        assert!(matches!(error, ToolError::Validation(_)));
    }

    #[test]
    fn unknown_tool_is_a_validation_error() {
        let error = ToolCall::parse("delete_everything", json!({})).expect_err("unknown tool");
        assert!(matches!(error, ToolError::Validation(_)));
    }

    #[test]
    fn modify_args_accept_sparse_changes() {
        let call = ToolCall::parse(
            TOOL_MODIFY_ORDER,
            json!({
                "order_id": "44444444-4444-4444-4444-444444444444",
                "changes": {
                    "items": [{"type": "remove",
                               "order_line_id": "55555555-5555-5555-5555-555555555555"}]
                }
            }),
        )
        .expect("parse modify_order");

        let ToolCall::ModifyOrder(args) = call else { panic!("wrong variant") };
        assert!(args.changes.customer_id.is_none());
        assert!(args.changes.delivery_date.is_none());
        assert_eq!(args.changes.items.len(), 1);
        assert_eq!(args.changes.items[0].change, ItemChangeType::Remove);
    }

    #[test]
    fn item_change_validation_tracks_change_type() {
        let add_missing_fields = ItemChange {
            change: ItemChangeType::Add,
            order_line_id: None,
            item_id: None,
            variant_id: None,
            quantity: None,
        };
        assert!(add_missing_fields.validate().is_err());

        let remove_without_target = ItemChange {
            change: ItemChangeType::Remove,
            order_line_id: None,
            item_id: None,
            variant_id: None,
            quantity: None,
        };
        assert!(remove_without_target.validate().is_err());
    }
}
