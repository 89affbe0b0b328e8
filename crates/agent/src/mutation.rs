//! Side-effecting operations behind the tool catalog.
//!
//! Each operation translates validated arguments into store writes and
//! returns a structured summary for the engine. Failures surface as
//! `ToolError` values; the orchestration loop serializes them into the
//! tool-result slot instead of aborting.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

use orderly_core::catalog::CatalogIndex;
use orderly_core::config::WriteMode;
use orderly_core::domain::item::{ItemId, VariantId};
use orderly_core::domain::order::{
    validate_delivery_date, LineStatus, Order, OrderEvent, OrderId, OrderLine, OrderLineId,
    OrderStatus, EVENT_CHANGE_PROPOSED, EVENT_CREATED,
};
use orderly_core::domain::proposal::{
    ChangeType, OrderFrequency, Proposal, ProposalId, ProposalLine, ProposalLineId,
    ProposalStatus, ProposalTags, ProposalType, ProposedValues,
};
use orderly_db::{OrderRepository, ProposalRepository};

use crate::tools::{
    CancelOrderArgs, CreateOrderArgs, GetExistingOrdersArgs, ItemChange, ItemChangeType,
    ModifyOrderArgs, ToolCall, ToolError,
};

/// Cap on orders returned by a single `get_existing_orders` call.
const OPEN_ORDER_LIMIT: u32 = 5;

const SOURCE_CHANNEL_ERP: &str = "erp";

pub struct MutationEngine {
    orders: Arc<dyn OrderRepository>,
    proposals: Arc<dyn ProposalRepository>,
    catalog: Arc<CatalogIndex>,
    mode: WriteMode,
    today: NaiveDate,
}

impl MutationEngine {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        proposals: Arc<dyn ProposalRepository>,
        catalog: Arc<CatalogIndex>,
        mode: WriteMode,
        today: NaiveDate,
    ) -> Self {
        Self { orders, proposals, catalog, mode, today }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    pub async fn execute(&self, call: ToolCall) -> Result<Value, ToolError> {
        match call {
            ToolCall::GetExistingOrders(args) => self.fetch_open_orders(args).await,
            ToolCall::CreateOrder(args) => self.create_order(args).await,
            ToolCall::ModifyOrder(args) => self.modify_order(args).await,
            ToolCall::CancelOrder(args) => self.cancel_order(args).await,
        }
    }

    async fn fetch_open_orders(&self, args: GetExistingOrdersArgs) -> Result<Value, ToolError> {
        let orders = self
            .orders
            .open_orders_for_customer(&args.customer_id, self.today, args.delivery_date, OPEN_ORDER_LIMIT)
            .await?;

        let date_filter =
            args.delivery_date.map(|date| date.to_string()).unwrap_or_else(|| "any".to_string());
        tracing::info!(
            customer = self.catalog.customer_name(&args.customer_id),
            delivery_date = %date_filter,
            found = orders.len(),
            "fetched open orders"
        );

        Ok(Value::Array(orders.iter().map(order_payload).collect()))
    }

    async fn create_order(&self, args: CreateOrderArgs) -> Result<Value, ToolError> {
        validate_delivery_date(args.delivery_date, self.today)
            .map_err(|error| ToolError::Validation(error.to_string()))?;
        if args.items.is_empty() {
            return Err(ToolError::Validation("items must not be empty".to_string()));
        }
        for item in &args.items {
            self.check_variant_parent(&item.item_id, &item.variant_id)?;
        }

        let customer_name = self.catalog.customer_name(&args.customer_id).to_string();

        match self.mode {
            WriteMode::Direct => {
                let order_id = OrderId(Uuid::new_v4());
                let order = Order {
                    id: order_id.clone(),
                    customer_id: args.customer_id.clone(),
                    customer_name: customer_name.clone(),
                    delivery_date: args.delivery_date,
                    status: OrderStatus::Ready,
                    source_channel: SOURCE_CHANNEL_ERP.to_string(),
                    lines: Vec::new(),
                };
                self.orders.insert_order(&order).await?;

                for (index, item) in args.items.iter().enumerate() {
                    let resolved = self.catalog.resolve_line(&item.item_id, &item.variant_id);
                    self.orders
                        .insert_line(&OrderLine {
                            id: OrderLineId(Uuid::new_v4()),
                            order_id: order_id.clone(),
                            line_number: index as u32 + 1,
                            item_id: item.item_id.clone(),
                            variant_id: item.variant_id.clone(),
                            product_name: resolved.item_name,
                            quantity: item.quantity,
                            status: LineStatus::Active,
                        })
                        .await?;
                }

                self.orders
                    .append_event(&OrderEvent {
                        order_id: order_id.clone(),
                        event_type: EVENT_CREATED.to_string(),
                        metadata: json!({
                            "source": "sheet_sync",
                            "source_channel": SOURCE_CHANNEL_ERP,
                        }),
                    })
                    .await?;

                tracing::info!(
                    order_id = %order_id.0,
                    customer = %customer_name,
                    delivery_date = %args.delivery_date,
                    lines = args.items.len(),
                    "order created"
                );

                Ok(json!({
                    "order_id": order_id.0,
                    "customer_name": customer_name,
                    "delivery_date": args.delivery_date,
                    "lines_created": args.items.len(),
                }))
            }
            WriteMode::Review => {
                let proposal_id = self
                    .insert_proposal(ProposalType::NewOrder, None, args.order_frequency)
                    .await?;

                for (index, item) in args.items.iter().enumerate() {
                    let resolved = self.catalog.resolve_line(&item.item_id, &item.variant_id);
                    self.proposals
                        .insert_line(&ProposalLine {
                            id: ProposalLineId(Uuid::new_v4()),
                            proposal_id: proposal_id.clone(),
                            line_number: index as u32 + 1,
                            item_id: item.item_id.clone(),
                            item_name: resolved.item_name,
                            variant_id: item.variant_id.clone(),
                            change_type: ChangeType::Add,
                            order_line_id: None,
                            proposed: ProposedValues {
                                quantity: item.quantity,
                                variant_code: resolved.variant_code,
                                delivery_date: args.delivery_date,
                                customer_id: args.customer_id.clone(),
                                customer_name: customer_name.clone(),
                            },
                        })
                        .await?;
                }

                tracing::info!(
                    proposal_id = %proposal_id.0,
                    customer = %customer_name,
                    delivery_date = %args.delivery_date,
                    lines = args.items.len(),
                    "new-order proposal created"
                );

                Ok(json!({
                    "proposal_id": proposal_id.0,
                    "type": ProposalType::NewOrder.as_str(),
                    "lines_created": args.items.len(),
                    "delivery_date": args.delivery_date,
                    "customer_name": customer_name,
                }))
            }
        }
    }

    async fn modify_order(&self, args: ModifyOrderArgs) -> Result<Value, ToolError> {
        let existing = self
            .orders
            .find_order(&args.order_id)
            .await?
            .ok_or_else(|| ToolError::DataReference(format!("order {} not found", args.order_id.0)))?;

        let customer_id = args.changes.customer_id.clone().unwrap_or(existing.customer_id);
        let delivery_date = args.changes.delivery_date.unwrap_or(existing.delivery_date);
        let customer_name = self.catalog.customer_name(&customer_id).to_string();

        // Resolve every item change before writing anything, so a bad change
        // set fails whole rather than leaving a half-built proposal behind.
        let mut resolved_changes = Vec::with_capacity(args.changes.items.len());
        for change in &args.changes.items {
            resolved_changes.push(self.resolve_change(change).await?);
        }

        let proposal_id = self
            .insert_proposal(
                ProposalType::ChangeOrder,
                Some(args.order_id.clone()),
                args.order_frequency,
            )
            .await?;

        for (index, change) in resolved_changes.iter().enumerate() {
            let resolved = self.catalog.resolve_line(&change.item_id, &change.variant_id);
            self.proposals
                .insert_line(&ProposalLine {
                    id: ProposalLineId(Uuid::new_v4()),
                    proposal_id: proposal_id.clone(),
                    line_number: index as u32 + 1,
                    item_id: change.item_id.clone(),
                    item_name: resolved.item_name,
                    variant_id: change.variant_id.clone(),
                    change_type: change.change_type,
                    order_line_id: change.order_line_id.clone(),
                    proposed: ProposedValues {
                        quantity: change.quantity,
                        variant_code: resolved.variant_code,
                        delivery_date,
                        customer_id: customer_id.clone(),
                        customer_name: customer_name.clone(),
                    },
                })
                .await?;
        }

        // The order itself is never mutated here; it is parked for review.
        self.orders.update_status(&args.order_id, OrderStatus::PendingReview).await?;
        self.orders
            .append_event(&OrderEvent {
                order_id: args.order_id.clone(),
                event_type: EVENT_CHANGE_PROPOSED.to_string(),
                metadata: json!({"proposal_id": proposal_id.0, "source": "agent"}),
            })
            .await?;

        tracing::info!(
            proposal_id = %proposal_id.0,
            order_id = %args.order_id.0,
            customer = %customer_name,
            lines = resolved_changes.len(),
            "change-order proposal created"
        );

        Ok(json!({
            "proposal_id": proposal_id.0,
            "type": ProposalType::ChangeOrder.as_str(),
            "lines_created": resolved_changes.len(),
            "delivery_date": delivery_date,
            "customer_name": customer_name,
        }))
    }

    async fn cancel_order(&self, args: CancelOrderArgs) -> Result<Value, ToolError> {
        self.orders
            .find_order(&args.order_id)
            .await?
            .ok_or_else(|| ToolError::DataReference(format!("order {} not found", args.order_id.0)))?;

        let customer_name = self.catalog.customer_name(&args.customer_id).to_string();
        let proposal_id = self
            .insert_proposal(
                ProposalType::CancelOrder,
                Some(args.order_id.clone()),
                args.order_frequency,
            )
            .await?;

        // Cancellation is proposed, never applied here; the order survives
        // under pending review.
        self.orders.update_status(&args.order_id, OrderStatus::PendingReview).await?;
        self.orders
            .append_event(&OrderEvent {
                order_id: args.order_id.clone(),
                event_type: EVENT_CHANGE_PROPOSED.to_string(),
                metadata: json!({
                    "proposal_id": proposal_id.0,
                    "source": "agent",
                    "intent": ProposalType::CancelOrder.as_str(),
                }),
            })
            .await?;

        tracing::info!(
            proposal_id = %proposal_id.0,
            order_id = %args.order_id.0,
            customer = %customer_name,
            "cancel-order proposal created"
        );

        Ok(json!({
            "proposal_id": proposal_id.0,
            "type": ProposalType::CancelOrder.as_str(),
            "customer_name": customer_name,
        }))
    }

    async fn insert_proposal(
        &self,
        proposal_type: ProposalType,
        order_id: Option<OrderId>,
        order_frequency: OrderFrequency,
    ) -> Result<ProposalId, ToolError> {
        let proposal = Proposal {
            id: ProposalId(Uuid::new_v4()),
            proposal_type,
            order_id,
            status: ProposalStatus::Pending,
            tags: ProposalTags::agent(order_frequency),
        };
        self.proposals.insert_proposal(&proposal).await?;
        Ok(proposal.id)
    }

    async fn resolve_change(&self, change: &ItemChange) -> Result<ResolvedChange, ToolError> {
        change.validate()?;

        match change.change {
            ItemChangeType::Add => {
                let item_id = change
                    .item_id
                    .clone()
                    .ok_or_else(|| missing_field("add", "item_id"))?;
                let variant_id = change
                    .variant_id
                    .clone()
                    .ok_or_else(|| missing_field("add", "variant_id"))?;
                let quantity =
                    change.quantity.ok_or_else(|| missing_field("add", "quantity"))?;
                self.check_variant_parent(&item_id, &variant_id)?;

                Ok(ResolvedChange {
                    change_type: ChangeType::Add,
                    order_line_id: None,
                    item_id,
                    variant_id,
                    quantity,
                })
            }
            ItemChangeType::Update => {
                let line = self.target_line(change, "update").await?;
                Ok(ResolvedChange {
                    change_type: ChangeType::Modify,
                    order_line_id: Some(line.id.clone()),
                    // Omitted fields fall back to the persisted line values.
                    item_id: change.item_id.clone().unwrap_or(line.item_id),
                    variant_id: change.variant_id.clone().unwrap_or(line.variant_id),
                    quantity: change.quantity.unwrap_or(line.quantity),
                })
            }
            ItemChangeType::Remove => {
                let line = self.target_line(change, "remove").await?;
                Ok(ResolvedChange {
                    change_type: ChangeType::Remove,
                    order_line_id: Some(line.id.clone()),
                    item_id: line.item_id,
                    variant_id: line.variant_id,
                    quantity: line.quantity,
                })
            }
        }
    }

    /// A variant that resolves must belong to the item it is paired with.
    /// Unresolved references stay permissive (they render as placeholders).
    fn check_variant_parent(
        &self,
        item_id: &ItemId,
        variant_id: &VariantId,
    ) -> Result<(), ToolError> {
        if let Some(variant_ref) = self.catalog.variant(variant_id) {
            if self.catalog.item(item_id).is_some() && variant_ref.item_id != *item_id {
                return Err(ToolError::Validation(format!(
                    "variant {} belongs to item `{}`, not the requested item",
                    variant_id.0, variant_ref.item_name
                )));
            }
        }
        Ok(())
    }

    async fn target_line(
        &self,
        change: &ItemChange,
        change_name: &str,
    ) -> Result<OrderLine, ToolError> {
        let line_id = change
            .order_line_id
            .clone()
            .ok_or_else(|| missing_field(change_name, "order_line_id"))?;

        self.orders
            .find_line(&line_id)
            .await?
            .ok_or_else(|| ToolError::DataReference(format!("order line {} not found", line_id.0)))
    }
}

struct ResolvedChange {
    change_type: ChangeType,
    order_line_id: Option<OrderLineId>,
    item_id: ItemId,
    variant_id: VariantId,
    quantity: f64,
}

fn missing_field(change_name: &str, field: &str) -> ToolError {
    ToolError::Validation(format!("{change_name} change requires {field}"))
}

fn order_payload(order: &Order) -> Value {
    json!({
        "id": order.id.0,
        "delivery_date": order.delivery_date,
        "status": order.status.as_str(),
        "order_lines": order
            .lines
            .iter()
            .map(|line| json!({
                "id": line.id.0,
                "line_number": line.line_number,
                "item_id": line.item_id.0,
                "item_variant_id": line.variant_id.0,
                "product_name": line.product_name,
                "quantity": line.quantity,
                "status": line.status.as_str(),
            }))
            .collect::<Vec<Value>>(),
    })
}
