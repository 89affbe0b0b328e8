//! End-to-end flow for one harvest-day feed: chunked scan, window
//! selection, idempotency prefilter, then the agent loop against a scripted
//! engine and in-memory repositories.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use orderly_agent::engine::{
    ContentBlock, DecisionEngine, EngineError, EngineResponse, Message, StopReason, TokenUsage,
    ToolSpec,
};
use orderly_agent::mutation::MutationEngine;
use orderly_agent::prefilter::IdempotencyPrefilter;
use orderly_agent::prompt::{build_system_prompt, build_user_message};
use orderly_agent::report::{RunSummary, SectionReport};
use orderly_agent::runtime::OrchestrationLoop;
use orderly_agent::tools::tool_catalog;
use orderly_core::catalog::CatalogIndex;
use orderly_core::config::WriteMode;
use orderly_core::domain::customer::{Customer, CustomerId};
use orderly_core::domain::item::{Item, ItemId, ItemVariant, VariantId};
use orderly_core::domain::order::{
    LineStatus, Order, OrderId, OrderLine, OrderLineId, OrderStatus,
};
use orderly_core::domain::section::SheetSection;
use orderly_db::{InMemoryOrderRepository, InMemoryProposalRepository};
use orderly_sheets::{collect_sections, InMemorySheet, SectionLabel, SectionScanner, WindowFilter};

const CAFE_SUSHI: Uuid = Uuid::from_u128(0xC1);
const JUNIPER: Uuid = Uuid::from_u128(0xC2);
const PEA_SHOOTS: Uuid = Uuid::from_u128(0xB1);
const PEA_SHOOTS_T20: Uuid = Uuid::from_u128(0xB2);

struct ScriptedEngine {
    script: Mutex<VecDeque<EngineResponse>>,
}

impl ScriptedEngine {
    fn new(script: Vec<EngineResponse>) -> Self {
        Self { script: Mutex::new(script.into()) }
    }
}

#[async_trait]
impl DecisionEngine for ScriptedEngine {
    async fn complete(
        &self,
        _system: &str,
        _tools: &[ToolSpec],
        _messages: &[Message],
    ) -> Result<EngineResponse, EngineError> {
        Ok(self.script.lock().expect("script lock").pop_front().unwrap_or(EngineResponse {
            content: vec![ContentBlock::Text { text: "done".to_string() }],
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage { input_tokens: 1, output_tokens: 1 },
        }))
    }
}

fn catalog() -> CatalogIndex {
    let customers = vec![
        Customer {
            id: CustomerId(CAFE_SUSHI),
            name: "Cafe Sushi".to_string(),
            email: None,
            phone: None,
            notes: None,
            item_notes: Vec::new(),
        },
        Customer {
            id: CustomerId(JUNIPER),
            name: "Juniper".to_string(),
            email: None,
            phone: None,
            notes: None,
            item_notes: Vec::new(),
        },
    ];
    let items = vec![Item {
        id: ItemId(PEA_SHOOTS),
        sku: "MG-PEA".to_string(),
        name: "Pea Shoots".to_string(),
        description: None,
        variants: vec![ItemVariant {
            id: VariantId(PEA_SHOOTS_T20),
            variant_code: "T20".to_string(),
            variant_name: "Tray 20".to_string(),
            notes: None,
        }],
    }];
    CatalogIndex::build(customers, items)
}

fn fixture_sheet() -> InMemorySheet {
    InMemorySheet::from_rows([
        ["", "", "", "Friday Harvests", "", "", ""],
        ["", "", "", "Friday, March 6, 2026", "", "", ""],
        ["", "", "", "Customer", "Product", "Size", "Qty"],
        ["", "", "", "Cafe Sushi", "Basil", "L", "3"],
        ["", "", "", "Cafe Sushi", "Arugula", "S", "2"],
        ["", "", "", "Juniper", "Pea Shoots", "T20", "1"],
    ])
}

async fn seeded_orders() -> Arc<InMemoryOrderRepository> {
    let orders = Arc::new(InMemoryOrderRepository::default());
    let order_id = OrderId(Uuid::from_u128(0xD1));
    orders
        .insert_full(Order {
            id: order_id.clone(),
            customer_id: CustomerId(CAFE_SUSHI),
            customer_name: "Cafe Sushi".to_string(),
            delivery_date: NaiveDate::from_ymd_opt(2026, 3, 6).expect("date"),
            status: OrderStatus::Ready,
            source_channel: "erp".to_string(),
            lines: vec![OrderLine {
                id: OrderLineId(Uuid::from_u128(0xD2)),
                order_id,
                line_number: 1,
                item_id: ItemId(PEA_SHOOTS),
                variant_id: VariantId(PEA_SHOOTS_T20),
                product_name: "Pea Shoots".to_string(),
                quantity: 2.0,
                status: LineStatus::Active,
            }],
        })
        .await;
    orders
}

#[tokio::test]
async fn day_feed_flows_from_scan_to_created_order() {
    let today = NaiveDate::from_ymd_opt(2026, 3, 2).expect("date");
    let sheet = fixture_sheet();
    let catalog = Arc::new(catalog());
    let orders = seeded_orders().await;
    let proposals = Arc::new(InMemoryProposalRepository::default());

    // Scan + window.
    let scanned = SectionScanner::new(2)
        .scan(&sheet, &SectionLabel::new("friday", "Harvests"))
        .await
        .expect("scan");
    let sections =
        collect_sections(&sheet, &scanned, &WindowFilter::new(today, 7)).await.expect("window");
    assert_eq!(sections.len(), 1);
    let section = sections.into_iter().next().expect("one section");
    assert_eq!(section.rows.len(), 3);

    // Prefilter: Cafe Sushi already holds a live order for the date; its two
    // rows collapse into one skip record and never reach the engine.
    let prefilter = IdempotencyPrefilter::new(orders.as_ref(), &catalog);
    let outcome = prefilter.partition(&section).await.expect("prefilter");
    assert_eq!(outcome.pre_skipped.len(), 1);
    assert_eq!(outcome.pre_skipped[0].customer_name, "Cafe Sushi");
    assert_eq!(outcome.keep.len(), 1);
    assert_eq!(outcome.keep[0].customer, "Juniper");

    let filtered = SheetSection { rows: outcome.keep, ..section };

    // Scripted engine: one create_order for Juniper, then a natural end.
    let engine = Arc::new(ScriptedEngine::new(vec![EngineResponse {
        content: vec![ContentBlock::ToolUse {
            id: "toolu_01".to_string(),
            name: "create_order".to_string(),
            input: json!({
                "customer_id": JUNIPER,
                "delivery_date": "2026-03-06",
                "items": [{"item_id": PEA_SHOOTS, "variant_id": PEA_SHOOTS_T20, "quantity": 1}]
            }),
        }],
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage { input_tokens: 900, output_tokens: 60 },
    }]));

    let mutation = MutationEngine::new(
        orders.clone(),
        proposals,
        catalog.clone(),
        WriteMode::Direct,
        today,
    );
    let orchestration = OrchestrationLoop::new(
        engine,
        mutation,
        catalog.clone(),
        build_system_prompt(&catalog, today, WriteMode::Direct),
        tool_catalog(WriteMode::Direct),
        100,
    );

    let result = orchestration.run(build_user_message(&filtered)).await.expect("loop");
    assert!(result.success);
    assert_eq!(result.created.len(), 1);
    assert_eq!(result.created[0].customer_name, "Juniper");
    assert!(result.errors.is_empty());

    // Juniper's order landed next to the pre-existing one.
    assert_eq!(orders.order_count().await, 2);

    // Every sheet row is accounted for in the summary.
    let summary = RunSummary {
        sections: vec![SectionReport {
            day: filtered.day_label.clone(),
            date: filtered.date,
            rows: filtered.rows.len(),
            created: result.created.len(),
            skipped: outcome.pre_skipped.len(),
            errors: result.errors.len(),
            turns: result.turns,
            success: result.success,
        }],
        created: result.created,
        skipped: outcome.pre_skipped,
        errors: result.errors,
        usage: result.usage,
    };
    let rendered = summary.render();
    assert!(rendered.contains("Friday 2026-03-06 [OK]"));
    assert!(rendered.contains("Juniper"));
    assert!(rendered.contains("Cafe Sushi"));
    assert!(rendered.contains("Total: 1 created, 1 skipped, 0 errors"));
}
