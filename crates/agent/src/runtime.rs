//! Bounded-turn orchestration between the decision engine and the mutation
//! engine.
//!
//! One loop handles one date section. The conversation history is an explicit
//! value threaded through each turn; tool invocations execute in the order
//! the engine emitted them, and their results return in that same order,
//! each tagged with the originating invocation id. A tool failure is
//! serialized into its result slot and logged; it never aborts the loop.

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use orderly_core::catalog::CatalogIndex;
use orderly_core::config::WriteMode;
use orderly_core::domain::customer::CustomerId;

use crate::engine::{ContentBlock, DecisionEngine, EngineError, Message, TokenUsage, ToolSpec};
use crate::mutation::MutationEngine;
use crate::report::{CreatedRecord, SkipRecord, ToolFailure, SKIP_REASON_EXISTING_ORDER};
use crate::tools::{ToolCall, TOOL_CREATE_ORDER, TOOL_GET_EXISTING_ORDERS};

pub const MAX_TURNS_REACHED: &str = "max_turns_reached";

/// What one section's loop produced. Partial progress survives a turn-ceiling
/// failure: whatever was created, skipped, or errored stays accounted for.
#[derive(Clone, Debug, Default)]
pub struct LoopOutcome {
    pub success: bool,
    pub turns: u32,
    pub created: Vec<CreatedRecord>,
    pub skipped: Vec<SkipRecord>,
    pub errors: Vec<ToolFailure>,
    pub usage: TokenUsage,
    pub error: Option<String>,
}

pub struct OrchestrationLoop {
    engine: Arc<dyn DecisionEngine>,
    mutation: MutationEngine,
    catalog: Arc<CatalogIndex>,
    system_prompt: String,
    tools: Vec<ToolSpec>,
    max_turns: u32,
}

impl OrchestrationLoop {
    pub fn new(
        engine: Arc<dyn DecisionEngine>,
        mutation: MutationEngine,
        catalog: Arc<CatalogIndex>,
        system_prompt: String,
        tools: Vec<ToolSpec>,
        max_turns: u32,
    ) -> Self {
        Self { engine, mutation, catalog, system_prompt, tools, max_turns: max_turns.max(1) }
    }

    pub async fn run(&self, user_message: String) -> Result<LoopOutcome, EngineError> {
        let mut messages = vec![Message::user_text(user_message)];
        let mut outcome = LoopOutcome::default();

        for turn in 1..=self.max_turns {
            let response =
                self.engine.complete(&self.system_prompt, &self.tools, &messages).await?;
            outcome.usage.add(response.usage);
            messages.push(Message::assistant(response.content.clone()));

            for block in &response.content {
                if let ContentBlock::Text { text } = block {
                    if !text.trim().is_empty() {
                        tracing::debug!(turn, text = %truncate(text, 300), "engine text");
                    }
                }
            }

            if response.is_natural_end() {
                outcome.success = true;
                outcome.turns = turn;
                tracing::info!(
                    turns = turn,
                    input_tokens = outcome.usage.input_tokens,
                    output_tokens = outcome.usage.output_tokens,
                    created = outcome.created.len(),
                    "engine finished"
                );
                return Ok(outcome);
            }

            let mut tool_results = Vec::new();
            for block in &response.content {
                let ContentBlock::ToolUse { id, name, input } = block else { continue };
                tracing::info!(turn, tool = %name, "tool call");
                let content = self.dispatch(name, input, &mut outcome).await;
                tool_results
                    .push(ContentBlock::ToolResult { tool_use_id: id.clone(), content });
            }
            messages.push(Message::tool_results(tool_results));
        }

        outcome.success = false;
        outcome.turns = self.max_turns;
        outcome.error = Some(MAX_TURNS_REACHED.to_string());
        tracing::warn!(max_turns = self.max_turns, "engine hit turn ceiling");
        Ok(outcome)
    }

    /// Execute one tool invocation, folding the result or the error into the
    /// outcome. Always returns serialized content for the result slot.
    async fn dispatch(&self, name: &str, input: &Value, outcome: &mut LoopOutcome) -> String {
        let customer_name = self.customer_display_name(input);

        let result = match ToolCall::parse(name, input.clone()) {
            Ok(call) => self.mutation.execute(call).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(value) => {
                if name == TOOL_CREATE_ORDER {
                    outcome.created.push(CreatedRecord::from_summary(&value));
                } else if name == TOOL_GET_EXISTING_ORDERS {
                    self.record_duplicate_skip(input, &value, &customer_name, outcome);
                }
                value.to_string()
            }
            Err(error) => {
                tracing::error!(tool = %name, customer = %customer_name, error = %error, "tool execution failed");
                outcome.errors.push(ToolFailure {
                    tool: name.to_string(),
                    customer_name,
                    detail: error.to_string(),
                });
                json!({"error": error.to_string()}).to_string()
            }
        }
    }

    /// In direct mode, a non-empty `get_existing_orders` result means the
    /// engine found a duplicate and will skip the customer. In review mode
    /// an existing order legitimately precedes modify/cancel.
    fn record_duplicate_skip(
        &self,
        input: &Value,
        value: &Value,
        customer_name: &str,
        outcome: &mut LoopOutcome,
    ) {
        if self.mutation.mode() != WriteMode::Direct {
            return;
        }
        let Some(existing) = value.as_array() else { return };
        let Some(first) = existing.first() else { return };

        let delivery_date = input
            .get("delivery_date")
            .or_else(|| first.get("delivery_date"))
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok());
        let Some(delivery_date) = delivery_date else { return };

        outcome.skipped.push(SkipRecord {
            customer_name: customer_name.to_string(),
            delivery_date,
            existing_order_id: first.get("id").and_then(Value::as_str).map(str::to_string),
            reason: SKIP_REASON_EXISTING_ORDER,
        });
    }

    fn customer_display_name(&self, input: &Value) -> String {
        input
            .get("customer_id")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse::<Uuid>().ok())
            .map(|id| self.catalog.customer_name(&CustomerId(id)).to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
