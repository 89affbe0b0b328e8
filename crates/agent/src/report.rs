//! Per-run accounting. Every sheet row ends up created, skipped, or errored;
//! the summary report makes that visible per date section and in total.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::engine::TokenUsage;

pub const SKIP_REASON_EXISTING_ORDER: &str = "existing_order";

/// A successful create, extracted from the tool's structured summary.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreatedRecord {
    /// Order id in direct mode, proposal id in review mode.
    pub reference: String,
    pub customer_name: String,
    pub delivery_date: String,
    pub lines_created: u64,
}

impl CreatedRecord {
    pub fn from_summary(value: &Value) -> Self {
        let reference = value
            .get("order_id")
            .or_else(|| value.get("proposal_id"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            reference,
            customer_name: text_field(value, "customer_name"),
            delivery_date: text_field(value, "delivery_date"),
            lines_created: value.get("lines_created").and_then(Value::as_u64).unwrap_or(0),
        }
    }
}

fn text_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// One customer skipped because a live order already exists for the date.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkipRecord {
    pub customer_name: String,
    pub delivery_date: NaiveDate,
    /// Present when the engine discovered the duplicate via a tool call;
    /// absent when the prefilter caught it first.
    pub existing_order_id: Option<String>,
    pub reason: &'static str,
}

/// A failed tool invocation, kept for the report after its error was
/// serialized back to the engine.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolFailure {
    pub tool: String,
    pub customer_name: String,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SectionReport {
    pub day: String,
    pub date: NaiveDate,
    pub rows: usize,
    pub created: usize,
    pub skipped: usize,
    pub errors: usize,
    pub turns: u32,
    pub success: bool,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    pub sections: Vec<SectionReport>,
    pub created: Vec<CreatedRecord>,
    pub skipped: Vec<SkipRecord>,
    pub errors: Vec<ToolFailure>,
    pub usage: TokenUsage,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.sections.iter().all(|section| section.success)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);

        out.push_str(&rule);
        out.push_str("\n  SUMMARY REPORT\n");
        out.push_str(&rule);
        out.push('\n');

        for section in &self.sections {
            let status = if section.success { "OK" } else { "FAILED" };
            out.push_str(&format!("\n  {} {} [{}]\n", section.day, section.date, status));
            out.push_str(&format!(
                "    Sheet rows: {} | Orders created: {} | Skipped (existing): {} | Errors: {} | Turns: {}\n",
                section.rows, section.created, section.skipped, section.errors, section.turns
            ));
        }

        if !self.created.is_empty() {
            out.push_str(&format!("\n  ORDERS CREATED ({}):\n", self.created.len()));
            for record in &self.created {
                out.push_str(&format!(
                    "    {:30} | {} | {} items | {}\n",
                    record.customer_name,
                    record.delivery_date,
                    record.lines_created,
                    record.reference
                ));
            }
        }

        if !self.skipped.is_empty() {
            out.push_str(&format!(
                "\n  SKIPPED - EXISTING ORDER ({}):\n",
                self.skipped.len()
            ));
            for record in &self.skipped {
                out.push_str(&format!(
                    "    {:30} | {}\n",
                    record.customer_name, record.delivery_date
                ));
            }
        }

        if !self.errors.is_empty() {
            out.push_str(&format!("\n  ERRORS ({}):\n", self.errors.len()));
            for failure in &self.errors {
                out.push_str(&format!(
                    "    {:30} | {}: {}\n",
                    failure.customer_name, failure.tool, failure.detail
                ));
            }
        }

        out.push_str(&format!("\n  {}\n", "-".repeat(56)));
        out.push_str(&format!(
            "  Total: {} created, {} skipped, {} errors\n",
            self.created.len(),
            self.skipped.len(),
            self.errors.len()
        ));
        out.push_str(&format!(
            "  Tokens: {} in / {} out\n",
            self.usage.input_tokens, self.usage.output_tokens
        ));
        out.push_str(&rule);
        out.push('\n');

        out
    }
}
