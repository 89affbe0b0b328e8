//! Order-intake agent: the tool-calling loop between a decision engine and
//! the order store.
//!
//! The flow for one date section:
//! 1. **Prefilter** (`prefilter`) - drop rows for customers who already hold
//!    a live order for the date, before any engine turn is spent.
//! 2. **Prompt** (`prompt`) - render the catalog roster and the section's
//!    rows for the engine.
//! 3. **Loop** (`runtime`) - bounded turns; the engine matches rows to
//!    catalog ids and requests tool invocations.
//! 4. **Mutation** (`mutation`) - validated tool calls become store writes:
//!    directly-effective orders, or review proposals, depending on mode.
//!
//! The engine is strictly a matcher. Idempotency, turn ceilings, argument
//! validation, and every write go through deterministic code here.

pub mod engine;
pub mod mutation;
pub mod prefilter;
pub mod prompt;
pub mod report;
pub mod runtime;
pub mod tools;

pub use engine::{
    ContentBlock, DecisionEngine, EngineError, EngineResponse, HttpEngine, Message, Role,
    StopReason, TokenUsage, ToolSpec,
};
pub use mutation::MutationEngine;
pub use prefilter::{partition_rows, IdempotencyPrefilter, PrefilterOutcome};
pub use prompt::{build_system_prompt, build_user_message, format_section};
pub use report::{CreatedRecord, RunSummary, SectionReport, SkipRecord, ToolFailure};
pub use runtime::{LoopOutcome, OrchestrationLoop, MAX_TURNS_REACHED};
pub use tools::{tool_catalog, ToolCall, ToolError};
