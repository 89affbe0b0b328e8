//! The sync pipeline: scan the orders sheet for each configured harvest day,
//! prefilter the in-window date sections, and drive one agent loop per
//! section that still has unprocessed rows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use thiserror::Error;

use orderly_agent::engine::{DecisionEngine, EngineError, HttpEngine};
use orderly_agent::mutation::MutationEngine;
use orderly_agent::prefilter::IdempotencyPrefilter;
use orderly_agent::prompt::{build_system_prompt, build_user_message};
use orderly_agent::report::{RunSummary, SectionReport};
use orderly_agent::runtime::OrchestrationLoop;
use orderly_agent::tools::tool_catalog;
use orderly_core::catalog::CatalogIndex;
use orderly_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat, WriteMode};
use orderly_core::domain::section::SheetSection;
use orderly_db::repositories::{
    CatalogRepository, OrderRepository, ProposalRepository, SqlCatalogRepository,
    SqlOrderRepository, SqlProposalRepository,
};
use orderly_db::{connect_with_settings, migrations, RepositoryError};
use orderly_sheets::{
    collect_sections, GoogleSheetsClient, ScanError, SectionLabel, SectionScanner, SheetError,
    WindowFilter,
};

use crate::commands::CommandResult;

#[derive(Debug, Error)]
enum PipelineError {
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client init failed: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub fn run(days: Option<u32>, day: Option<String>, review: bool) -> CommandResult {
    let overrides = ConfigOverrides {
        window_days: days,
        harvest_days: day.map(|value| vec![value.to_lowercase()]),
        mode: review.then_some(WriteMode::Review),
        ..ConfigOverrides::default()
    };

    let config = match AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "sync",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "sync",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(run_pipeline(&config)) {
        Ok(summary) => {
            let exit_code = if summary.is_success() { 0 } else { 1 };
            CommandResult { exit_code, output: summary.render() }
        }
        Err(error) => CommandResult::failure("sync", "pipeline", error.to_string(), 4),
    }
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    // A second init (e.g. in tests) is not an error worth failing over.
    let result = match config.logging.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .json()
            .try_init(),
    };
    let _ = result;
}

async fn run_pipeline(config: &AppConfig) -> Result<RunSummary, PipelineError> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(PipelineError::Connect)?;
    migrations::run_pending(&pool).await.map_err(PipelineError::Migration)?;

    let catalog_repo = SqlCatalogRepository::new(pool.clone());
    let customers = catalog_repo.list_customers().await?;
    let items = catalog_repo.list_items().await?;
    let catalog = Arc::new(CatalogIndex::build(customers, items));
    tracing::info!(
        customers = catalog.customers().len(),
        items = catalog.items().len(),
        "catalog loaded"
    );

    let orders: Arc<dyn OrderRepository> = Arc::new(SqlOrderRepository::new(pool.clone()));
    let proposals: Arc<dyn ProposalRepository> =
        Arc::new(SqlProposalRepository::new(pool.clone()));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.engine.timeout_secs))
        .build()
        .map_err(PipelineError::HttpClient)?;
    let sheet = GoogleSheetsClient::new(
        http.clone(),
        config.sheets.base_url.clone(),
        config.sheets.spreadsheet_id.clone(),
        config.sheets.tab.clone(),
        config.sheets.api_token.clone(),
    )?;
    let engine: Arc<dyn DecisionEngine> = Arc::new(HttpEngine::new(http, &config.engine)?);

    let today = Local::now().date_naive();
    let scanner = SectionScanner::new(config.sheets.chunk_size);
    let filter = WindowFilter::new(today, config.sync.window_days);
    let system_prompt = build_system_prompt(&catalog, today, config.sync.mode);
    let tools = tool_catalog(config.sync.mode);

    let mut summary = RunSummary::default();

    for day in &config.sync.harvest_days {
        let label = SectionLabel::new(day.clone(), config.sync.family_label.clone());

        // A broken day feed aborts that day only; siblings still run.
        let sections = match day_sections(&sheet, &scanner, &filter, &label).await {
            Ok(sections) => sections,
            Err(error) => {
                tracing::error!(section = %label.heading(), error = %error, "day feed failed");
                summary.errors.push(orderly_agent::report::ToolFailure {
                    tool: "section_scan".to_string(),
                    customer_name: label.heading(),
                    detail: error.to_string(),
                });
                continue;
            }
        };

        for section in sections {
            if section.rows.is_empty() {
                continue;
            }
            process_section(
                config,
                &catalog,
                &orders,
                &proposals,
                &engine,
                &system_prompt,
                &tools,
                today,
                section,
                &mut summary,
            )
            .await?;
        }
    }

    Ok(summary)
}

async fn day_sections(
    sheet: &GoogleSheetsClient,
    scanner: &SectionScanner,
    filter: &WindowFilter,
    label: &SectionLabel,
) -> Result<Vec<SheetSection>, ScanError> {
    let scanned = scanner.scan(sheet, label).await?;
    collect_sections(sheet, &scanned, filter).await
}

#[allow(clippy::too_many_arguments)]
async fn process_section(
    config: &AppConfig,
    catalog: &Arc<CatalogIndex>,
    orders: &Arc<dyn OrderRepository>,
    proposals: &Arc<dyn ProposalRepository>,
    engine: &Arc<dyn DecisionEngine>,
    system_prompt: &str,
    tools: &[orderly_agent::engine::ToolSpec],
    today: chrono::NaiveDate,
    section: SheetSection,
    summary: &mut RunSummary,
) -> Result<(), PipelineError> {
    let prefilter = IdempotencyPrefilter::new(orders.as_ref(), catalog);
    let outcome = prefilter.partition(&section).await?;
    let pre_skipped = outcome.pre_skipped.len();
    summary.skipped.extend(outcome.pre_skipped);

    if outcome.keep.is_empty() {
        tracing::info!(date = %section.date, "all customers already have orders; nothing to do");
        summary.sections.push(SectionReport {
            day: section.day_label.clone(),
            date: section.date,
            rows: section.rows.len(),
            created: 0,
            skipped: pre_skipped,
            errors: 0,
            turns: 0,
            success: true,
        });
        return Ok(());
    }

    let filtered = SheetSection { rows: outcome.keep, ..section };
    tracing::info!(
        date = %filtered.date,
        rows = filtered.rows.len(),
        pre_skipped,
        "running agent loop for date section"
    );

    let mutation = MutationEngine::new(
        orders.clone(),
        proposals.clone(),
        catalog.clone(),
        config.sync.mode,
        today,
    );
    let orchestration = OrchestrationLoop::new(
        engine.clone(),
        mutation,
        catalog.clone(),
        system_prompt.to_string(),
        tools.to_vec(),
        config.sync.max_turns,
    );

    let result = orchestration.run(build_user_message(&filtered)).await?;

    summary.sections.push(SectionReport {
        day: filtered.day_label.clone(),
        date: filtered.date,
        rows: filtered.rows.len(),
        created: result.created.len(),
        skipped: result.skipped.len() + pre_skipped,
        errors: result.errors.len(),
        turns: result.turns,
        success: result.success,
    });
    summary.created.extend(result.created);
    summary.skipped.extend(result.skipped);
    summary.errors.extend(result.errors);
    summary.usage.add(result.usage);

    if let Some(error) = result.error {
        tracing::warn!(date = %filtered.date, error = %error, "section loop failed");
    }

    Ok(())
}
