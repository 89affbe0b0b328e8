use serde::Serialize;

use orderly_core::config::{AppConfig, LoadOptions};
use orderly_db::connect_with_settings;

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    ok: bool,
    detail: String,
}

pub fn run(json: bool) -> String {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(check("config", true, "configuration loads and validates"));
            Some(config)
        }
        Err(error) => {
            checks.push(check("config", false, format!("configuration issue: {error}")));
            None
        }
    };

    if let Some(config) = &config {
        checks.push(check(
            "engine_credentials",
            config.engine.api_key.is_some(),
            if config.engine.api_key.is_some() {
                "engine api key is configured".to_string()
            } else {
                "engine.api_key is not set (set ORDERLY_ENGINE_API_KEY)".to_string()
            },
        ));

        let sheets_ready =
            config.sheets.api_token.is_some() && !config.sheets.spreadsheet_id.is_empty();
        checks.push(check(
            "sheets_credentials",
            sheets_ready,
            if sheets_ready {
                "spreadsheet id and api token are configured".to_string()
            } else {
                "sheets.spreadsheet_id and sheets.api_token must both be set".to_string()
            },
        ));

        checks.push(database_check(config));
    }

    render(&checks, json)
}

fn database_check(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return check("database", false, format!("failed to initialize async runtime: {error}"));
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        pool.close().await;
        Ok::<(), sqlx::Error>(())
    });

    match result {
        Ok(()) => check("database", true, "database connects and answers"),
        Err(error) => check("database", false, format!("database check failed: {error}")),
    }
}

fn check(name: &str, ok: bool, detail: impl Into<String>) -> DoctorCheck {
    DoctorCheck { name: name.to_string(), ok, detail: detail.into() }
}

fn render(checks: &[DoctorCheck], json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(checks)
            .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"));
    }

    let mut lines = vec!["doctor:".to_string()];
    for entry in checks {
        let marker = if entry.ok { "ok" } else { "FAIL" };
        lines.push(format!("  [{marker}] {} - {}", entry.name, entry.detail));
    }

    let failed = checks.iter().filter(|entry| !entry.ok).count();
    if failed == 0 {
        lines.push("  all checks passed".to_string());
    } else {
        lines.push(format!("  {failed} check(s) failed"));
    }

    lines.join("\n")
}
