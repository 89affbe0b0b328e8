use orderly_core::config::{AppConfig, LoadOptions, LogFormat, WriteMode};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line("database.url", &config.database.url));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
    ));
    lines.push(render_line("database.timeout_secs", &config.database.timeout_secs.to_string()));

    lines.push(render_line("engine.base_url", &config.engine.base_url));
    lines.push(render_line("engine.model", &config.engine.model));
    lines.push(render_line("engine.api_key", redact_secret(config.engine.api_key.is_some())));
    lines.push(render_line("engine.max_tokens", &config.engine.max_tokens.to_string()));
    lines.push(render_line("engine.timeout_secs", &config.engine.timeout_secs.to_string()));
    lines.push(render_line("engine.max_retries", &config.engine.max_retries.to_string()));

    lines.push(render_line("sheets.spreadsheet_id", &config.sheets.spreadsheet_id));
    lines.push(render_line("sheets.tab", &config.sheets.tab));
    lines.push(render_line("sheets.api_token", redact_secret(config.sheets.api_token.is_some())));
    lines.push(render_line("sheets.base_url", &config.sheets.base_url));
    lines.push(render_line("sheets.chunk_size", &config.sheets.chunk_size.to_string()));

    lines.push(render_line("sync.window_days", &config.sync.window_days.to_string()));
    lines.push(render_line("sync.harvest_days", &config.sync.harvest_days.join(",")));
    lines.push(render_line("sync.family_label", &config.sync.family_label));
    lines.push(render_line("sync.max_turns", &config.sync.max_turns.to_string()));
    lines.push(render_line(
        "sync.mode",
        match config.sync.mode {
            WriteMode::Direct => "direct",
            WriteMode::Review => "review",
        },
    ));

    lines.push(render_line("logging.level", &config.logging.level));
    lines.push(render_line(
        "logging.format",
        match config.logging.format {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        },
    ));

    lines.join("\n")
}

fn render_line(key: &str, value: &str) -> String {
    format!("  {key} = {value}")
}

fn redact_secret(present: bool) -> &'static str {
    if present {
        "(set, redacted)"
    } else {
        "(unset)"
    }
}
