use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    pub sheets: SheetsConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Decision-engine endpoint (Anthropic-style messages API).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub tab: String,
    pub api_token: Option<SecretString>,
    pub base_url: String,
    /// Rows fetched per scan request. The feed can run past 27k rows, so the
    /// scanner never materializes the whole grid.
    pub chunk_size: usize,
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub window_days: u32,
    pub harvest_days: Vec<String>,
    /// Parent-category label shared by every day section header.
    pub family_label: String,
    pub max_turns: u32,
    pub mode: WriteMode,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Whether mutations land as directly-effective orders or as review
/// proposals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Direct,
    Review,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub window_days: Option<u32>,
    pub harvest_days: Option<Vec<String>>,
    pub mode: Option<WriteMode>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://orderly.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            engine: EngineConfig {
                api_key: None,
                base_url: "https://api.anthropic.com".to_string(),
                model: "claude-sonnet-4-5".to_string(),
                max_tokens: 8192,
                timeout_secs: 120,
                max_retries: 2,
            },
            sheets: SheetsConfig {
                spreadsheet_id: String::new(),
                tab: "ORDERS".to_string(),
                api_token: None,
                base_url: "https://sheets.googleapis.com".to_string(),
                chunk_size: 10_000,
            },
            sync: SyncConfig {
                window_days: 7,
                harvest_days: vec![
                    "tuesday".to_string(),
                    "wednesday".to_string(),
                    "friday".to_string(),
                ],
                family_label: "Harvests".to_string(),
                max_turns: 100,
                mode: WriteMode::Direct,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for WriteMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "review" => Ok(Self::Review),
            other => Err(ConfigError::Validation(format!(
                "unsupported write mode `{other}` (expected direct|review)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("orderly.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(engine) = patch.engine {
            if let Some(api_key_value) = engine.api_key {
                self.engine.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = engine.base_url {
                self.engine.base_url = base_url;
            }
            if let Some(model) = engine.model {
                self.engine.model = model;
            }
            if let Some(max_tokens) = engine.max_tokens {
                self.engine.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = engine.timeout_secs {
                self.engine.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = engine.max_retries {
                self.engine.max_retries = max_retries;
            }
        }

        if let Some(sheets) = patch.sheets {
            if let Some(spreadsheet_id) = sheets.spreadsheet_id {
                self.sheets.spreadsheet_id = spreadsheet_id;
            }
            if let Some(tab) = sheets.tab {
                self.sheets.tab = tab;
            }
            if let Some(api_token_value) = sheets.api_token {
                self.sheets.api_token = Some(secret_value(api_token_value));
            }
            if let Some(base_url) = sheets.base_url {
                self.sheets.base_url = base_url;
            }
            if let Some(chunk_size) = sheets.chunk_size {
                self.sheets.chunk_size = chunk_size;
            }
        }

        if let Some(sync) = patch.sync {
            if let Some(window_days) = sync.window_days {
                self.sync.window_days = window_days;
            }
            if let Some(harvest_days) = sync.harvest_days {
                self.sync.harvest_days = harvest_days;
            }
            if let Some(family_label) = sync.family_label {
                self.sync.family_label = family_label;
            }
            if let Some(max_turns) = sync.max_turns {
                self.sync.max_turns = max_turns;
            }
            if let Some(mode) = sync.mode {
                self.sync.mode = mode;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ORDERLY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ORDERLY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("ORDERLY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ORDERLY_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ORDERLY_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ORDERLY_ENGINE_API_KEY") {
            self.engine.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ORDERLY_ENGINE_BASE_URL") {
            self.engine.base_url = value;
        }
        if let Some(value) = read_env("ORDERLY_ENGINE_MODEL") {
            self.engine.model = value;
        }
        if let Some(value) = read_env("ORDERLY_ENGINE_MAX_TOKENS") {
            self.engine.max_tokens = parse_u32("ORDERLY_ENGINE_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("ORDERLY_ENGINE_TIMEOUT_SECS") {
            self.engine.timeout_secs = parse_u64("ORDERLY_ENGINE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ORDERLY_ENGINE_MAX_RETRIES") {
            self.engine.max_retries = parse_u32("ORDERLY_ENGINE_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("ORDERLY_SHEETS_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = value;
        }
        if let Some(value) = read_env("ORDERLY_SHEETS_TAB") {
            self.sheets.tab = value;
        }
        if let Some(value) = read_env("ORDERLY_SHEETS_API_TOKEN") {
            self.sheets.api_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("ORDERLY_SHEETS_BASE_URL") {
            self.sheets.base_url = value;
        }
        if let Some(value) = read_env("ORDERLY_SHEETS_CHUNK_SIZE") {
            self.sheets.chunk_size = parse_usize("ORDERLY_SHEETS_CHUNK_SIZE", &value)?;
        }

        if let Some(value) = read_env("ORDERLY_SYNC_WINDOW_DAYS") {
            self.sync.window_days = parse_u32("ORDERLY_SYNC_WINDOW_DAYS", &value)?;
        }
        if let Some(value) = read_env("ORDERLY_SYNC_MAX_TURNS") {
            self.sync.max_turns = parse_u32("ORDERLY_SYNC_MAX_TURNS", &value)?;
        }
        if let Some(value) = read_env("ORDERLY_SYNC_MODE") {
            self.sync.mode = value.parse()?;
        }

        let log_level = read_env("ORDERLY_LOGGING_LEVEL").or_else(|| read_env("ORDERLY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ORDERLY_LOGGING_FORMAT").or_else(|| read_env("ORDERLY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(spreadsheet_id) = overrides.spreadsheet_id {
            self.sheets.spreadsheet_id = spreadsheet_id;
        }
        if let Some(window_days) = overrides.window_days {
            self.sync.window_days = window_days;
        }
        if let Some(harvest_days) = overrides.harvest_days {
            self.sync.harvest_days = harvest_days;
        }
        if let Some(mode) = overrides.mode {
            self.sync.mode = mode;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.engine.model.trim().is_empty() {
            return Err(ConfigError::Validation("engine.model must not be empty".to_string()));
        }
        if self.engine.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "engine.max_tokens must be at least 1".to_string(),
            ));
        }
        if self.sheets.tab.trim().is_empty() {
            return Err(ConfigError::Validation("sheets.tab must not be empty".to_string()));
        }
        if self.sheets.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "sheets.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.sync.max_turns == 0 {
            return Err(ConfigError::Validation("sync.max_turns must be at least 1".to_string()));
        }
        if self.sync.harvest_days.is_empty() {
            return Err(ConfigError::Validation(
                "sync.harvest_days must name at least one day".to_string(),
            ));
        }
        for day in &self.sync.harvest_days {
            if !WEEKDAY_NAMES.contains(&day.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::Validation(format!(
                    "sync.harvest_days entry `{day}` is not a weekday name"
                )));
            }
        }
        if self.sync.family_label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "sync.family_label must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

const WEEKDAY_NAMES: [&str; 7] =
    ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("orderly.toml"), PathBuf::from("config/orderly.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    engine: Option<EnginePatch>,
    sheets: Option<SheetsPatch>,
    sync: Option<SyncPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SheetsPatch {
    spreadsheet_id: Option<String>,
    tab: Option<String>,
    api_token: Option<String>,
    base_url: Option<String>,
    chunk_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct SyncPatch {
    window_days: Option<u32>,
    harvest_days: Option<Vec<String>>,
    family_label: Option<String>,
    max_turns: Option<u32>,
    mode: Option<WriteMode>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{
        interpolate_env_vars, AppConfig, ConfigError, ConfigOverrides, LoadOptions, WriteMode,
    };

    #[test]
    fn default_config_is_valid() {
        AppConfig::default().validate().expect("default config validates");
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[database]\nurl = \"sqlite://custom.db\"\n\n[sync]\nwindow_days = 14\nmode = \"review\"\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("load config");

        assert_eq!(config.database.url, "sqlite://custom.db");
        assert_eq!(config.sync.window_days, 14);
        assert_eq!(config.sync.mode, WriteMode::Review);
        // Untouched sections keep their defaults.
        assert_eq!(config.sheets.tab, "ORDERS");
    }

    #[test]
    fn programmatic_overrides_beat_file_values() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[sync]\nwindow_days = 14\n").expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides {
                window_days: Some(3),
                harvest_days: Some(vec!["friday".to_string()]),
                ..ConfigOverrides::default()
            },
        })
        .expect("load config");

        assert_eq!(config.sync.window_days, 3);
        assert_eq!(config.sync.harvest_days, vec!["friday".to_string()]);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("definitely-missing-orderly.toml".into()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn interpolation_fails_on_unterminated_expression() {
        let result = interpolate_env_vars("token = \"${UNTERMINATED");
        assert!(matches!(result, Err(ConfigError::UnterminatedInterpolation)));
    }

    #[test]
    fn interpolation_substitutes_environment_values() {
        std::env::set_var("ORDERLY_TEST_INTERPOLATION_VALUE", "resolved");
        let output = interpolate_env_vars("token = \"${ORDERLY_TEST_INTERPOLATION_VALUE}\"")
            .expect("interpolate");
        std::env::remove_var("ORDERLY_TEST_INTERPOLATION_VALUE");

        assert_eq!(output, "token = \"resolved\"");
    }

    #[test]
    fn validation_rejects_non_weekday_harvest_day() {
        let mut config = AppConfig::default();
        config.sync.harvest_days = vec!["fryday".to_string()];

        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn write_mode_parses_case_insensitively() {
        assert_eq!("Direct".parse::<WriteMode>().expect("parse"), WriteMode::Direct);
        assert_eq!("REVIEW".parse::<WriteMode>().expect("parse"), WriteMode::Review);
        assert!("dry-run".parse::<WriteMode>().is_err());
    }
}
