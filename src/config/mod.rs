//! Configuration loading for finsync.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `FINSYNC_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executors::ExecutorKind;

const ENV_PREFIX: &str = "FINSYNC_";

/// Application configuration derived from `FINSYNC_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// JSON file mapping requester ids to provider credentials
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    /// How long the requester has to reply with a one-time code
    #[serde(default = "default_code_timeout_seconds")]
    pub code_timeout_seconds: u64,
    /// Rows per INSERT statement during reconcile
    #[serde(default = "default_insert_chunk_size")]
    pub insert_chunk_size: usize,
    /// Maximum characters per delivered report page
    #[serde(default = "default_report_page_chars")]
    pub report_page_chars: usize,
    /// Executors in run order
    #[serde(default = "default_executors")]
    pub executors: Vec<ExecutorKind>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            credentials_path: default_credentials_path(),
            code_timeout_seconds: default_code_timeout_seconds(),
            insert_chunk_size: default_insert_chunk_size(),
            report_page_chars: default_report_page_chars(),
            executors: default_executors(),
        }
    }
}

impl AppConfig {
    pub fn code_timeout(&self) -> Duration {
        Duration::from_secs(self.code_timeout_seconds)
    }

    /// Returns a redacted JSON representation (database password removed).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        config.database_url = redact_url_credentials(&config.database_url);
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if !(1..=3600).contains(&self.code_timeout_seconds) {
            return Err(ConfigError::InvalidCodeTimeout {
                value: self.code_timeout_seconds,
            });
        }

        if self.insert_chunk_size == 0 {
            return Err(ConfigError::InvalidInsertChunkSize);
        }

        if self.report_page_chars == 0 {
            return Err(ConfigError::InvalidReportPageChars);
        }

        if self.executors.is_empty() {
            return Err(ConfigError::NoExecutors);
        }

        for (index, kind) in self.executors.iter().enumerate() {
            if self.executors[..index].contains(kind) {
                return Err(ConfigError::DuplicateExecutor {
                    name: kind.to_string(),
                });
            }
        }

        Ok(())
    }
}

fn redact_url_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}[REDACTED]{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://finsync.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_code_timeout_seconds() -> u64 {
    300
}

fn default_insert_chunk_size() -> usize {
    crate::storage::DEFAULT_INSERT_CHUNK_SIZE
}

fn default_report_page_chars() -> usize {
    4096
}

fn default_executors() -> Vec<ExecutorKind> {
    ExecutorKind::ALL.to_vec()
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("code timeout must be between 1 and 3600 seconds, got {value}")]
    InvalidCodeTimeout { value: u64 },
    #[error("insert chunk size must be positive")]
    InvalidInsertChunkSize,
    #[error("report page size must be positive")]
    InvalidReportPageChars,
    #[error("no executors configured; set FINSYNC_EXECUTORS")]
    NoExecutors,
    #[error("{0}")]
    UnknownExecutor(String),
    #[error("executor '{name}' is configured more than once")]
    DuplicateExecutor { name: String },
}

/// Loads configuration using layered `.env` files and `FINSYNC_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates configuration. Process environment wins over files.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let database_url = layered
            .remove("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_database_url);
        let db_max_connections = layered
            .remove("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = layered
            .remove("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);
        let credentials_path = layered
            .remove("CREDENTIALS_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_credentials_path);
        let code_timeout_seconds = layered
            .remove("CODE_TIMEOUT_SECONDS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_else(default_code_timeout_seconds);
        let insert_chunk_size = layered
            .remove("INSERT_CHUNK_SIZE")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_else(default_insert_chunk_size);
        let report_page_chars = layered
            .remove("REPORT_PAGE_CHARS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_else(default_report_page_chars);
        let executors = match layered.remove("EXECUTORS") {
            Some(list) => parse_executors(&list)?,
            None => default_executors(),
        };

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            credentials_path,
            code_timeout_seconds,
            insert_chunk_size,
            report_page_chars,
            executors,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{}PROFILE", ENV_PREFIX))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a comma-separated executor list, keeping order. Empty entries are skipped.
fn parse_executors(list: &str) -> Result<Vec<ExecutorKind>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.parse::<ExecutorKind>().map_err(ConfigError::UnknownExecutor))
        .collect()
}
