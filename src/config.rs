//! Configuration loader and validator for the course catalogue database.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable that opts in to the destructive reset.
pub const ALLOW_RESET_ENV: &str = "PPROGRAMIST_ALLOW_RESET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reset: ResetConfig,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Guard for the drop/recreate/seed routine. Off unless set explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetConfig {
    #[serde(default)]
    pub allow: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    /// `DATABASE_URL` wins over the configured URL.
    pub fn with_env_override(mut self) -> Self {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.url = url;
            }
        }
        self
    }
}

impl Config {
    /// Whether the destructive reset was opted into via config or environment.
    pub fn reset_allowed(&self) -> bool {
        self.reset.allow || env_flag(ALLOW_RESET_ENV)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let url = cfg.database.url.trim();
    if url.is_empty() {
        return Err(ConfigError::Invalid("database.url must be non-empty"));
    }
    if !url.starts_with("sqlite:") {
        return Err(ConfigError::Invalid("database.url must be a sqlite: URL"));
    }
    if cfg.database.max_connections == 0 {
        return Err(ConfigError::Invalid("database.max_connections must be > 0"));
    }
    Ok(())
}

/// Example configuration, also used by tests.
pub fn example() -> &'static str {
    r#"database:
  url: "sqlite://./data/pprogramist.db"
  max_connections: 5
  busy_timeout_ms: 5000

reset:
  allow: false
"#
}
