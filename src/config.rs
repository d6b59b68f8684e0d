use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoreConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub retrieval: RetrievalConfig,
    pub retention: RetentionConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub known_sources: Vec<String>,
    pub busy_timeout_ms: u64,
    pub connect_retries: u32,
    pub connect_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub default_duplicate_threshold: f64,
}

/// Retention scoring policy. Defaults are the reference constants; changing
/// them changes every score in the store.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetentionConfig {
    pub importance_weight: f64,
    pub access_weight: f64,
    pub recency_weight: f64,
    pub architecture_decay_rate: f64,
    pub pattern_decay_rate: f64,
    pub decision_decay_rate: f64,
    pub recency_window_days: f64,
    pub access_saturation: u32,
    pub core_floor: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub enabled: bool,
    pub interval_hours: u64,
    pub delete_threshold: f64,
    pub flag_threshold: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8420,
            request_timeout_ms: 10_000,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_lore_dir()
            .join("knowledge.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            known_sources: [
                "website",
                "godot-pay",
                "stripe",
                "cms",
                "gas",
                "infrastructure",
                "docs",
                "unknown",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            busy_timeout_ms: 5000,
            connect_retries: 3,
            connect_backoff_ms: 200,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 50,
            default_duplicate_threshold: 0.6,
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            importance_weight: 0.4,
            access_weight: 0.3,
            recency_weight: 0.3,
            architecture_decay_rate: 0.001,
            pattern_decay_rate: 0.005,
            decision_decay_rate: 0.01,
            recency_window_days: 180.0,
            access_saturation: 50,
            core_floor: 0.9,
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: 24,
            delete_threshold: 0.1,
            flag_threshold: 0.3,
        }
    }
}

/// Returns `~/.lore/`, or `./.lore` when no home directory is known.
pub fn default_lore_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lore")
}

/// Returns the default config file path: `~/.lore/config.toml`
pub fn default_config_path() -> PathBuf {
    default_lore_dir().join("config.toml")
}

impl LoreConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            LoreConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (LORE_DB, LORE_LOG_LEVEL, LORE_REQUEST_TIMEOUT_MS).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LORE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("LORE_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("LORE_REQUEST_TIMEOUT_MS") {
            match val.parse() {
                Ok(ms) => self.server.request_timeout_ms = ms,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid LORE_REQUEST_TIMEOUT_MS"),
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
