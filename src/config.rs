//! Configuration file parser for planet.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings so typos are
//! visible without breaking startup.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database file.
    pub database_path: String,

    /// User-Agent header sent on all outbound requests.
    pub user_agent: String,

    /// Per-feed fetch deadline in seconds.
    pub fetch_timeout_secs: u64,

    /// Maximum feed body size in bytes.
    pub max_feed_bytes: usize,

    /// Bookmark-count API endpoint.
    pub bookmark_api_endpoint: String,

    /// Delay between consecutive bookmark-count lookups, in milliseconds.
    pub bookmark_delay_ms: u64,

    /// Maximum posts refreshed per reconciliation run.
    pub reconcile_batch_size: u32,

    /// Recency window for popularity refresh, in days.
    pub reconcile_window_days: i64,

    /// Optional remote relevance-scoring endpoint. Unset means the built-in
    /// keyword scorer is used exclusively.
    pub score_oracle_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "planet.db".to_string(),
            user_agent: concat!("planet/", env!("CARGO_PKG_VERSION")).to_string(),
            fetch_timeout_secs: 30,
            max_feed_bytes: 10 * 1024 * 1024,
            bookmark_api_endpoint: "https://b.hatena.ne.jp/count".to_string(),
            bookmark_delay_ms: 100,
            reconcile_batch_size: 40,
            reconcile_window_days: 7,
            score_oracle_url: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to surface unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "database_path",
                "user_agent",
                "fetch_timeout_secs",
                "max_feed_bytes",
                "bookmark_api_endpoint",
                "bookmark_delay_ms",
                "reconcile_batch_size",
                "reconcile_window_days",
                "score_oracle_url",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), database = %config.database_path, "Loaded configuration");
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
