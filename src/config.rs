use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::logger::{self, LogTag};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub geckoterminal: GeckoTerminalConfig,
    pub coingecko: CoinGeckoConfig,
    pub watchlist: WatchlistConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub database_path: String,
    /// Default freshness window, in seconds, for every resource kind.
    pub ttl_secs: u64,
    /// Per-kind overrides keyed by resource kind ("markets", "token", ...).
    pub ttl_overrides: HashMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            ttl_secs: 300,
            ttl_overrides: HashMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, kind: &str) -> Duration {
        let secs = self
            .ttl_overrides
            .get(kind)
            .copied()
            .unwrap_or(self.ttl_secs);
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts after the first when the upstream answers 429.
    pub max_retries: u32,
    /// Delay before a background refresh when all synchronous paths failed.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeckoTerminalConfig {
    pub base_url: String,
    /// Minimum gap between consecutive requests to this upstream.
    pub request_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for GeckoTerminalConfig {
    fn default() -> Self {
        Self {
            base_url: crate::apis::geckoterminal::DEFAULT_BASE_URL.to_string(),
            request_interval_ms: 2000,
            timeout_secs: crate::apis::geckoterminal::TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub request_interval_ms: u64,
    pub timeout_secs: u64,
    /// Currency the markets and chart endpoints are quoted in.
    pub vs_currency: String,
    pub per_page: u32,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: crate::apis::coingecko::DEFAULT_BASE_URL.to_string(),
            request_interval_ms: 2000,
            timeout_secs: crate::apis::coingecko::TIMEOUT_SECS,
            vs_currency: "usd".to_string(),
            per_page: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchlistConfig {
    pub path: String,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            path: "coins.json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load configuration, falling back to defaults when the file is missing
    /// or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                logger::warning(
                    LogTag::Config,
                    &format!("using default config ({}): {:#}", path.display(), err),
                );
                Self::default()
            }
        }
    }
}

fn default_database_path() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("coindash").join("cache.db"))
        .and_then(|p| p.to_str().map(str::to_string))
        .unwrap_or_else(|| "coindash-cache.db".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upstream_limits() {
        let config = Config::default();
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.geckoterminal.request_interval_ms, 2000);
        assert_eq!(config.coingecko.vs_currency, "usd");
    }

    #[test]
    fn ttl_overrides_take_precedence() {
        let mut config = CacheConfig::default();
        config.ttl_overrides.insert("markets".to_string(), 60);
        assert_eq!(config.ttl_for("markets"), Duration::from_secs(60));
        assert_eq!(config.ttl_for("token"), Duration::from_secs(300));
    }

    #[test]
    fn parses_partial_toml() {
        let raw = r#"
            [cache]
            ttl_secs = 120

            [coingecko]
            vs_currency = "brl"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.coingecko.vs_currency, "brl");
        // Untouched sections keep their defaults
        assert_eq!(config.retry.max_retries, 3);
    }
}
