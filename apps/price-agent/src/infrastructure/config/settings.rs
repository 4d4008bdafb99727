//! Agent Configuration Settings
//!
//! Configuration types for the price agent, loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::application::ports::ProviderError;
use crate::application::services::CacheError;
use crate::domain::pair::{Pair, PairError, parse_pairs};

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// HTTP agent bind address.
    pub listen_addr: String,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:9200".to_string(),
            metrics_port: 0,
        }
    }
}

/// Polling cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Pairs to keep warm. The cache is disabled when empty.
    pub pairs: Vec<Pair>,
    /// Refresh interval.
    pub interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            pairs: Vec::new(),
            interval: Duration::from_secs(60),
        }
    }
}

impl CacheSettings {
    /// Whether a polling cache should run.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.pairs.is_empty()
    }
}

/// Price source settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Price table read by the static provider.
    pub prices_file: PathBuf,
    /// Maximum accepted price age (zero = no limit).
    pub max_price_age: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            prices_file: PathBuf::from("prices.json"),
            max_price_age: Duration::ZERO,
        }
    }
}

/// Complete agent configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentConfig {
    /// Server settings.
    pub server: ServerSettings,
    /// Polling cache settings.
    pub cache: CacheSettings,
    /// Price source settings.
    pub provider: ProviderSettings,
}

impl AgentConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `PRICE_AGENT_CACHE_PAIRS` contains a malformed pair.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if `PRICE_AGENT_CACHE_PAIRS` contains a malformed pair.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = ServerSettings {
            listen_addr: lookup("PRICE_AGENT_LISTEN_ADDR")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| ServerSettings::default().listen_addr),
            metrics_port: parse_var(
                &lookup,
                "PRICE_AGENT_METRICS_PORT",
                ServerSettings::default().metrics_port,
            ),
        };

        let pairs = lookup("PRICE_AGENT_CACHE_PAIRS").unwrap_or_default();
        let cache = CacheSettings {
            pairs: parse_pairs(
                pairs
                    .split(',')
                    .map(str::trim)
                    .filter(|pair| !pair.is_empty()),
            )?,
            interval: Duration::from_secs(parse_var(
                &lookup,
                "PRICE_AGENT_CACHE_INTERVAL_SECS",
                CacheSettings::default().interval.as_secs(),
            ))
            .max(Duration::from_secs(1)),
        };

        let provider = ProviderSettings {
            prices_file: lookup("PRICE_AGENT_PRICES_FILE")
                .filter(|v| !v.trim().is_empty())
                .map_or_else(|| ProviderSettings::default().prices_file, PathBuf::from),
            max_price_age: Duration::from_secs(parse_var(
                &lookup,
                "PRICE_AGENT_MAX_PRICE_AGE_SECS",
                0,
            )),
        };

        Ok(Self {
            server,
            cache,
            provider,
        })
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A configured pair is malformed.
    #[error("PRICE_AGENT_CACHE_PAIRS: {0}")]
    InvalidPair(#[from] PairError),

    /// The price table could not be loaded.
    #[error("failed to load price table: {0}")]
    PriceTable(#[from] ProviderError),

    /// The polling cache could not be built.
    #[error("invalid cache configuration: {0}")]
    Cache(#[from] CacheError),
}

fn parse_var<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AgentConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AgentConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.server.listen_addr, "127.0.0.1:9200");
        assert_eq!(config.server.metrics_port, 0);
        assert_eq!(config.cache.interval, Duration::from_secs(60));
        assert!(!config.cache.is_enabled());
        assert_eq!(config.provider.prices_file, PathBuf::from("prices.json"));
        assert_eq!(config.provider.max_price_age, Duration::ZERO);
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            ("PRICE_AGENT_LISTEN_ADDR", "0.0.0.0:8080"),
            ("PRICE_AGENT_METRICS_PORT", "9464"),
            ("PRICE_AGENT_CACHE_PAIRS", "eth/usd, BTC/USD"),
            ("PRICE_AGENT_CACHE_INTERVAL_SECS", "5"),
            ("PRICE_AGENT_PRICES_FILE", "/var/lib/prices.json"),
            ("PRICE_AGENT_MAX_PRICE_AGE_SECS", "300"),
        ])
        .unwrap();

        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.server.metrics_port, 9464);
        assert_eq!(
            config.cache.pairs,
            [Pair::new("ETH", "USD"), Pair::new("BTC", "USD")]
        );
        assert_eq!(config.cache.interval, Duration::from_secs(5));
        assert_eq!(config.provider.prices_file, PathBuf::from("/var/lib/prices.json"));
        assert_eq!(config.provider.max_price_age, Duration::from_secs(300));
    }

    #[test]
    fn unparseable_numbers_fall_back() {
        let config = load(&[
            ("PRICE_AGENT_METRICS_PORT", "not-a-port"),
            ("PRICE_AGENT_CACHE_INTERVAL_SECS", "-1"),
        ])
        .unwrap();

        assert_eq!(config.server.metrics_port, 0);
        assert_eq!(config.cache.interval, Duration::from_secs(60));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = load(&[("PRICE_AGENT_CACHE_INTERVAL_SECS", "0")]).unwrap();
        assert_eq!(config.cache.interval, Duration::from_secs(1));
    }

    #[test]
    fn malformed_pair_is_an_error() {
        let err = load(&[("PRICE_AGENT_CACHE_PAIRS", "ETH/USD,ETHUSD")]).unwrap_err();
        assert_eq!(err, ConfigError::InvalidPair(PairError::Invalid("ETHUSD".into())));
    }
}
