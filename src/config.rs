//! Configuration management for Floodgate.

use serde::{Deserialize, Serialize};

use crate::error::{FloodgateError, Result};

/// Main configuration for the Floodgate limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Window store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

impl Default for FloodgateConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            rate_limiting: RateLimitingConfig::default(),
        }
    }
}

/// Window store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis connection URL; `None` selects the in-memory store
    pub redis_url: Option<String>,

    /// Prefix applied to every store key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Upper bound on any single store call, in milliseconds
    #[serde(default = "default_store_timeout")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: default_key_prefix(),
            timeout_ms: default_store_timeout(),
        }
    }
}

fn default_key_prefix() -> String {
    "ratelimit".to_string()
}

fn default_store_timeout() -> u64 {
    1000
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Maximum admitted requests per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    /// Admit requests when the window store is unavailable.
    /// Flip to false for deployments that prefer strict enforcement
    /// over availability.
    #[serde(default = "default_fail_open")]
    pub fail_open: bool,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            max_requests: default_max_requests(),
            fail_open: default_fail_open(),
        }
    }
}

fn default_window_ms() -> u64 {
    900_000
}

fn default_max_requests() -> u64 {
    100
}

fn default_fail_open() -> bool {
    true
}

impl FloodgateConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: FloodgateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| FloodgateError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Build configuration from the process environment, starting from
    /// defaults. Recognized variables: `REDIS_URL`, `RATE_LIMIT_WINDOW_MS`,
    /// `RATE_LIMIT_MAX_REQUESTS`, `RATE_LIMIT_FAIL_OPEN`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("REDIS_URL") {
            config.store.redis_url = Some(url);
        }
        if let Ok(raw) = std::env::var("RATE_LIMIT_WINDOW_MS") {
            config.rate_limiting.window_ms = parse_var("RATE_LIMIT_WINDOW_MS", &raw)?;
        }
        if let Ok(raw) = std::env::var("RATE_LIMIT_MAX_REQUESTS") {
            config.rate_limiting.max_requests = parse_var("RATE_LIMIT_MAX_REQUESTS", &raw)?;
        }
        if let Ok(raw) = std::env::var("RATE_LIMIT_FAIL_OPEN") {
            config.rate_limiting.fail_open = raw
                .parse()
                .map_err(|_| bad_var("RATE_LIMIT_FAIL_OPEN", &raw))?;
        }

        Ok(config)
    }
}

fn parse_var(name: &str, raw: &str) -> Result<u64> {
    raw.parse().map_err(|_| bad_var(name, raw))
}

fn bad_var(name: &str, raw: &str) -> FloodgateError {
    FloodgateError::Config(format!("invalid value for {}: {:?}", name, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FloodgateConfig::default();
        assert_eq!(config.rate_limiting.window_ms, 900_000);
        assert_eq!(config.rate_limiting.max_requests, 100);
        assert!(config.rate_limiting.fail_open);
        assert_eq!(config.store.key_prefix, "ratelimit");
        assert_eq!(config.store.timeout_ms, 1000);
        assert!(config.store.redis_url.is_none());
    }

    #[test]
    fn test_parse_yaml_overrides() {
        let yaml = r#"
store:
  redis_url: "redis://127.0.0.1:6379"
  timeout_ms: 250
rate_limiting:
  window_ms: 60000
  max_requests: 20
  fail_open: false
"#;
        let config: FloodgateConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.store.redis_url.as_deref(),
            Some("redis://127.0.0.1:6379")
        );
        assert_eq!(config.store.timeout_ms, 250);
        assert_eq!(config.store.key_prefix, "ratelimit");
        assert_eq!(config.rate_limiting.window_ms, 60_000);
        assert_eq!(config.rate_limiting.max_requests, 20);
        assert!(!config.rate_limiting.fail_open);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "rate_limiting:\n  max_requests: 5\n";
        let config: FloodgateConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.rate_limiting.max_requests, 5);
        assert_eq!(config.rate_limiting.window_ms, 900_000);
        assert!(config.rate_limiting.fail_open);
    }
}
