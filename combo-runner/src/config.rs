//! Pipeline configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration with no sources.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use combo_core::fetch::{RequestDelay, RetryPolicy, SourceSettings};

use crate::filters::FilterConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Longest accepted price cache lifetime: one year.
pub const MAX_PRICE_TTL_HOURS: f64 = 24.0 * 365.0;

/// Top-level configuration bundle for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bypass cache reads for this run. Writes still happen.
    pub fresh: bool,
    /// Accepted for compatibility with browser-driven sources; no effect here.
    pub visible: bool,
    pub debug: bool,
    pub cache_dir: PathBuf,
    pub results_dir: PathBuf,
    pub price_cache_ttl_hours: f64,
    pub concurrent_sources: bool,
    pub retry: RetryConfig,
    pub request_delay: DelayConfig,
    pub circuit_breaker: BreakerConfig,
    pub filters: FilterConfig,
    pub sources: Vec<SourceConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fresh: false,
            visible: false,
            debug: false,
            cache_dir: PathBuf::from("cache"),
            results_dir: PathBuf::from("results"),
            price_cache_ttl_hours: 8.0,
            concurrent_sources: true,
            retry: RetryConfig::default(),
            request_delay: DelayConfig::default(),
            circuit_breaker: BreakerConfig::default(),
            filters: FilterConfig::default(),
            sources: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.price_cache_ttl_hours > 0.0 && self.price_cache_ttl_hours <= MAX_PRICE_TTL_HOURS) {
            return Err(ConfigError::Invalid(format!(
                "price_cache_ttl_hours must be in (0, {MAX_PRICE_TTL_HOURS}], got {}",
                self.price_cache_ttl_hours
            )));
        }
        self.retry.validate("retry")?;
        self.request_delay.validate("request_delay")?;
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "circuit_breaker.failure_threshold must be at least 1".into(),
            ));
        }
        self.filters.validate().map_err(ConfigError::Invalid)?;

        let mut names = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// Price TTL as a chrono duration (minute resolution).
    pub fn price_ttl(&self) -> chrono::Duration {
        let hours = self.price_cache_ttl_hours.clamp(0.0, MAX_PRICE_TTL_HOURS);
        chrono::Duration::minutes((hours * 60.0).round() as i64)
    }

    /// Sources with `enabled = true`, in file order.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Registration settings for one source: global knobs overridden by the
    /// source's own `retry` / `request_delay` tables.
    pub fn settings_for(&self, source: &SourceConfig) -> SourceSettings {
        let retry = source.retry.as_ref().unwrap_or(&self.retry);
        let delay = source.request_delay.as_ref().unwrap_or(&self.request_delay);
        SourceSettings {
            queries: source.queries.clone(),
            retry: retry.to_policy(),
            request_delay: delay.to_delay(),
            breaker_cooldown: Duration::from_secs(self.circuit_breaker.cooldown_secs),
            breaker_threshold: self.circuit_breaker.failure_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub jitter: f64,
    /// Longest honoured `Retry-After` on a 429.
    pub max_rate_limit_wait_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            jitter: 0.25,
            max_rate_limit_wait_secs: 120,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            jitter: self.jitter,
            max_rate_limit_wait: Duration::from_secs(self.max_rate_limit_wait_secs),
        }
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(format!(
                "{section}.max_attempts must be at least 1"
            )));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(ConfigError::Invalid(format!(
                "{section}.jitter must be in [0, 1), got {}",
                self.jitter
            )));
        }
        Ok(())
    }
}

/// Random pause between consecutive requests to one source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DelayConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_ms: 2000,
            max_ms: 5000,
        }
    }
}

impl DelayConfig {
    pub fn to_delay(&self) -> RequestDelay {
        RequestDelay {
            min: Duration::from_millis(self.min_ms),
            max: Duration::from_millis(self.max_ms),
        }
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::Invalid(format!(
                "{section}.min_ms ({}) exceeds max_ms ({})",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    HttpJson,
    File,
}

/// One `[[sources]]` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub listing_url: Option<String>,
    #[serde(default)]
    pub detail_url: Option<String>,
    #[serde(default)]
    pub price_url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub queries: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub request_delay: Option<DelayConfig>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

impl SourceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("source name must not be empty".into()));
        }
        match self.kind {
            SourceKind::HttpJson if self.listing_url.is_none() => {
                return Err(ConfigError::Invalid(format!(
                    "source '{}': http_json sources need listing_url",
                    self.name
                )));
            }
            SourceKind::File if self.path.is_none() => {
                return Err(ConfigError::Invalid(format!(
                    "source '{}': file sources need path",
                    self.name
                )));
            }
            _ => {}
        }
        if let Some(retry) = &self.retry {
            retry.validate(&format!("sources.{}.retry", self.name))?;
        }
        if let Some(delay) = &self.request_delay {
            delay.validate(&format!("sources.{}.request_delay", self.name))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
fresh = true
cache_dir = "/tmp/combo-cache"
price_cache_ttl_hours = 4.5

[retry]
max_attempts = 5

[filters]
max_budget = 1000.0

[[sources]]
name = "microcenter"
kind = "http_json"
listing_url = "https://feeds.example/microcenter/bundles"
queries = [{ zip = "95054" }, { zip = "10001" }]

[sources.request_delay]
min_ms = 0
max_ms = 0

[[sources]]
name = "local"
kind = "file"
path = "fixtures/deals.json"
enabled = false
"#;

    #[test]
    fn empty_config_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.price_ttl(), chrono::Duration::hours(8));
        assert!(config.sources.is_empty());
    }

    #[test]
    fn parses_sources_and_overrides() {
        let config = PipelineConfig::from_toml(SAMPLE).unwrap();
        assert!(config.fresh);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.filters.max_budget, 1000.0);
        assert_eq!(config.filters.min_budget, 500.0);
        assert_eq!(config.price_ttl(), chrono::Duration::minutes(270));

        assert_eq!(config.sources.len(), 2);
        let mc = &config.sources[0];
        assert_eq!(mc.kind, SourceKind::HttpJson);
        assert_eq!(mc.timeout_secs, 30);
        assert_eq!(mc.queries[1].get("zip").map(String::as_str), Some("10001"));

        let enabled: Vec<_> = config.enabled_sources().map(|s| s.name.as_str()).collect();
        assert_eq!(enabled, vec!["microcenter"]);
    }

    #[test]
    fn settings_merge_global_and_source_overrides() {
        let config = PipelineConfig::from_toml(SAMPLE).unwrap();
        let settings = config.settings_for(&config.sources[0]);
        assert_eq!(settings.queries.len(), 2);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.request_delay, RequestDelay::none());
        assert_eq!(settings.breaker_threshold, 3);
        assert_eq!(settings.breaker_cooldown, Duration::from_secs(1800));

        let local = config.settings_for(&config.sources[1]);
        assert_eq!(local.request_delay.min, Duration::from_millis(2000));
        assert_eq!(local.request_delay.max, Duration::from_millis(5000));
    }

    #[test]
    fn http_source_without_listing_url_is_rejected() {
        let err = PipelineConfig::from_toml(
            r#"
[[sources]]
name = "broken"
kind = "http_json"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("listing_url")));
    }

    #[test]
    fn duplicate_source_names_are_rejected() {
        let err = PipelineConfig::from_toml(
            r#"
[[sources]]
name = "a"
kind = "file"
path = "x.json"

[[sources]]
name = "a"
kind = "file"
path = "y.json"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate source name"));
    }

    #[test]
    fn invalid_knobs_are_rejected() {
        assert!(PipelineConfig::from_toml("price_cache_ttl_hours = 0.0").is_err());
        assert!(PipelineConfig::from_toml("[retry]\nmax_attempts = 0").is_err());
        assert!(PipelineConfig::from_toml("[retry]\njitter = 1.5").is_err());
        assert!(PipelineConfig::from_toml("[request_delay]\nmin_ms = 9\nmax_ms = 1").is_err());
        assert!(PipelineConfig::from_toml("[circuit_breaker]\nfailure_threshold = 0").is_err());
    }

    #[test]
    fn huge_price_ttl_is_rejected_not_panicking() {
        let err = PipelineConfig::from_toml("price_cache_ttl_hours = 1e18").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = PipelineConfig {
            price_cache_ttl_hours: 1e18,
            ..PipelineConfig::default()
        };
        assert_eq!(config.price_ttl(), chrono::Duration::days(365));

        let year = PipelineConfig::from_toml("price_cache_ttl_hours = 8760.0").unwrap();
        assert_eq!(year.price_ttl(), chrono::Duration::days(365));
    }

    #[test]
    fn unknown_source_kind_is_a_parse_error() {
        let err = PipelineConfig::from_toml(
            "[[sources]]\nname = \"x\"\nkind = \"selenium\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn shipped_config_parses() {
        let config = PipelineConfig::from_toml(include_str!("../../config/deals.toml")).unwrap();
        assert_eq!(config.enabled_sources().count(), 3);
        let amazon = config.sources.iter().find(|s| s.name == "amazon").unwrap();
        assert_eq!(config.settings_for(amazon).request_delay.min, Duration::from_millis(3000));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PipelineConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
