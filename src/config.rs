// src/config.rs
// =============================================================================
// Runtime settings, loaded in layers with figment:
//
//   1. built-in defaults (Settings::default())
//   2. a YAML file (--config PATH, or ./site-auditor.yaml if it exists)
//   3. environment variables, e.g. SITE_AUDITOR_RATE_LIMIT__MAX_REQUESTS=10
//      ("__" separates nested keys)
//
// Later layers win. The merged result is validated before anyone uses it.
// =============================================================================

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "site-auditor.yaml";
const ENV_PREFIX: &str = "SITE_AUDITOR_";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid rate_limit.max_requests: {0}. Must be at least 1")]
    InvalidMaxRequests(usize),

    #[error("Invalid rate_limit.window_secs: {0}. Must be at least 1")]
    InvalidWindow(u64),

    #[error("Invalid sampling.extra_pages: {0}. Must be at most 100")]
    InvalidExtraPages(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("http.user_agent cannot be empty")]
    EmptyUserAgent,
}

/// Everything the auditor can be tuned with
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub rate_limit: RateLimitSettings,
    pub sampling: SamplingSettings,
    pub logging: LoggingSettings,
    pub ledger: LedgerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub max_redirects: usize,
    pub connect_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!("site-auditor/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 10,
            connect_timeout_secs: 5,
        }
    }
}

/// Per-caller admission limit over a trailing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_requests: usize,
    pub window_secs: u64,
    /// Reported to rejected callers as-is (not derived from the window)
    pub retry_after_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 3600,
            retry_after_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    /// Sitemap pages sampled for phase two, on top of the main page
    pub extra_pages: usize,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self { extra_pages: 14 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// JSON-lines file that receives request and report records.
    /// No path means nothing is persisted.
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Load defaults, then the YAML file, then the environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::from_figment(figment)
            .with_context(|| format!("Failed to load configuration (file: {})", file.display()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .context("Failed to extract configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidMaxRequests(self.rate_limit.max_requests));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidWindow(self.rate_limit.window_secs));
        }
        if self.sampling.extra_pages > 100 {
            return Err(ConfigError::InvalidExtraPages(self.sampling.extra_pages));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyUserAgent);
        }
        Ok(())
    }
}
