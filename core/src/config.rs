//! Client configuration.
//!
//! Settings start from built-in defaults and are overridden by environment
//! variables with the `CAAS_` prefix:
//!
//! | Variable               | Default                          |
//! |------------------------|----------------------------------|
//! | `CAAS_API_BASE_URL`    | `http://localhost:8000/api/v1`   |
//! | `CAAS_TIMEOUT_MS`      | `10000` (per attempt)            |
//! | `CAAS_MAX_RETRIES`     | `3`                              |
//! | `CAAS_RETRY_DELAY_MS`  | `1000`                           |
//! | `CAAS_TOKEN_FILE`      | unset (no bearer token)          |

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use thiserror::Error;

use crate::retry::{RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const ENV_PREFIX: &str = "CAAS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid api_base_url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            token_file: None,
        }
    }
}

impl ClientConfig {
    /// Load defaults overridden by `CAAS_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Environment::with_prefix(ENV_PREFIX))
    }

    pub fn load_from(env: Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cfg = Config::builder()
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("timeout_ms", defaults.timeout_ms as i64)?
            .set_default("max_retries", i64::from(defaults.max_retries))?
            .set_default("retry_delay_ms", defaults.retry_delay_ms as i64)?
            .add_source(env.try_parsing(true))
            .build()?;

        let loaded: ClientConfig = cfg.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.api_base_url)
            .map(|_| ())
            .map_err(|source| ConfigError::InvalidBaseUrl {
                url: self.api_base_url.clone(),
                source,
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_delay_ms),
            ..RetryPolicy::default()
        }
    }
}
