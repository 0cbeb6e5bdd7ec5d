//! Configuration module
//!
//! Client configuration: API base URL resolution, request timeouts, retry
//! policy, upload rules, search debounce and stats refresh interval.

use std::env;
use std::time::Duration;

use crate::error::{DamError, DamResult};
use crate::validation::upload::{UploadRules, MAX_FILES_PER_SELECTION};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
/// Same-origin path the production build talks to.
pub const PRODUCTION_API_PATH: &str = "/api";

// Common constants
const REQUEST_TIMEOUT_SECS: u64 = 30;
const LIST_TIMEOUT_SECS: u64 = 60;
const UPLOAD_TIMEOUT_SECS: u64 = 300;
const MAX_RETRIES: u32 = 2;
const RETRY_BASE_DELAY_MS: u64 = 1000;
const MAX_FILE_SIZE_MB: u64 = 100;
const SEARCH_DEBOUNCE_MS: u64 = 300;
const SEARCH_MIN_CHARS: usize = 2;
const STATS_REFRESH_SECS: u64 = 30;

/// Retry policy for idempotent requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before retry `n` is `2^n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn none() -> Self {
        RetryConfig {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    pub debounce: Duration,
    pub min_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            debounce: Duration::from_millis(SEARCH_DEBOUNCE_MS),
            min_chars: SEARCH_MIN_CHARS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub environment: String,
    pub request_timeout: Duration,
    pub list_timeout: Duration,
    pub upload_timeout: Duration,
    pub retry: RetryConfig,
    pub upload_rules: UploadRules,
    pub search: SearchConfig,
    pub stats_refresh_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            environment: "development".to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            list_timeout: Duration::from_secs(LIST_TIMEOUT_SECS),
            upload_timeout: Duration::from_secs(UPLOAD_TIMEOUT_SECS),
            retry: RetryConfig::default(),
            upload_rules: UploadRules::default(),
            search: SearchConfig::default(),
            stats_refresh_interval: Duration::from_secs(STATS_REFRESH_SECS),
        }
    }
}

impl ClientConfig {
    /// Check if the client targets a production deployment
    pub fn is_production(&self) -> bool {
        is_production(&self.environment)
    }

    pub fn from_env() -> DamResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source. `from_env` uses the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> DamResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("DAM_ENVIRONMENT")
            .or_else(|| var("ENVIRONMENT"))
            .unwrap_or_else(|| "development".to_string());

        let api_base_url = resolve_api_base_url(
            &environment,
            var("DAM_API_BASE_URL")
                .or_else(|| var("API_BASE_URL"))
                .as_deref(),
            var("DAM_ORIGIN").as_deref(),
        )?;

        let max_file_size_mb = var("DAM_MAX_FILE_SIZE_MB")
            .unwrap_or_else(|| MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let config = ClientConfig {
            api_base_url,
            environment,
            request_timeout: Duration::from_secs(
                var("DAM_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|| REQUEST_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(REQUEST_TIMEOUT_SECS),
            ),
            list_timeout: Duration::from_secs(
                var("DAM_LIST_TIMEOUT_SECS")
                    .unwrap_or_else(|| LIST_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(LIST_TIMEOUT_SECS),
            ),
            upload_timeout: Duration::from_secs(
                var("DAM_UPLOAD_TIMEOUT_SECS")
                    .unwrap_or_else(|| UPLOAD_TIMEOUT_SECS.to_string())
                    .parse()
                    .unwrap_or(UPLOAD_TIMEOUT_SECS),
            ),
            retry: RetryConfig {
                max_retries: var("DAM_MAX_RETRIES")
                    .unwrap_or_else(|| MAX_RETRIES.to_string())
                    .parse()
                    .unwrap_or(MAX_RETRIES),
                base_delay: Duration::from_millis(
                    var("DAM_RETRY_BASE_DELAY_MS")
                        .unwrap_or_else(|| RETRY_BASE_DELAY_MS.to_string())
                        .parse()
                        .unwrap_or(RETRY_BASE_DELAY_MS),
                ),
            },
            upload_rules: UploadRules {
                max_file_size_bytes: max_file_size_mb * 1024 * 1024,
                max_files_per_selection: var("DAM_MAX_FILES_PER_SELECTION")
                    .unwrap_or_else(|| MAX_FILES_PER_SELECTION.to_string())
                    .parse()
                    .unwrap_or(MAX_FILES_PER_SELECTION),
                ..UploadRules::default()
            },
            search: SearchConfig {
                debounce: Duration::from_millis(
                    var("DAM_SEARCH_DEBOUNCE_MS")
                        .unwrap_or_else(|| SEARCH_DEBOUNCE_MS.to_string())
                        .parse()
                        .unwrap_or(SEARCH_DEBOUNCE_MS),
                ),
                min_chars: var("DAM_SEARCH_MIN_CHARS")
                    .unwrap_or_else(|| SEARCH_MIN_CHARS.to_string())
                    .parse()
                    .unwrap_or(SEARCH_MIN_CHARS),
            },
            stats_refresh_interval: Duration::from_secs(
                var("DAM_STATS_REFRESH_SECS")
                    .unwrap_or_else(|| STATS_REFRESH_SECS.to_string())
                    .parse()
                    .unwrap_or(STATS_REFRESH_SECS),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DamResult<()> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(DamError::Config(format!(
                "API base URL must be an absolute http(s) URL, got '{}'",
                self.api_base_url
            )));
        }

        if self.request_timeout.is_zero()
            || self.list_timeout.is_zero()
            || self.upload_timeout.is_zero()
        {
            return Err(DamError::Config(
                "Request timeouts must be greater than zero".to_string(),
            ));
        }

        if self.upload_rules.max_file_size_bytes == 0 {
            return Err(DamError::Config(
                "DAM_MAX_FILE_SIZE_MB must be greater than zero".to_string(),
            ));
        }

        if self.upload_rules.max_files_per_selection == 0 {
            return Err(DamError::Config(
                "DAM_MAX_FILES_PER_SELECTION must be greater than zero".to_string(),
            ));
        }

        if self.search.min_chars == 0 {
            return Err(DamError::Config(
                "DAM_SEARCH_MIN_CHARS must be at least 1".to_string(),
            ));
        }

        if self.stats_refresh_interval.is_zero() {
            return Err(DamError::Config(
                "DAM_STATS_REFRESH_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn is_production(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

/// Development honours the override and falls back to the local backend.
/// Production always uses the same-origin `/api` path, joined to `origin`.
pub fn resolve_api_base_url(
    environment: &str,
    override_url: Option<&str>,
    origin: Option<&str>,
) -> DamResult<String> {
    if is_production(environment) {
        let origin = origin.ok_or_else(|| {
            DamError::Config("DAM_ORIGIN must be set in production".to_string())
        })?;
        return Ok(format!(
            "{}{}",
            origin.trim_end_matches('/'),
            PRODUCTION_API_PATH
        ));
    }

    Ok(override_url
        .unwrap_or(DEFAULT_API_BASE_URL)
        .trim_end_matches('/')
        .to_string())
}
