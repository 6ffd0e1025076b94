use anyhow::{Context, Result};
use dotenvy::dotenv;
use evidence::{CapabilityLimits, RetryPolicy, SecretString};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domains::research::ResearchSettings;

/// Application configuration loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub tavily_api_key: SecretString,
    pub openai_api_key: SecretString,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub search_max_concurrency: usize,
    pub search_requests_per_second: u32,
    pub completion_max_concurrency: usize,
    pub completion_requests_per_second: u32,
    pub provider_max_attempts: u32,
    pub provider_backoff_ms: u64,
    pub human_review: bool,
    pub checkpoint_timeout_secs: Option<u64>,
    pub discovery_max_iterations: u32,
    pub event_log_retention: usize,
    pub subscriber_buffer: usize,
    pub allowed_origins: Vec<String>,
}

/// Read `key`, falling back to `default`, and parse it.
fn parsed_var<T: FromStr>(key: &str, default: &str) -> Result<T> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .ok()
        .with_context(|| format!("{} must be a valid {}", key, std::any::type_name::<T>()))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: parsed_var("PORT", "8080")?,
            tavily_api_key: env::var("TAVILY_API_KEY")
                .context("TAVILY_API_KEY must be set")?
                .into(),
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?
                .into(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL").ok().filter(|s| !s.is_empty()),
            search_max_concurrency: parsed_var("SEARCH_MAX_CONCURRENCY", "5")?,
            search_requests_per_second: parsed_var("SEARCH_REQUESTS_PER_SECOND", "5")?,
            completion_max_concurrency: parsed_var("COMPLETION_MAX_CONCURRENCY", "4")?,
            completion_requests_per_second: parsed_var("COMPLETION_REQUESTS_PER_SECOND", "3")?,
            provider_max_attempts: parsed_var("PROVIDER_MAX_ATTEMPTS", "2")?,
            provider_backoff_ms: parsed_var("PROVIDER_BACKOFF_MS", "500")?,
            human_review: parsed_var("HUMAN_REVIEW", "false")?,
            checkpoint_timeout_secs: match env::var("CHECKPOINT_TIMEOUT_SECS") {
                Ok(value) if !value.trim().is_empty() => Some(
                    value
                        .trim()
                        .parse()
                        .context("CHECKPOINT_TIMEOUT_SECS must be a number of seconds")?,
                ),
                _ => None,
            },
            discovery_max_iterations: parsed_var("DISCOVERY_MAX_ITERATIONS", "3")?,
            event_log_retention: parsed_var("EVENT_LOG_RETENTION", "1024")?,
            subscriber_buffer: parsed_var("SUBSCRIBER_BUFFER", "256")?,
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn search_limits(&self) -> CapabilityLimits {
        CapabilityLimits::new(self.search_max_concurrency, self.search_requests_per_second)
    }

    pub fn completion_limits(&self) -> CapabilityLimits {
        CapabilityLimits::new(
            self.completion_max_concurrency,
            self.completion_requests_per_second,
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.provider_max_attempts,
            Duration::from_millis(self.provider_backoff_ms),
        )
    }

    pub fn research_settings(&self) -> ResearchSettings {
        ResearchSettings::default()
            .with_human_review(self.human_review)
            .with_checkpoint_timeout(self.checkpoint_timeout_secs.map(Duration::from_secs))
            .with_max_iterations(self.discovery_max_iterations)
    }
}
