use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use async_openai::config::OPENAI_API_BASE;

pub const MODEL_ENV: &str = "SYNTAX_TUTOR_MODEL";
pub const API_BASE_ENV: &str = "SYNTAX_TUTOR_API_BASE";
pub const TIMEOUT_ENV: &str = "SYNTAX_TUTOR_TIMEOUT_SECS";

pub const DEFAULT_MODEL: &str = "GigaChat-Max";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorConfig {
    pub model: String,
    /// OpenAI-compatible endpoint; the client library default is used when unset.
    pub api_base: Option<String>,
    pub request_timeout: Duration,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: None,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TutorConfig {
    /// Base URL requests go to, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or(OPENAI_API_BASE)
            .trim_end_matches('/')
    }

    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            return Err(err).context("Failed to load .env file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(model) = non_empty(MODEL_ENV) {
            config.model = model;
        }
        config.api_base = non_empty(API_BASE_ENV);
        if let Some(raw) = non_empty(TIMEOUT_ENV) {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds, got {raw:?}"))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}
