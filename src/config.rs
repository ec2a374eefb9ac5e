use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // OpenAI
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,
    pub openai_timeout_secs: u64,
    pub openai_temperature: f32,
    pub openai_cost_per_1k_tokens: f64,
    pub translation_max_tokens: u32,

    // Admin API
    pub api_secret: String,

    // Read cache / monitoring
    pub cache_ttl_secs: u64,
    pub job_stale_after_mins: i64,
    pub recent_jobs_limit: i64,

    // Server
    pub port: u16,
}

/// Parse `key` when set, fall back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Database
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5)?,

            // OpenAI
            openai_api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            openai_timeout_secs: env_or("OPENAI_TIMEOUT_SECS", 120)?,
            openai_temperature: env_or("OPENAI_TEMPERATURE", 0.3)?,
            openai_cost_per_1k_tokens: env_or("OPENAI_COST_PER_1K_TOKENS", 0.0)?,
            translation_max_tokens: env_or("TRANSLATION_MAX_TOKENS", 4000)?,

            // Admin API
            api_secret: std::env::var("TRANSLATE_API_SECRET")
                .context("TRANSLATE_API_SECRET not set")?,

            // Read cache / monitoring
            cache_ttl_secs: env_or("CACHE_TTL_SECS", 300)?,
            job_stale_after_mins: {
                let mins: i64 = env_or("JOB_STALE_AFTER_MINS", 10)?;
                anyhow::ensure!(
                    mins > 0 && chrono::Duration::try_minutes(mins).is_some(),
                    "JOB_STALE_AFTER_MINS out of range: {}",
                    mins
                );
                mins
            },
            recent_jobs_limit: env_or("RECENT_JOBS_LIMIT", 50)?,

            // Server
            port: env_or("PORT", 8080)?,
        })
    }

    pub fn openai_timeout(&self) -> Duration {
        Duration::from_secs(self.openai_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn job_stale_after(&self) -> chrono::Duration {
        chrono::Duration::try_minutes(self.job_stale_after_mins).unwrap_or(chrono::Duration::MAX)
    }
}
