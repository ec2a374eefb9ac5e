//! Translation freshness tracking and LLM auto-translation for the SPY
//! knowledge base.
//!
//! Source-language rows are authoritative. Every other language row records
//! the hash of the source it was produced from; an explicit reconciliation
//! pass after a source edit flags the rows whose hash no longer matches, and
//! the fan-out orchestrator re-translates them through the language model.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod glossary;
pub mod hash;
pub mod markup;
pub mod models;
pub mod orchestrator;
pub mod outdated;
pub mod overview;
pub mod provider;
pub mod retry;
pub mod security;
pub mod server;
pub mod store;
pub mod translator;

use std::sync::Arc;

/// Wire the production service from configuration.
pub async fn build_service(config: &config::Config) -> anyhow::Result<orchestrator::TranslationService> {
    use anyhow::Context;

    let store = store::PgStore::connect(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    let provider = provider::OpenAiProvider::from_config(config)
        .context("Failed to configure translation provider")?;
    let translator = translator::Translator::new(Arc::new(provider));

    Ok(orchestrator::TranslationService::new(
        Arc::new(store),
        translator,
        Arc::new(clock::SystemClock),
        config.cache_ttl(),
    )
    .with_cost_per_1k_tokens(config.openai_cost_per_1k_tokens)
    .with_job_stale_after(config.job_stale_after())
    .with_recent_jobs_limit(config.recent_jobs_limit))
}

/// Install the tracing subscriber used by the binaries.
pub fn init_logging() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spy_kb_translations=info".parse()?),
        )
        .init();
    Ok(())
}
