//! Batch translation binary - translates every published article into all
//! active languages without going through the HTTP API
//!
//! Usage:
//!   cargo run --bin translate-all                    # Every target language
//!   cargo run --bin translate-all -- --only-outdated # Missing or outdated rows only
//!
//! Required environment variables:
//! - DATABASE_URL
//! - OPENAI_API_KEY
//! - TRANSLATE_API_SECRET

use anyhow::Result;
use spy_kb_translations::{
    build_service, config::Config, init_logging, orchestrator::LanguageSelection,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_logging()?;

    let only_outdated = std::env::args().any(|arg| arg == "--only-outdated");
    let selection = if only_outdated {
        LanguageSelection::MissingOrOutdated
    } else {
        LanguageSelection::All
    };

    let config = Config::from_env()?;
    let service = build_service(&config).await?;

    let entries = service.translate_all_articles(&selection).await?;

    let mut succeeded = 0;
    let mut failed = 0;
    for entry in &entries {
        if let Some(e) = &entry.error {
            error!("{}: {}", entry.slug, e);
            continue;
        }
        for result in &entry.results {
            if result.is_success() {
                succeeded += 1;
            } else {
                failed += 1;
                error!(
                    "{} [{}]: {}",
                    entry.slug,
                    result.lang,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    info!(
        "Batch finished: {} articles, {} translations succeeded, {} failed",
        entries.len(),
        succeeded,
        failed
    );
    println!("{}", serde_json::to_string_pretty(&entries)?);

    Ok(())
}
