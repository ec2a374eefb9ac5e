use anyhow::Result;
use spy_kb_translations::{build_service, config::Config, init_logging, server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    init_logging()?;

    info!("Starting knowledge base translation service");

    // Load configuration from environment
    let config = Config::from_env()?;
    info!(
        model = %config.openai_model,
        port = config.port,
        "Configuration loaded"
    );

    let service = build_service(&config).await?;
    let state = server::AppState::new(service, config.api_secret.as_str());

    server::serve(state, config.port).await
}
