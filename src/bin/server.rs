//! HTTP Server for the natural-language query backend

use anyhow::Context;
use cfg_evals::api::AppState;
use cfg_evals::config::Settings;
use cfg_evals::server;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let settings = Settings::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if settings.mock_mode {
        info!("Mock mode enabled - heuristic translation + sample data");
    } else if settings.openai_api_key.is_some() {
        info!(model = %settings.openai_model, "OpenAI API key found - LLM translation enabled");
    } else {
        warn!("OpenAI API key not found - will use heuristic translation");
    }

    let bind_addr = settings.bind_addr.clone();
    let state = Arc::new(AppState::from_settings(settings)?);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    server::serve(listener, state).await?;
    Ok(())
}
