//! API server binary
//!
//! Run with: cargo run --bin ultralearn-server

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ultralearn::{config::AppConfig, server::ApiServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ultralearn=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load();

    tracing::info!("Configuration loaded");
    tracing::info!("  - Environment: {}", config.environment);
    tracing::info!("  - Database: {}", config.database.path.display());
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - Chat model: {}", config.llm.chat_model);

    // Check Ollama
    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    let client = reqwest::Client::new();
    match client
        .get(format!("{}/api/tags", config.llm.base_url))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!("Ollama is running");
        }
        _ => {
            tracing::warn!("Ollama not available at {}", config.llm.base_url);
            tracing::warn!("Chat and flashcard generation will fall back to canned replies");
            tracing::warn!("Start it with: ollama serve");
            tracing::warn!(
                "Pull models: ollama pull {} && ollama pull {}",
                config.llm.embed_model,
                config.llm.chat_model
            );
        }
    }

    let server = ApiServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}/api", server.address());
    println!("  Health: http://{}/api/health", server.address());
    println!("  WebSocket: ws://{}/ws/chat", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
