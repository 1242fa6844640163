use std::sync::Arc;

use anyhow::Context;
use roam_easy::{
    config::Config,
    gemini::GeminiClient,
    routes::{router, AppState},
    slot::FileSlot,
    store::TripStore,
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    let gemini = GeminiClient::from_config(&config);
    if gemini.is_demo() {
        tracing::warn!("GEMINI_API_KEY not set, AI flows run in demo mode");
    } else {
        tracing::info!("Using API key: {}... (model {})", config.key_hint(), config.gemini_model);
    }

    let slot = FileSlot::new(&config.data_dir);
    tracing::info!("Trip data directory: {}", slot.dir().display());
    let store = Arc::new(TripStore::new(Arc::new(slot)));
    {
        let store = store.clone();
        tokio::task::spawn_blocking(move || store.load()).await.context("trip store load task panicked")?;
    }

    let state = AppState { store: store.clone(), backend: Arc::new(gemini) };
    let app = router(state);

    let addr = config.addr();
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    store.flush().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
