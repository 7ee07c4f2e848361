mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod planning;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::llm_client::{CompletionService, GeminiClient};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting planner API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite
    let pool = create_pool(&config.database_url).await?;
    init_schema(&pool).await?;

    // Decide the completion capability once for the process lifetime.
    let llm: Option<Arc<dyn CompletionService>> = match &config.gemini_api_key {
        Some(key) => {
            info!(
                "Completion client initialized (model: {})",
                llm_client::MODEL
            );
            Some(Arc::new(GeminiClient::new(
                key.clone(),
                config.llm_timeout_secs,
            )))
        }
        None => {
            warn!("GEMINI_API_KEY not set; AI generation disabled, plans will use the fallback");
            None
        }
    };

    let state = AppState { db: pool, llm };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
