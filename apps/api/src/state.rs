use std::sync::Arc;

use sqlx::SqlitePool;

use crate::llm_client::CompletionService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// The completion capability, decided once at startup: `None` when no
    /// API key is configured, in which case the normalizer answers with
    /// its disabled-state result.
    pub llm: Option<Arc<dyn CompletionService>>,
}
