pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::planning::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/plans",
            get(handlers::handle_list_plans).post(handlers::handle_create_plan),
        )
        .route("/api/v1/plans/:id", get(handlers::handle_get_plan))
        .route(
            "/api/v1/plans/:id/repair",
            post(handlers::handle_repair_plan),
        )
        .with_state(state)
}
