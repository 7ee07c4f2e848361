use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::planning::marks::MarksError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Completion and extraction failures never reach this type — the
/// normalizer absorbs them into a degraded result. What surfaces here is
/// user input the planner cannot act on, plus infrastructure faults.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Marks input error: {0}")]
    Marks(#[from] MarksError),

    #[error("Subject '{0}' has a total max marks of zero; cannot rank performance")]
    ZeroDenominator(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Marks(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MARKS_PARSE_ERROR",
                format!("Could not parse subject marks: {e}"),
            ),
            AppError::ZeroDenominator(subject) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "ZERO_DENOMINATOR",
                format!(
                    "Subject '{subject}' has assessments totalling 0 max marks; \
                     fix the marks input so every subject has a positive maximum"
                ),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
