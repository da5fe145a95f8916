use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use checkers_core::moves::RulesError;
use checkers_core::snapshot::SnapshotError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The requested move is not among the legal moves for this position.
    #[error("{0}")]
    IllegalMove(String),

    /// A conditional update affected zero rows: another caller won the race.
    #[error("{0}")]
    StaleTransition(String),

    #[error("Insufficient funds")]
    InsufficientFunds,

    /// Operation attempted against a match in the wrong lifecycle state.
    #[error("{0}")]
    InvalidState(String),

    /// A persisted board snapshot failed to parse. The match is left in its
    /// last good state.
    #[error("Corrupt board snapshot: {0}")]
    CorruptSnapshot(#[from] SnapshotError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<RulesError> for AppError {
    fn from(e: RulesError) -> Self {
        AppError::IllegalMove(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::IllegalMove(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::StaleTransition(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::InsufficientFunds => {
                (StatusCode::PAYMENT_REQUIRED, "Insufficient funds".to_string())
            }
            AppError::InvalidState(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::CorruptSnapshot(e) => {
                tracing::error!("Corrupt board snapshot: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Corrupt board snapshot".to_string())
            }
            AppError::Sqlx(e) => {
                tracing::error!("Database error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Anyhow(e) => {
                tracing::error!("Unexpected error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}
