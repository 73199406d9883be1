use axum::{http::StatusCode, Json};

use super::MessageResponse;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<MessageResponse>) {
    (StatusCode::OK, Json(MessageResponse::new("ok")))
}
