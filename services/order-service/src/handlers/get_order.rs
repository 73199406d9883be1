use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ingestion::{ErrorKind, OrderServiceError};
use tracing::{error, info};

use super::MessageResponse;
use crate::state::AppState;

type ErrorResponse = (StatusCode, Json<MessageResponse>);

/// Get a single order by uid
pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
) -> Result<Response, ErrorResponse> {
    if order_uid.is_empty() {
        return Err(missing_id().await);
    }

    info!("Fetching order: {}", order_uid);

    let lookup = state.service.get_by_id(&order_uid);
    match tokio::time::timeout(state.request_timeout, lookup).await {
        Ok(Ok(order)) => Ok(Json(&*order).into_response()),
        Ok(Err(e)) => Err(error_response(&order_uid, e)),
        Err(_) => {
            error!(
                "Fetching order {} exceeded {:?}",
                order_uid, state.request_timeout
            );
            Err(internal_error())
        }
    }
}

/// `/order/` with nothing after the slash
pub async fn missing_id() -> ErrorResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(MessageResponse::new("id required")),
    )
}

fn error_response(order_uid: &str, error: OrderServiceError) -> ErrorResponse {
    match error.kind() {
        ErrorKind::Validation => (
            StatusCode::BAD_REQUEST,
            Json(MessageResponse::new(error.to_string())),
        ),
        ErrorKind::NotFound => {
            info!("Order not found: {}", order_uid);
            (
                StatusCode::NOT_FOUND,
                Json(MessageResponse::new("order not found")),
            )
        }
        ErrorKind::Conflict => (
            StatusCode::CONFLICT,
            Json(MessageResponse::new(error.to_string())),
        ),
        ErrorKind::Infrastructure => {
            error!("Failed to fetch order {}: {}", order_uid, error);
            internal_error()
        }
    }
}

fn internal_error() -> ErrorResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(MessageResponse::new("internal error")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::UidError;
    use storage::{RepositoryError, SqlxError};

    #[test]
    fn test_error_kinds_map_to_status_codes() {
        let uid = "b563feb7b2b84b6ftest";

        let (status, body) = error_response(uid, UidError::InvalidSuffix.into());
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "order UID must end with 'test'");

        let (status, body) = error_response(uid, OrderServiceError::NotFound(uid.into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "order not found");

        let infra = OrderServiceError::from(RepositoryError::Database(SqlxError::PoolTimedOut));
        let (status, body) = error_response(uid, infra);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "internal error");
    }
}
