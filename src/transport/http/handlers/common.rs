use crate::app::ServiceError;
use crate::domain::error::{ErrorClass, QueryError};
use crate::transport::http::types::ApiResponse;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::BadRequest => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn bad_request(error: impl Into<String>) -> (StatusCode, Json<ApiResponse>) {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::failure(error)))
}

/// Maps a service failure onto the response envelope. Validation failures
/// carry the per-row report in `data.invalid_entries`.
pub fn error_response(err: &ServiceError) -> (StatusCode, Json<ApiResponse>) {
    let status = status_for(err.class());
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }

    let mut body = ApiResponse::failure(err.to_string());
    if let ServiceError::Query(QueryError::ValidationFailed(report)) = err {
        body = body.with_data(json!({ "invalid_entries": report.invalid_entries }));
    }
    (status, Json(body))
}
