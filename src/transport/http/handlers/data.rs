use crate::domain::query::{display_value, DeleteRequest, SearchRequest, UpdateRequest};
use crate::infra::decode::{decode_upload, UploadFormat};
use crate::transport::http::handlers::common::{bad_request, error_response};
use crate::transport::http::types::{json_422, ApiResponse, AppState};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Reads the `file` part of an upload: (file name, contents).
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<(String, Vec<u8>)>, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Invalid multipart body: {}", e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read uploaded file: {}", e))?;
        return Ok(Some((file_name, bytes.to_vec())));
    }
    Ok(None)
}

#[utoipa::path(
    post,
    path = "/add_client_data/{table_name}",
    params(
        ("table_name" = String, Path, description = "Target table")
    ),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "All rows inserted", body = ApiResponse),
        (status = 400, description = "Bad file or validation failed (see data.invalid_entries)", body = ApiResponse),
        (status = 404, description = "Table not found", body = ApiResponse),
        (status = 500, description = "Insert failed, nothing written", body = ApiResponse)
    )
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(e) => return bad_request(format!("Expected a multipart upload: {}", e)),
    };

    let (file_name, bytes) = match read_file_field(&mut multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => return bad_request("File not provided."),
        Err(e) => return bad_request(e),
    };

    let rows = match UploadFormat::from_file_name(&file_name)
        .and_then(|format| decode_upload(format, &bytes))
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(table = %table_name, file = %file_name, error = %e, "upload not decodable");
            return bad_request(e.to_string());
        }
    };

    match state.service.upload(&table_name, &rows).await {
        Ok(inserted) => (
            StatusCode::CREATED,
            Json(
                ApiResponse::ok(format!("Data added successfully to table {}", table_name))
                    .with_data(json!({ "inserted_count": inserted })),
            ),
        ),
        Err(e) => error_response(&e),
    }
}

#[utoipa::path(
    put,
    path = "/update_table_data/{table_name}",
    params(
        ("table_name" = String, Path, description = "Target table")
    ),
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Row updated", body = ApiResponse),
        (status = 400, description = "Missing fields or invalid columns", body = ApiResponse),
        (status = 404, description = "Table or row not found", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn update_handler(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
    request: Result<Json<UpdateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(
                e,
                "{ primary_key_column, primary_key_value, update_data: { column: value } }",
            )
        }
    };

    match state.service.update(&table_name, &request).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse::ok(format!(
                "Record with {} = {} updated successfully.",
                request.primary_key_column.as_deref().unwrap_or_default(),
                request.primary_key_value.as_ref().map(display_value).unwrap_or_default()
            ))),
        ),
        Err(e) => error_response(&e),
    }
}

#[utoipa::path(
    delete,
    path = "/delete_table_data/{table_name}",
    params(
        ("table_name" = String, Path, description = "Target table")
    ),
    request_body = DeleteRequest,
    responses(
        (status = 200, description = "Row deleted", body = ApiResponse),
        (status = 400, description = "Missing fields or invalid primary key column", body = ApiResponse),
        (status = 404, description = "Table or row not found", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
    request: Result<Json<DeleteRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{ primary_key_column, primary_key_value }"),
    };

    match state.service.delete(&table_name, &request).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse::ok(format!(
                "Record with {} = {} deleted successfully.",
                request.primary_key_column.as_deref().unwrap_or_default(),
                request.primary_key_value.as_ref().map(display_value).unwrap_or_default()
            ))),
        ),
        Err(e) => error_response(&e),
    }
}

#[utoipa::path(
    post,
    path = "/search_table_data/{table_name}",
    params(
        ("table_name" = String, Path, description = "Target table")
    ),
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching rows in data.results", body = ApiResponse),
        (status = 400, description = "Missing search_params or invalid columns", body = ApiResponse),
        (status = 404, description = "Table not found or no matching rows", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn search_handler(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
    request: Result<Json<SearchRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(
                e,
                "{ search_params: { column: value }, order_by?, order_direction? }",
            )
        }
    };

    match state.service.search(&table_name, &request).await {
        Ok(rows) => (
            StatusCode::OK,
            Json(ApiResponse::ok_data(json!({ "results": rows }))),
        ),
        Err(e) => error_response(&e),
    }
}
