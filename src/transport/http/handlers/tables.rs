use crate::transport::http::handlers::common::error_response;
use crate::transport::http::types::{json_422, ApiResponse, AppState, CreateTableRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Welcome text", body = String))
)]
pub async fn home_handler() -> &'static str {
    "Welcome to the Home Page!"
}

#[utoipa::path(
    post,
    path = "/create_table",
    request_body = CreateTableRequest,
    responses(
        (status = 200, description = "Table created and schema registered", body = ApiResponse),
        (status = 400, description = "Invalid schema or table already exists", body = ApiResponse),
        (status = 422, description = "Unprocessable entity (invalid JSON body)", body = ApiResponse),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn create_table_handler(
    State(state): State<AppState>,
    request: Result<Json<CreateTableRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{ table_name, columns: [...] }"),
    };

    match state
        .service
        .create_table(&request.table_name, request.columns)
        .await
    {
        Ok(plan) => (
            StatusCode::OK,
            Json(
                ApiResponse::ok(format!("Table '{}' created successfully.", plan.table_name))
                    .with_data(json!({
                        "table_name": plan.table_name,
                        "primary_key": plan.primary_key,
                    })),
            ),
        ),
        Err(e) => {
            tracing::warn!(table = %request.table_name, error = %e, "create table rejected");
            error_response(&e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/schemas",
    responses(
        (status = 200, description = "Registered schemas", body = Vec<RegisteredSchema>),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn list_schemas_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.service.list_schemas().await {
        Ok(schemas) => (
            StatusCode::OK,
            Json(ApiResponse::ok_data(json!({ "schemas": schemas }))),
        ),
        Err(e) => error_response(&e),
    }
}

#[utoipa::path(
    get,
    path = "/schemas/{table_name}",
    params(
        ("table_name" = String, Path, description = "Registered table name")
    ),
    responses(
        (status = 200, description = "Registered schema and live columns", body = TableDescription),
        (status = 404, description = "Table is not registered", body = ApiResponse),
        (status = 500, description = "Internal server error", body = ApiResponse)
    )
)]
pub async fn get_schema_handler(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
) -> impl IntoResponse {
    match state.service.describe(&table_name).await {
        Ok(description) => (StatusCode::OK, Json(ApiResponse::ok_data(json!(description)))),
        Err(e) => error_response(&e),
    }
}
