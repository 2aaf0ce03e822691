use crate::app::TableDescription;
use crate::domain::query::{DeleteRequest, SearchRequest, UpdateRequest};
use crate::domain::schema::{ColumnDef, RegisteredSchema};
use crate::storage::CatalogColumn;
use crate::transport::http::handlers::{data, health, tables};
use crate::transport::http::types::{ApiResponse, AppState, CreateTableRequest, UploadForm};
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        tables::home_handler,
        health::healthcheck_handler,
        tables::create_table_handler,
        tables::list_schemas_handler,
        tables::get_schema_handler,
        data::upload_handler,
        data::update_handler,
        data::delete_handler,
        data::search_handler
    ),
    components(schemas(
        ApiResponse,
        CreateTableRequest,
        ColumnDef,
        RegisteredSchema,
        TableDescription,
        CatalogColumn,
        UploadForm,
        UpdateRequest,
        DeleteRequest,
        SearchRequest
    ))
)]
pub struct ApiDoc;

/// Builds the HTTP surface. `max_upload_bytes` caps every request body.
pub fn create_router(app_state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(tables::home_handler))
        .route("/health", get(health::healthcheck_handler))
        .route("/create_table", post(tables::create_table_handler))
        .route("/add_client_data/:table_name", post(data::upload_handler))
        .route("/update_table_data/:table_name", put(data::update_handler))
        .route("/delete_table_data/:table_name", delete(data::delete_handler))
        .route("/search_table_data/:table_name", post(data::search_handler))
        .route("/schemas", get(tables::list_schemas_handler))
        .route("/schemas/:table_name", get(tables::get_schema_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(app_state)
}
