// src/bin/api_server.rs

use anyhow::Context;
use dynamic_tables::infra::{config, logging};
use dynamic_tables::transport;
use dynamic_tables::{PgStore, TableService};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_tracing();

    let database_url = config::database_url()?;
    let schema = config::db_schema();
    let max_connections = config::max_connections()?;
    let max_upload_bytes = config::max_upload_bytes()?;
    let bind_addr = config::bind_addr();

    // --- Store + Service Initialization ---
    tracing::info!(schema = %schema, max_connections, "connecting to database");
    let store = PgStore::connect(&database_url, max_connections, &schema)
        .await
        .context("Failed to connect to DATABASE_URL")?;

    let service = TableService::new(Arc::new(store));
    service
        .init()
        .await
        .context("Failed to prepare the schema registry table")?;
    tracing::info!("schema registry ready");

    let app_state = transport::http::AppState::new(Arc::new(service));

    // --- API Server Initialization ---
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let app = transport::http::create_router(app_state, max_upload_bytes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("API server listening on http://{}", bind_addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl+C");
            }
            tracing::info!("shutdown signal received, draining connections");
        })
        .await?;

    tracing::info!("graceful shutdown complete");
    Ok(())
}
