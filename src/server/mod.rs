use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::GraphQL;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::classify::{ClassificationService, OpenAiClient};
use crate::config::AppConfig;
use crate::graphql::{build_schema, PartmatchSchema};
use crate::storage::SqliteStore;

pub const GRAPHQL_PATH: &str = "/graphql";

/// HTTP routes: GraphQL (POST executes, GET serves GraphiQL) and a health check
pub fn router(schema: PartmatchSchema) -> Router {
    Router::new()
        .route(GRAPHQL_PATH, get(graphiql).post_service(GraphQL::new(schema)))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish())
}

async fn health() -> &'static str {
    "ok"
}

/// Wire the store, the completion client and the schema from config
pub fn build_schema_from_config(config: &AppConfig) -> anyhow::Result<PartmatchSchema> {
    let db_path = config.prepare_database_path()?;
    let store = SqliteStore::open(&db_path)?;

    let client = OpenAiClient::new(&config.openai)?;
    let classifier = ClassificationService::new(store.clone(), Arc::new(client))
        .with_fallback_label(config.fallback_label.clone());

    Ok(build_schema(store, classifier))
}

pub async fn start_server(config: &AppConfig) -> anyhow::Result<()> {
    let schema = build_schema_from_config(config)?;
    let app = router(schema);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);
    println!("🚀 Server ready at http://localhost:{}{}", config.port, GRAPHQL_PATH);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
