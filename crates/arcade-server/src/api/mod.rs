pub mod response;

use crate::config::Config;
use crate::features::{self, FeatureState};
use crate::middleware;
use crate::storage::{GAMES_DIR, THUMBNAILS_DIR};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{compression::CompressionLayer, services::ServeDir};

/// Build the application router: health check, versioned API and the static
/// responder for published builds and thumbnails.
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let layout = state.publisher.layout().clone();

    let static_files = Router::new()
        .nest_service(&format!("/{}", GAMES_DIR), ServeDir::new(layout.builds_dir()))
        .nest_service(&format!("/{}", THUMBNAILS_DIR), ServeDir::new(layout.thumbnails_dir()))
        .layer(axum::middleware::from_fn(middleware::static_asset_headers));

    let health = Router::new()
        .route("/health", get(health_check))
        .with_state(state.clone());

    Router::new()
        .merge(health)
        .nest("/api/v1", features::router(state))
        .merge(static_files)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn health_check(State(state): State<FeatureState>) -> Response {
    match state.catalog.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "catalog": "connected",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Catalog health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "catalog": "unavailable",
                })),
            )
                .into_response()
        },
    }
}
