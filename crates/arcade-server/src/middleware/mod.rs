//! Middleware for the Arcade server
//!
//! - CORS (Cross-Origin Resource Sharing)
//! - Request logging with tracing
//! - Cache and content-type policy for published game assets

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::CorsConfig;

/// One year, for content-addressed build assets
const IMMUTABLE_ASSET_CACHE: &str = "public, max-age=31536000";

/// Create CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            header::CONTENT_LANGUAGE,
            header::CONTENT_TYPE,
        ])
        .max_age(Duration::from_secs(3600));

    let wildcard = config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*");
    if wildcard {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);

        // credentials cannot be combined with a wildcard origin
        if config.allow_credentials {
            cors = cors.allow_credentials(true);
        }
    }

    cors
}

/// Create tracing/logging layer
pub fn tracing_layer(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Micros),
        )
}

/// Headers for files served out of the published builds and thumbnails.
///
/// HTML pages are revalidated on every load so a republished game is picked
/// up; everything else is cached for a year. WebAssembly and Unity `.data`
/// bundles get explicit content types, which browsers require for streaming
/// compilation.
pub async fn static_asset_headers(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_ascii_lowercase();
    let mut response = next.run(request).await;

    if !response.status().is_success() {
        return response;
    }

    let headers = response.headers_mut();
    let is_html = path.ends_with(".html") || path.ends_with('/');
    let cache = if is_html {
        HeaderValue::from_static("no-cache")
    } else {
        HeaderValue::from_static(IMMUTABLE_ASSET_CACHE)
    };
    headers.insert(header::CACHE_CONTROL, cache);

    if path.ends_with(".wasm") {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/wasm"));
    } else if path.ends_with(".data") {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    }

    response
}
