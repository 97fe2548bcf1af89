//! Feature modules implementing the Arcade API
//!
//! Each feature is a vertical slice:
//! - `commands/` - Write operations (publish, delete)
//! - `queries/` - Read operations (get, list, search)
//! - `routes.rs` - HTTP route definitions
//!
//! # Features
//!
//! - **games**: publishing, browsing and deleting game builds
//! - **shared**: pagination types used across slices

pub mod games;
pub mod shared;

use crate::catalog::CatalogStore;
use axum::Router;
use std::sync::Arc;

pub use games::GamePublisher;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub catalog: Arc<dyn CatalogStore>,
    pub publisher: GamePublisher,
    /// Maximum request body accepted by the upload endpoint
    pub upload_body_limit: usize,
}

/// Mounts every feature under its path prefix:
/// - `/games` - Game publishing and catalog
pub fn router(state: FeatureState) -> Router<()> {
    let upload_body_limit = state.upload_body_limit;
    Router::new().nest("/games", games::games_routes(upload_body_limit).with_state(state))
}
