//! Arcade Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! HTTP service that publishes browser games from uploaded zip archives.
//!
//! # Overview
//!
//! - **Ingestion**: staging, streaming extraction, folder normalization and
//!   entry point validation, with compensating cleanup on every failure path
//! - **Catalog**: game records behind the [`catalog::CatalogStore`] trait,
//!   backed by PostgreSQL or an in-memory store
//! - **API**: REST endpoints under `/api/v1/games` plus a static responder for
//!   published builds and thumbnails
//! - **Configuration**: environment-based, see [`config::Config::load`]
//!
//! # Architecture
//!
//! Feature slices follow a command/query split:
//!
//! - **Commands** (write operations): publish a game, delete a game
//! - **Queries** (read operations): list, get, search, play
//!
//! Only active games are visible to queries. Deletion walks
//! `active -> pending_delete -> deleted`, removing files in between.
//!
//! # Example
//!
//! ```no_run
//! use arcade_server::{api, catalog::MemoryCatalog, config::Config, features};
//! use arcade_server::storage::StorageLayout;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let layout = StorageLayout::new(&config.storage);
//!     layout.ensure_dirs().await?;
//!
//!     let catalog = Arc::new(MemoryCatalog::new());
//!     let publisher = features::GamePublisher::new(layout, catalog.clone(), config.ingest.clone());
//!     let state = features::FeatureState {
//!         catalog,
//!         publisher,
//!         upload_body_limit: config.upload_body_limit(),
//!     };
//!
//!     let app = api::create_router(state, &config);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod storage;

// Re-export commonly used types
pub use catalog::{CatalogError, CatalogStore, GameRecord};
pub use ingest::{IngestError, IngestResult};
