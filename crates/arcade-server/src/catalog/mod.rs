//! Persistent catalog of published games
//!
//! The ingestion pipeline only ever talks to [`CatalogStore`]. Two adapters
//! exist: [`PgCatalog`] for production and [`MemoryCatalog`] for tests and
//! database-less local runs. Vendor error codes are decoded inside each
//! adapter; callers only see [`CatalogError`].

use crate::features::shared::PaginationParams;
use arcade_common::types::GameStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

/// Suffix appended to a build's folder URL to form its play URL
pub const PLAY_SUFFIX: &str = "/index.html";

/// Upper bound of `games.file_size`; must match the CHECK in the migration
pub const MAX_FILE_SIZE: i64 = 524_288_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Game '{0}' not found")]
    NotFound(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid record: {0}")]
    InvalidData(String),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Catalog backend error: {0}")]
    Backend(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Everything the ingestion pipeline knows about a freshly published build
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewGameRecord {
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub game_folder_url: String,
    pub original_filename: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub game_folder_url: String,
    pub play_url: String,
    pub original_filename: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
    pub metadata: serde_json::Value,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameRecord {
    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }
}

pub fn play_url_for(game_folder_url: &str) -> String {
    format!("{}{}", game_folder_url.trim_end_matches('/'), PLAY_SUFFIX)
}

/// Storage backend for game records
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Persist a new record in the `Active` state
    async fn insert(&self, record: NewGameRecord) -> CatalogResult<GameRecord>;

    /// Fetch a record regardless of its lifecycle state
    async fn find(&self, id: Uuid) -> CatalogResult<Option<GameRecord>>;

    /// Active records, newest first, with the total active count
    async fn list_active(&self, params: &PaginationParams) -> CatalogResult<(Vec<GameRecord>, i64)>;

    /// Active records matching `query` in title or description
    async fn search_active(&self, query: &str, limit: i64) -> CatalogResult<Vec<GameRecord>>;

    /// Move a record from `from` to `to`.
    ///
    /// Fails with `NotFound` if the record does not exist and `Conflict` if
    /// it is not currently in `from` or the transition is not allowed.
    async fn transition(&self, id: Uuid, from: GameStatus, to: GameStatus) -> CatalogResult<GameRecord>;

    async fn health_check(&self) -> CatalogResult<()>;
}

pub(crate) fn check_transition(from: GameStatus, to: GameStatus) -> CatalogResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CatalogError::Conflict(format!(
            "cannot move a game from {} to {}",
            from, to
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_url() {
        assert_eq!(play_url_for("/games/game-1"), "/games/game-1/index.html");
        assert_eq!(play_url_for("/games/game-1/"), "/games/game-1/index.html");
    }

    #[test]
    fn test_check_transition() {
        assert!(check_transition(GameStatus::Active, GameStatus::PendingDelete).is_ok());
        assert!(matches!(
            check_transition(GameStatus::Active, GameStatus::Deleted),
            Err(CatalogError::Conflict(_))
        ));
    }
}
