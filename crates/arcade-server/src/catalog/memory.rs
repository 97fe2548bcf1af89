//! In-process catalog used by tests and `ARCADE_CATALOG=memory` runs

use super::{
    check_transition, play_url_for, CatalogError, CatalogResult, CatalogStore, GameRecord,
    NewGameRecord, MAX_FILE_SIZE,
};
use crate::features::shared::PaginationParams;
use arcade_common::types::GameStatus;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    games: RwLock<HashMap<Uuid, GameRecord>>,
    fail_inserts: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert` fail with `Unavailable`
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Number of records in any state
    pub async fn len(&self) -> usize {
        self.games.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.games.read().await.is_empty()
    }

    fn newest_first(records: &mut [GameRecord]) {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn insert(&self, record: NewGameRecord) -> CatalogResult<GameRecord> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("insert rejected by fault injection".to_string()));
        }
        if record.title.trim().is_empty() {
            return Err(CatalogError::InvalidData("title must not be empty".to_string()));
        }
        if record.file_size <= 0 || record.file_size > MAX_FILE_SIZE {
            return Err(CatalogError::InvalidData(format!(
                "file_size must be between 1 and {}",
                MAX_FILE_SIZE
            )));
        }

        let mut games = self.games.write().await;
        if games.values().any(|g| g.game_folder_url == record.game_folder_url) {
            return Err(CatalogError::Conflict(format!(
                "game folder '{}' is already published",
                record.game_folder_url
            )));
        }

        let now = Utc::now();
        let game = GameRecord {
            id: Uuid::new_v4(),
            play_url: play_url_for(&record.game_folder_url),
            title: record.title,
            description: record.description,
            thumbnail_url: record.thumbnail_url,
            game_folder_url: record.game_folder_url,
            original_filename: record.original_filename,
            file_size: record.file_size,
            mime_type: record.mime_type,
            metadata: serde_json::Value::Object(record.metadata),
            status: GameStatus::Active,
            created_at: now,
            updated_at: now,
        };
        games.insert(game.id, game.clone());
        Ok(game)
    }

    async fn find(&self, id: Uuid) -> CatalogResult<Option<GameRecord>> {
        Ok(self.games.read().await.get(&id).cloned())
    }

    async fn list_active(&self, params: &PaginationParams) -> CatalogResult<(Vec<GameRecord>, i64)> {
        let mut active: Vec<GameRecord> = self
            .games
            .read()
            .await
            .values()
            .filter(|g| g.is_active())
            .cloned()
            .collect();
        Self::newest_first(&mut active);

        let total = active.len() as i64;
        let page = active
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.per_page() as usize)
            .collect();
        Ok((page, total))
    }

    async fn search_active(&self, query: &str, limit: i64) -> CatalogResult<Vec<GameRecord>> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<GameRecord> = self
            .games
            .read()
            .await
            .values()
            .filter(|g| g.is_active())
            .filter(|g| {
                let haystack = format!("{} {}", g.title, g.description).to_lowercase();
                terms.iter().any(|term| haystack.contains(term.as_str()))
            })
            .cloned()
            .collect();
        Self::newest_first(&mut hits);
        hits.truncate(limit.max(0) as usize);
        Ok(hits)
    }

    async fn transition(&self, id: Uuid, from: GameStatus, to: GameStatus) -> CatalogResult<GameRecord> {
        check_transition(from, to)?;

        let mut games = self.games.write().await;
        let game = games.get_mut(&id).ok_or(CatalogError::NotFound(id))?;
        if game.status != from {
            return Err(CatalogError::Conflict(format!(
                "game '{}' is {}, expected {}",
                id, game.status, from
            )));
        }

        game.status = to;
        game.updated_at = Utc::now();
        Ok(game.clone())
    }

    async fn health_check(&self) -> CatalogResult<()> {
        Ok(())
    }
}
