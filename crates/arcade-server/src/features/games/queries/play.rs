use crate::catalog::{CatalogError, CatalogStore};
use crate::ingest::{self, IngestError};
use crate::storage::StorageLayout;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayGameQuery {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayGameResponse {
    pub id: Uuid,
    pub play_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PlayGameError {
    #[error("Game '{0}' not found")]
    NotFound(Uuid),
    #[error("Game '{0}' has no playable build on disk")]
    BuildMissing(Uuid),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Failed to inspect game build: {0}")]
    Inspect(#[source] IngestError),
}

/// Resolve the play URL of an active game after re-checking that its entry
/// point is still on disk.
#[tracing::instrument(skip(catalog, layout))]
pub async fn handle(
    catalog: &dyn CatalogStore,
    layout: &StorageLayout,
    query: PlayGameQuery,
) -> Result<PlayGameResponse, PlayGameError> {
    let game = catalog
        .find(query.id)
        .await?
        .filter(|game| game.is_active())
        .ok_or(PlayGameError::NotFound(query.id))?;

    let build_dir = layout
        .resolve_public(&game.game_folder_url)
        .ok_or(PlayGameError::BuildMissing(game.id))?;

    let checked = tokio::task::spawn_blocking(move || ingest::validate(&build_dir, ingest::ENTRY_POINT))
        .await
        .map_err(|e| PlayGameError::Inspect(IngestError::Worker(e.to_string())))?;

    match checked {
        Ok(()) => Ok(PlayGameResponse {
            id: game.id,
            play_url: game.play_url,
        }),
        Err(IngestError::StructureInvalid(reason)) => {
            warn!(game_id = %game.id, %reason, "Published game lost its entry point");
            Err(PlayGameError::BuildMissing(game.id))
        },
        Err(other) => Err(PlayGameError::Inspect(other)),
    }
}
