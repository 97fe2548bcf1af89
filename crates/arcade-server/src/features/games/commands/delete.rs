use crate::catalog::{CatalogError, CatalogStore, GameRecord};
use crate::ingest::{self, IngestError};
use crate::storage::StorageLayout;
use arcade_common::types::GameStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteGameCommand {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteGameResponse {
    pub id: Uuid,
    pub deleted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteGameError {
    #[error("Game '{0}' not found")]
    NotFound(Uuid),
    #[error("Game '{0}' is being deleted by another request")]
    Conflict(Uuid),
    #[error("Failed to remove game files: {0}")]
    Retire(#[source] IngestError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Lift lifecycle errors for `id` out of the generic catalog taxonomy
fn lifecycle_error(id: Uuid, err: CatalogError) -> DeleteGameError {
    match err {
        CatalogError::NotFound(_) => DeleteGameError::NotFound(id),
        CatalogError::Conflict(_) => DeleteGameError::Conflict(id),
        other => DeleteGameError::Catalog(other),
    }
}

/// `Active -> PendingDelete`, remove the files, then `PendingDelete -> Deleted`.
///
/// A game left in `PendingDelete` by a failed removal is hidden from reads,
/// and deleting it again resumes at the file removal step.
#[tracing::instrument(skip(catalog, layout))]
pub async fn handle(
    catalog: &dyn CatalogStore,
    layout: &StorageLayout,
    command: DeleteGameCommand,
) -> Result<DeleteGameResponse, DeleteGameError> {
    let id = command.id;
    let game = catalog.find(id).await?.ok_or(DeleteGameError::NotFound(id))?;

    let game = match game.status {
        GameStatus::Deleted => return Err(DeleteGameError::NotFound(id)),
        GameStatus::Active => catalog
            .transition(id, GameStatus::Active, GameStatus::PendingDelete)
            .await
            .map_err(|e| lifecycle_error(id, e))?,
        GameStatus::PendingDelete => {
            info!(game_id = %id, "Resuming interrupted deletion");
            game
        },
    };

    let (thumbnail, build_dir) = artifact_paths(layout, &game);
    ingest::retire(thumbnail.as_deref(), build_dir.as_deref())
        .await
        .map_err(DeleteGameError::Retire)?;

    catalog
        .transition(id, GameStatus::PendingDelete, GameStatus::Deleted)
        .await
        .map_err(|e| lifecycle_error(id, e))?;

    info!(game_id = %id, "Game deleted");
    Ok(DeleteGameResponse { id, deleted: true })
}

fn artifact_paths(layout: &StorageLayout, game: &GameRecord) -> (Option<PathBuf>, Option<PathBuf>) {
    let thumbnail = game.thumbnail_url.as_deref().and_then(|url| {
        let path = layout.resolve_public(url);
        if path.is_none() {
            warn!(game_id = %game.id, url, "Thumbnail URL does not point at managed storage");
        }
        path
    });

    let build_dir = layout.resolve_public(&game.game_folder_url);
    if build_dir.is_none() {
        warn!(
            game_id = %game.id,
            url = %game.game_folder_url,
            "Game folder URL does not point at managed storage"
        );
    }

    (thumbnail, build_dir)
}
