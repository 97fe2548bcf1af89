use crate::catalog::{CatalogError, CatalogStore, GameRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetGameQuery {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetGameError {
    #[error("Game '{0}' not found")]
    NotFound(Uuid),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Fetch an active game. Games being deleted or deleted read as missing.
#[tracing::instrument(skip(catalog))]
pub async fn handle(catalog: &dyn CatalogStore, query: GetGameQuery) -> Result<GameRecord, GetGameError> {
    catalog
        .find(query.id)
        .await?
        .filter(GameRecord::is_active)
        .ok_or(GetGameError::NotFound(query.id))
}
