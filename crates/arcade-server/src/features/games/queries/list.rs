use crate::catalog::{CatalogError, CatalogStore, GameRecord};
use crate::features::shared::{Paginated, PaginationParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListGamesQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub type ListGamesResponse = Paginated<GameRecord>;

#[derive(Debug, thiserror::Error)]
pub enum ListGamesError {
    #[error("{0}")]
    InvalidPagination(String),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl ListGamesQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.per_page)
    }

    pub fn validate(&self) -> Result<(), ListGamesError> {
        self.pagination()
            .validate()
            .map_err(ListGamesError::InvalidPagination)
    }
}

/// Active games, newest first
#[tracing::instrument(skip(catalog))]
pub async fn handle(
    catalog: &dyn CatalogStore,
    query: ListGamesQuery,
) -> Result<ListGamesResponse, ListGamesError> {
    query.validate()?;

    let params = query.pagination();
    let (items, total) = catalog.list_active(&params).await?;

    Ok(Paginated::from_items(items, &params, total))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, NewGameRecord};

    #[tokio::test]
    async fn test_lists_with_metadata() {
        let catalog = MemoryCatalog::new();
        for i in 0..3 {
            catalog
                .insert(NewGameRecord {
                    title: format!("Game {}", i),
                    description: "desc".to_string(),
                    thumbnail_url: None,
                    game_folder_url: format!("/games/game-{}", i),
                    original_filename: "game.zip".to_string(),
                    file_size: 1,
                    mime_type: None,
                    metadata: serde_json::Map::new(),
                })
                .await
                .unwrap();
        }

        let query = ListGamesQuery {
            page: Some(1),
            per_page: Some(2),
        };
        let response = handle(&catalog, query).await.unwrap();

        assert_eq!(response.items.len(), 2);
        assert_eq!(response.pagination.total, 3);
        assert_eq!(response.pagination.pages, 2);
        assert!(response.pagination.has_next);
    }

    #[tokio::test]
    async fn test_rejects_bad_page() {
        let catalog = MemoryCatalog::new();
        let query = ListGamesQuery {
            page: Some(0),
            per_page: None,
        };

        assert!(matches!(
            handle(&catalog, query).await,
            Err(ListGamesError::InvalidPagination(_))
        ));
    }
}
