use crate::catalog::{CatalogError, CatalogStore, GameRecord};
use serde::{Deserialize, Serialize};

pub const SEARCH_LIMIT: i64 = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchGamesQuery {
    pub q: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchGamesError {
    #[error("Search query 'q' is required")]
    QueryRequired,
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl SearchGamesQuery {
    pub fn validate(&self) -> Result<&str, SearchGamesError> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or(SearchGamesError::QueryRequired)
    }
}

#[tracing::instrument(skip(catalog))]
pub async fn handle(
    catalog: &dyn CatalogStore,
    query: SearchGamesQuery,
) -> Result<Vec<GameRecord>, SearchGamesError> {
    let q = query.validate()?;
    Ok(catalog.search_active(q, SEARCH_LIMIT).await?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;

    #[tokio::test]
    async fn test_query_is_required() {
        let catalog = MemoryCatalog::new();

        for q in [None, Some(""), Some("   ")] {
            let query = SearchGamesQuery { q: q.map(str::to_string) };
            assert!(matches!(
                handle(&catalog, query).await,
                Err(SearchGamesError::QueryRequired)
            ));
        }
    }

    #[tokio::test]
    async fn test_empty_catalog_yields_nothing() {
        let catalog = MemoryCatalog::new();
        let query = SearchGamesQuery {
            q: Some("space".to_string()),
        };

        assert!(handle(&catalog, query).await.unwrap().is_empty());
    }
}
