//! PostgreSQL catalog adapter
//!
//! SQLSTATE codes are decoded here and never leave this module.

use super::{
    check_transition, CatalogError, CatalogResult, CatalogStore, GameRecord, NewGameRecord,
};
use crate::features::shared::PaginationParams;
use arcade_common::types::GameStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

const GAME_COLUMNS: &str = r#"
    id, title, description, thumbnail_url, game_folder_url,
    game_folder_url || '/index.html' AS play_url,
    original_filename, file_size, mime_type, metadata, status,
    created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GameRow {
    id: Uuid,
    title: String,
    description: String,
    thumbnail_url: Option<String>,
    game_folder_url: String,
    play_url: String,
    original_filename: String,
    file_size: i64,
    mime_type: Option<String>,
    metadata: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GameRow> for GameRecord {
    type Error = CatalogError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let status: GameStatus = row
            .status
            .parse()
            .map_err(|e| CatalogError::Backend(format!("corrupt status column: {}", e)))?;

        Ok(GameRecord {
            id: row.id,
            title: row.title,
            description: row.description,
            thumbnail_url: row.thumbnail_url,
            game_folder_url: row.game_folder_url,
            play_url: row.play_url,
            original_filename: row.original_filename,
            file_size: row.file_size,
            mime_type: row.mime_type,
            metadata: row.metadata,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_records(rows: Vec<GameRow>) -> CatalogResult<Vec<GameRecord>> {
    rows.into_iter().map(GameRecord::try_from).collect()
}

/// Translate a driver error into the catalog taxonomy
pub(crate) fn decode_sqlx_error(error: sqlx::Error) -> CatalogError {
    match error {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            match db_err.kind() {
                ErrorKind::UniqueViolation | ErrorKind::ForeignKeyViolation => {
                    CatalogError::Conflict(message)
                },
                ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    CatalogError::InvalidData(message)
                },
                _ => match db_err.code().as_deref() {
                    // invalid_text_representation, undefined_column, string_data_right_truncation
                    Some("22P02") | Some("42703") | Some("22001") => CatalogError::InvalidData(message),
                    Some(code) if code.starts_with("08") => CatalogError::Unavailable(message),
                    _ => CatalogError::Backend(message),
                },
            }
        },
        sqlx::Error::RowNotFound => CatalogError::Backend("expected row was not returned".to_string()),
        unavailable @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
            CatalogError::Unavailable(unavailable.to_string())
        },
        other => CatalogError::Backend(other.to_string()),
    }
}

/// Escape `%`, `_` and `\` for use inside an ILIKE pattern
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl CatalogStore for PgCatalog {
    #[instrument(skip(self, record), fields(title = %record.title, folder = %record.game_folder_url))]
    async fn insert(&self, record: NewGameRecord) -> CatalogResult<GameRecord> {
        let sql = format!(
            r#"
            INSERT INTO games (
                id, title, description, thumbnail_url, game_folder_url,
                original_filename, file_size, mime_type, metadata, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            GAME_COLUMNS
        );

        let row = sqlx::query_as::<_, GameRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.thumbnail_url)
            .bind(&record.game_folder_url)
            .bind(&record.original_filename)
            .bind(record.file_size)
            .bind(&record.mime_type)
            .bind(serde_json::Value::Object(record.metadata))
            .bind(GameStatus::Active.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(decode_sqlx_error)?;

        debug!(game_id = %row.id, "Inserted game record");
        row.try_into()
    }

    async fn find(&self, id: Uuid) -> CatalogResult<Option<GameRecord>> {
        let sql = format!("SELECT {} FROM games WHERE id = $1", GAME_COLUMNS);

        sqlx::query_as::<_, GameRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(decode_sqlx_error)?
            .map(GameRecord::try_from)
            .transpose()
    }

    async fn list_active(&self, params: &PaginationParams) -> CatalogResult<(Vec<GameRecord>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM games WHERE status = $1")
            .bind(GameStatus::Active.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(decode_sqlx_error)?;

        let sql = format!(
            r#"
            SELECT {}
            FROM games
            WHERE status = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
            GAME_COLUMNS
        );
        let rows = sqlx::query_as::<_, GameRow>(&sql)
            .bind(GameStatus::Active.as_str())
            .bind(params.per_page())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(decode_sqlx_error)?;

        Ok((into_records(rows)?, total))
    }

    #[instrument(skip(self))]
    async fn search_active(&self, query: &str, limit: i64) -> CatalogResult<Vec<GameRecord>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM games
            WHERE status = $1
              AND (
                to_tsvector('english', title || ' ' || description) @@ plainto_tsquery('english', $2)
                OR title ILIKE $3
              )
            ORDER BY
              ts_rank(to_tsvector('english', title || ' ' || description), plainto_tsquery('english', $2)) DESC,
              created_at DESC
            LIMIT $4
            "#,
            GAME_COLUMNS
        );

        let rows = sqlx::query_as::<_, GameRow>(&sql)
            .bind(GameStatus::Active.as_str())
            .bind(query)
            .bind(like_pattern(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(decode_sqlx_error)?;

        into_records(rows)
    }

    #[instrument(skip(self))]
    async fn transition(&self, id: Uuid, from: GameStatus, to: GameStatus) -> CatalogResult<GameRecord> {
        check_transition(from, to)?;

        let sql = format!(
            r#"
            UPDATE games
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            GAME_COLUMNS
        );
        let updated = sqlx::query_as::<_, GameRow>(&sql)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(decode_sqlx_error)?;

        match updated {
            Some(row) => row.try_into(),
            None => match self.find(id).await? {
                None => Err(CatalogError::NotFound(id)),
                Some(current) => Err(CatalogError::Conflict(format!(
                    "game '{}' is {}, expected {}",
                    id, current.status, from
                ))),
            },
        }
    }

    async fn health_check(&self) -> CatalogResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(decode_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("space"), "%space%");
        assert_eq!(like_pattern("100%_fun\\"), "%100\\%\\_fun\\\\%");
    }

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            decode_sqlx_error(sqlx::Error::PoolTimedOut),
            CatalogError::Unavailable(_)
        ));
        assert!(matches!(
            decode_sqlx_error(sqlx::Error::PoolClosed),
            CatalogError::Unavailable(_)
        ));
    }

    #[test]
    fn test_other_errors_are_backend() {
        assert!(matches!(
            decode_sqlx_error(sqlx::Error::Protocol("bad frame".to_string())),
            CatalogError::Backend(_)
        ));
    }
}
