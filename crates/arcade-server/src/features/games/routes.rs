//! Game API routes
//!
//! - `POST /api/v1/games` - Publish a game (multipart upload)
//! - `GET /api/v1/games` - List active games with pagination
//! - `GET /api/v1/games/search?q=` - Full-text search over active games
//! - `GET /api/v1/games/:id` - Get one active game
//! - `GET /api/v1/games/:id/play` - Redirect to the game's entry point
//! - `DELETE /api/v1/games/:id` - Delete a game and its files

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::catalog::CatalogError;
use crate::features::FeatureState;
use crate::ingest::IngestError;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use super::{
    commands::{self, DeleteGameCommand, DeleteGameError, PublishGameError},
    queries::{
        self, GetGameError, GetGameQuery, ListGamesError, ListGamesQuery, PlayGameError,
        PlayGameQuery, SearchGamesError, SearchGamesQuery,
    },
    upload::{self, UploadError, UploadLimits},
};

// ============================================================================
// Router Configuration
// ============================================================================

pub fn games_routes(upload_body_limit: usize) -> Router<FeatureState> {
    Router::new()
        .route(
            "/",
            get(list_games)
                .post(publish_game)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/search", get(search_games))
        .route("/:id", get(get_game).delete(delete_game))
        .route("/:id/play", get(play_game))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// `201 Created` with the published record
#[tracing::instrument(skip(state, multipart))]
async fn publish_game(
    State(state): State<FeatureState>,
    mut multipart: Multipart,
) -> Result<Response, GamesApiError> {
    let publisher = state.publisher.clone();
    let limits = UploadLimits {
        max_archive_bytes: publisher.options().max_archive_bytes,
        max_thumbnail_bytes: publisher.options().max_thumbnail_bytes,
    };

    let command = upload::read_publish_form(&mut multipart, publisher.staging(), limits).await?;
    let game = commands::publish::handle(publisher, command).await?;

    tracing::info!(game_id = %game.id, "Game published via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(game))).into_response())
}

#[tracing::instrument(skip(state))]
async fn delete_game(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, GamesApiError> {
    let response = commands::delete::handle(
        state.catalog.as_ref(),
        state.publisher.layout(),
        DeleteGameCommand { id },
    )
    .await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

#[tracing::instrument(skip(state, query), fields(page = ?query.page, per_page = ?query.per_page))]
async fn list_games(
    State(state): State<FeatureState>,
    Query(query): Query<ListGamesQuery>,
) -> Result<Response, GamesApiError> {
    let response = queries::list::handle(state.catalog.as_ref(), query).await?;

    tracing::debug!(
        count = response.items.len(),
        total = response.pagination.total,
        "Games listed via API"
    );

    let meta = json!({ "pagination": response.pagination });
    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(response.items, meta))).into_response())
}

#[tracing::instrument(skip(state))]
async fn search_games(
    State(state): State<FeatureState>,
    Query(query): Query<SearchGamesQuery>,
) -> Result<Response, GamesApiError> {
    let games = queries::search::handle(state.catalog.as_ref(), query).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(games))).into_response())
}

#[tracing::instrument(skip(state))]
async fn get_game(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, GamesApiError> {
    let game = queries::get::handle(state.catalog.as_ref(), GetGameQuery { id }).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(game))).into_response())
}

/// `307 Temporary Redirect` to the entry point
#[tracing::instrument(skip(state))]
async fn play_game(
    State(state): State<FeatureState>,
    Path(id): Path<Uuid>,
) -> Result<Response, GamesApiError> {
    let response = queries::play::handle(
        state.catalog.as_ref(),
        state.publisher.layout(),
        PlayGameQuery { id },
    )
    .await?;

    Ok(Redirect::temporary(&response.play_url).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
enum GamesApiError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Publish(#[from] PublishGameError),
    #[error(transparent)]
    Delete(#[from] DeleteGameError),
    #[error(transparent)]
    Get(#[from] GetGameError),
    #[error(transparent)]
    List(#[from] ListGamesError),
    #[error(transparent)]
    Search(#[from] SearchGamesError),
    #[error(transparent)]
    Play(#[from] PlayGameError),
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(code, message))).into_response()
}

fn catalog_error_response(err: &CatalogError) -> Response {
    match err {
        CatalogError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        CatalogError::Conflict(_) => error_response(StatusCode::CONFLICT, "CONFLICT", err.to_string()),
        CatalogError::InvalidData(_) => {
            error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
        },
        CatalogError::Unavailable(_) => {
            tracing::error!(error = %err, "Catalog unavailable");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "The game catalog is temporarily unavailable",
            )
        },
        CatalogError::Backend(_) => {
            tracing::error!(error = %err, "Catalog backend error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "A database error occurred")
        },
    }
}

fn ingest_error_response(err: &IngestError) -> Response {
    match err {
        IngestError::Validation(_) => error_response(StatusCode::BAD_REQUEST, err.code(), err.to_string()),
        IngestError::ArchiveCorrupt(_) | IngestError::StructureInvalid(_) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, err.code(), err.to_string())
        },
        IngestError::CatalogPersist(inner) => catalog_error_response(inner),
        IngestError::FileSystem { .. } | IngestError::Worker(_) => {
            tracing::error!(error = %err, "Ingestion failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.code(),
                "The game could not be stored",
            )
        },
    }
}

impl IntoResponse for GamesApiError {
    fn into_response(self) -> Response {
        match &self {
            GamesApiError::Upload(UploadError::TooLarge { .. }) => {
                error_response(StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", self.to_string())
            },
            GamesApiError::Upload(UploadError::Staging(err)) => ingest_error_response(err),
            GamesApiError::Upload(_) => {
                error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string())
            },

            GamesApiError::Publish(PublishGameError::Ingest(err)) => ingest_error_response(err),
            GamesApiError::Publish(err) => error_response(StatusCode::BAD_REQUEST, err.code(), err.to_string()),

            GamesApiError::Delete(DeleteGameError::NotFound(_))
            | GamesApiError::Get(GetGameError::NotFound(_))
            | GamesApiError::Play(PlayGameError::NotFound(_))
            | GamesApiError::Play(PlayGameError::BuildMissing(_)) => {
                error_response(StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            },
            GamesApiError::Delete(DeleteGameError::Conflict(_)) => {
                error_response(StatusCode::CONFLICT, "CONFLICT", self.to_string())
            },
            GamesApiError::Delete(DeleteGameError::Retire(err))
            | GamesApiError::Play(PlayGameError::Inspect(err)) => ingest_error_response(err),

            GamesApiError::List(ListGamesError::InvalidPagination(_))
            | GamesApiError::Search(SearchGamesError::QueryRequired) => {
                error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.to_string())
            },

            GamesApiError::Delete(DeleteGameError::Catalog(err))
            | GamesApiError::Get(GetGameError::Catalog(err))
            | GamesApiError::List(ListGamesError::Catalog(err))
            | GamesApiError::Search(SearchGamesError::Catalog(err))
            | GamesApiError::Play(PlayGameError::Catalog(err)) => catalog_error_response(err),
        }
    }
}
