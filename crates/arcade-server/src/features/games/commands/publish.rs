//! Publish a game build from staged uploads
//!
//! The thumbnail is moved first, then the archive is extracted into a fresh
//! build directory, normalized and validated, and finally the record is
//! handed to the catalog. Every artifact written along the way is held by an
//! [`ArtifactGuard`]; the guards are committed only once the catalog insert
//! succeeds, so any failure (or a dropped future) leaves nothing behind.

use crate::catalog::{CatalogStore, GameRecord, NewGameRecord};
use crate::ingest::{
    self, ArtifactGuard, ExtractedBuild, IngestError, IngestOptions, StagedFile, StagingArea,
};
use crate::storage::StorageLayout;
use arcade_common::types::BuildToken;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

pub const MAX_TITLE_LENGTH: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishGameCommand {
    pub title: String,
    pub description: String,
    pub thumbnail: StagedFile,
    pub archive: StagedFile,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishGameError {
    #[error("Title is required and cannot be empty")]
    TitleRequired,
    #[error("Title must be at most {} characters", MAX_TITLE_LENGTH)]
    TitleLength,
    #[error("Description is required and cannot be empty")]
    DescriptionRequired,
    #[error("Game archive is empty")]
    ArchiveEmpty,
    #[error("Game archive is {size} bytes, the limit is {max}")]
    ArchiveTooLarge { size: u64, max: u64 },
    #[error("Staged {0} is missing")]
    StagedFileMissing(&'static str),
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl PublishGameError {
    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            PublishGameError::Ingest(err) => err.code(),
            _ => "VALIDATION_ERROR",
        }
    }

    pub fn is_validation(&self) -> bool {
        self.code() == "VALIDATION_ERROR"
    }
}

impl PublishGameCommand {
    pub fn validate(&self, max_archive_bytes: u64) -> Result<(), PublishGameError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(PublishGameError::TitleRequired);
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(PublishGameError::TitleLength);
        }
        if self.description.trim().is_empty() {
            return Err(PublishGameError::DescriptionRequired);
        }
        if self.archive.size == 0 {
            return Err(PublishGameError::ArchiveEmpty);
        }
        if self.archive.size > max_archive_bytes {
            return Err(PublishGameError::ArchiveTooLarge {
                size: self.archive.size,
                max: max_archive_bytes,
            });
        }
        Ok(())
    }
}

/// Runs publish attempts; cheap to clone
#[derive(Clone)]
pub struct GamePublisher {
    layout: StorageLayout,
    staging: StagingArea,
    catalog: Arc<dyn CatalogStore>,
    options: IngestOptions,
    permits: Arc<Semaphore>,
}

impl GamePublisher {
    pub fn new(layout: StorageLayout, catalog: Arc<dyn CatalogStore>, options: IngestOptions) -> Self {
        let permits = Arc::new(Semaphore::new(options.max_concurrent_extractions.max(1)));
        Self {
            staging: StagingArea::new(&layout),
            layout,
            catalog,
            options,
            permits,
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Publish one game. The staged inputs are consumed whatever the outcome.
    #[tracing::instrument(skip(self, command), fields(title = %command.title))]
    pub async fn publish(&self, command: PublishGameCommand) -> Result<GameRecord, PublishGameError> {
        // removes the staged inputs if this future is dropped early
        let staged = [
            ArtifactGuard::file(&command.thumbnail.path),
            ArtifactGuard::file(&command.archive.path),
        ];

        let result = self.publish_staged(&command).await;

        for guard in staged {
            self.staging.cleanup_staging(&guard.commit()).await;
        }
        result
    }

    async fn publish_staged(&self, command: &PublishGameCommand) -> Result<GameRecord, PublishGameError> {
        command.validate(self.options.max_archive_bytes)?;
        ensure_staged(&command.thumbnail.path, "thumbnail").await?;
        ensure_staged(&command.archive.path, "game archive").await?;

        let thumbnail = self
            .staging
            .finalize_thumbnail(&command.thumbnail.path, &command.thumbnail.original_name)
            .await?;

        let (build_guard, build) = self.extract_build(&command.archive.path).await?;

        let game_folder_url = self.public_url(&build.root)?;
        let thumbnail_url = self.public_url(thumbnail.path())?;
        let record = NewGameRecord {
            title: command.title.trim().to_string(),
            description: command.description.trim().to_string(),
            thumbnail_url: Some(thumbnail_url),
            game_folder_url,
            original_filename: command.archive.original_name.clone(),
            file_size: i64::try_from(command.archive.size).unwrap_or(i64::MAX),
            mime_type: command.archive.mime_type.clone(),
            metadata: build_metadata(&build, command.archive.mime_type.as_deref()),
        };

        let game = self
            .catalog
            .insert(record)
            .await
            .map_err(IngestError::from)?;

        thumbnail.commit();
        build_guard.commit();

        info!(
            game_id = %game.id,
            token = %build.token,
            play_url = %game.play_url,
            "Game published"
        );
        Ok(game)
    }

    /// Mint a token and build under it on the blocking pool.
    ///
    /// The guard moves into the blocking job and back out with its result;
    /// if this future is dropped first, the result and its guard are dropped
    /// when the job finishes.
    async fn extract_build(&self, archive: &Path) -> Result<(ArtifactGuard, ExtractedBuild), IngestError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| IngestError::Worker("extraction pool is closed".to_string()))?;

        let token = BuildToken::mint();
        let builds_dir = self.layout.builds_dir();
        let archive = archive.to_path_buf();
        let options = self.options.clone();

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            ingest::build_from_archive(&builds_dir, token, &archive, &options)
        })
        .await
        .map_err(|e| IngestError::Worker(format!("extraction task failed: {}", e)))?
    }

    fn public_url(&self, path: &Path) -> Result<String, IngestError> {
        self.layout.public_path(path).ok_or_else(|| {
            IngestError::Worker(format!("'{}' is not under the public root", path.display()))
        })
    }
}

async fn ensure_staged(path: &Path, what: &'static str) -> Result<(), PublishGameError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(PublishGameError::StagedFileMissing(what)),
    }
}

fn build_metadata(
    build: &ExtractedBuild,
    mime_type: Option<&str>,
) -> serde_json::Map<String, serde_json::Value> {
    let metadata = json!({
        "uploadDate": chrono::Utc::now().to_rfc3339(),
        "fileType": mime_type.unwrap_or("application/zip"),
        "detectedFolder": build.wrapper_folder.as_deref().unwrap_or("root"),
        "buildToken": build.token.to_string(),
        "entryCount": build.entries,
        "extractedSize": build.extracted_bytes,
        "archiveSha256": build.archive_sha256,
    });

    match metadata {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

/// Run a publish on its own task so a disconnecting client cannot abort it
/// halfway.
#[tracing::instrument(skip_all, fields(title = %command.title))]
pub async fn handle(
    publisher: GamePublisher,
    command: PublishGameCommand,
) -> Result<GameRecord, PublishGameError> {
    match tokio::spawn(async move { publisher.publish(command).await }).await {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "Publish task did not complete");
            Err(IngestError::Worker(e.to_string()).into())
        },
    }
}
