//! Multipart upload into the staging area
//!
//! File fields are streamed chunk by chunk to staging files, never buffered
//! whole. Staging files written for a request that fails before the publish
//! starts are removed by their guards.

use super::commands::PublishGameCommand;
use crate::ingest::{ArtifactGuard, IngestError, StagedFile, StagingArea};
use axum::extract::multipart::{Field, Multipart};
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub const TITLE_FIELD: &str = "title";
pub const DESCRIPTION_FIELD: &str = "description";
pub const THUMBNAIL_FIELD: &str = "thumbnail";
pub const ARCHIVE_FIELD: &str = "gameFile";

const ZIP_MIME_TYPES: &[&str] = &["application/zip", "application/x-zip-compressed"];

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_archive_bytes: u64,
    pub max_thumbnail_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Malformed multipart body: {0}")]
    Multipart(String),
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
    #[error("Field '{field}' exceeds the limit of {limit} bytes")]
    TooLarge { field: &'static str, limit: u64 },
    #[error("Thumbnail must be an image, got '{0}'")]
    ThumbnailType(String),
    #[error("Game file must be a zip archive")]
    ArchiveType,
    #[error(transparent)]
    Staging(#[from] IngestError),
}

/// Read the publish form, staging both files
pub async fn read_publish_form(
    multipart: &mut Multipart,
    staging: &StagingArea,
    limits: UploadLimits,
) -> Result<PublishGameCommand, UploadError> {
    let mut title = None;
    let mut description = None;
    let mut thumbnail: Option<(ArtifactGuard, StagedFile)> = None;
    let mut archive: Option<(ArtifactGuard, StagedFile)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            TITLE_FIELD => title = Some(read_text(field).await?),
            DESCRIPTION_FIELD => description = Some(read_text(field).await?),
            THUMBNAIL_FIELD => {
                let mime = field.content_type().unwrap_or_default().to_string();
                if !mime.starts_with("image/") {
                    return Err(UploadError::ThumbnailType(mime));
                }
                thumbnail = Some(
                    stage_field(&mut field, THUMBNAIL_FIELD, staging, limits.max_thumbnail_bytes).await?,
                );
            },
            ARCHIVE_FIELD => {
                if !is_zip(field.content_type(), field.file_name()) {
                    return Err(UploadError::ArchiveType);
                }
                archive = Some(
                    stage_field(&mut field, ARCHIVE_FIELD, staging, limits.max_archive_bytes).await?,
                );
            },
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    let (thumbnail_guard, thumbnail) = thumbnail.ok_or(UploadError::MissingField(THUMBNAIL_FIELD))?;
    let (archive_guard, archive) = archive.ok_or(UploadError::MissingField(ARCHIVE_FIELD))?;

    // the publisher owns the staged files from here on
    thumbnail_guard.commit();
    archive_guard.commit();

    Ok(PublishGameCommand {
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        thumbnail,
        archive,
    })
}

async fn read_text(field: Field<'_>) -> Result<String, UploadError> {
    field
        .text()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))
}

async fn stage_field(
    field: &mut Field<'_>,
    field_name: &'static str,
    staging: &StagingArea,
    limit: u64,
) -> Result<(ArtifactGuard, StagedFile), UploadError> {
    let original_name = field.file_name().unwrap_or(field_name).to_string();
    let mime_type = field.content_type().map(str::to_string);
    let path = staging.stage_path(field_name, &original_name);
    let guard = ArtifactGuard::file(&path);

    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| IngestError::fs("create staging file", &path, e))?;
    let mut size = 0u64;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        size += chunk.len() as u64;
        if size > limit {
            return Err(UploadError::TooLarge {
                field: field_name,
                limit,
            });
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| IngestError::fs("write staging file", &path, e))?;
    }
    file.flush()
        .await
        .map_err(|e| IngestError::fs("write staging file", &path, e))?;

    debug!(field = field_name, bytes = size, path = %path.display(), "Staged upload");
    Ok((
        guard,
        StagedFile {
            path,
            original_name,
            mime_type,
            size,
        },
    ))
}

fn is_zip(content_type: Option<&str>, file_name: Option<&str>) -> bool {
    let by_mime = content_type.is_some_and(|mime| ZIP_MIME_TYPES.contains(&mime));
    let by_name = file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".zip"));
    by_mime || by_name
}
