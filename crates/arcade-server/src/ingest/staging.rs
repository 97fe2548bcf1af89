//! Staging area: transient uploads on their way to permanent storage

use super::error::{IngestError, IngestResult};
use super::guard::ArtifactGuard;
use crate::storage::StorageLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Extension used when an uploaded thumbnail name carries none.
pub const DEFAULT_THUMBNAIL_EXTENSION: &str = ".jpg";

const MAX_EXTENSION_LEN: usize = 10;

/// A blob materialized in the staging area by the transport layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    /// File name declared by the client
    pub original_name: String,
    pub mime_type: Option<String>,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct StagingArea {
    staging_dir: PathBuf,
    thumbnails_dir: PathBuf,
}

impl StagingArea {
    pub fn new(layout: &StorageLayout) -> Self {
        Self {
            staging_dir: layout.staging_dir().to_path_buf(),
            thumbnails_dir: layout.thumbnails_dir(),
        }
    }

    /// Allocate a unique staging path: `<field>-<unix-millis>-<uuid><ext>`
    pub fn stage_path(&self, field: &str, original_name: &str) -> PathBuf {
        let field: String = field
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        let millis = chrono::Utc::now().timestamp_millis();
        let ext = safe_extension(original_name).unwrap_or_default();

        self.staging_dir
            .join(format!("{}-{}-{}{}", field, millis, Uuid::new_v4().simple(), ext))
    }

    /// Move a staged thumbnail into the thumbnails area.
    ///
    /// The destination name is `thumbnail-<uuid><ext>`, keeping the original
    /// extension (lower-cased) or falling back to `.jpg`. The returned guard
    /// owns the permanent file; commit it once the game is recorded.
    ///
    /// The move and the guard live in one blocking job, so dropping this
    /// future mid-move still removes the destination when the job finishes.
    #[instrument(skip(self), fields(staging = %staging_path.display()))]
    pub async fn finalize_thumbnail(
        &self,
        staging_path: &Path,
        original_name: &str,
    ) -> IngestResult<ArtifactGuard> {
        let ext = safe_extension(original_name)
            .unwrap_or_else(|| DEFAULT_THUMBNAIL_EXTENSION.to_string());
        let destination = self
            .thumbnails_dir
            .join(format!("thumbnail-{}{}", Uuid::new_v4(), ext));
        let source = staging_path.to_path_buf();

        let guard = tokio::task::spawn_blocking(move || {
            std::fs::metadata(&source).map_err(|e| IngestError::fs("read staged thumbnail", &source, e))?;
            let guard = ArtifactGuard::file(destination);
            move_file(&source, guard.path())?;
            Ok::<_, IngestError>(guard)
        })
        .await
        .map_err(|e| IngestError::Worker(format!("thumbnail move failed: {}", e)))??;

        info!(destination = %guard.path().display(), "Thumbnail finalized");
        Ok(guard)
    }

    /// Best-effort removal of a staging artifact. Never fails.
    pub async fn cleanup_staging(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed staging file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staging file"),
        }
    }

    /// Remove every file left in the staging area (e.g. after a crash).
    /// Returns how many files were removed.
    pub async fn purge(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.staging_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.staging_dir.display(), error = %e, "Cannot list staging area");
                return 0;
            },
        };

        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Stopped purging staging area");
                    break;
                },
            };
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                self.cleanup_staging(&entry.path()).await;
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Purged stale staging files");
        }
        removed
    }
}

/// Rename, falling back to copy + delete when source and destination live
/// on different filesystems. Blocking.
fn move_file(from: &Path, to: &Path) -> IngestResult<()> {
    match std::fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IngestError::fs("move staged file", from, e));
        },
        Err(e) => debug!(error = %e, "Rename failed, falling back to copy"),
    }

    std::fs::copy(from, to).map_err(|e| IngestError::fs("copy staged file", to, e))?;

    if let Err(e) = std::fs::remove_file(from) {
        warn!(path = %from.display(), error = %e, "Copied staged file but could not remove the original");
    }
    Ok(())
}

/// Lower-cased `.ext` of `name` when it is short and alphanumeric
fn safe_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}
