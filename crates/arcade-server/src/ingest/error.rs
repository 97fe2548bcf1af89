use crate::catalog::CatalogError;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type IngestResult<T> = Result<T, IngestError>;

/// Failure taxonomy of the ingestion pipeline.
///
/// Everything after `Validation` triggers a full rollback of the artifacts
/// written by the failing attempt.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Filesystem error while trying to {action} '{}': {source}", path.display())]
    FileSystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive is corrupt: {0}")]
    ArchiveCorrupt(String),

    #[error("Invalid build structure: {0}")]
    StructureInvalid(String),

    #[error("Catalog persistence failed: {0}")]
    CatalogPersist(#[from] CatalogError),

    #[error("Ingestion worker failed: {0}")]
    Worker(String),
}

impl IngestError {
    pub fn fs(action: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::FileSystem {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Validation(_) => "VALIDATION_ERROR",
            IngestError::FileSystem { .. } => "FILESYSTEM_ERROR",
            IngestError::ArchiveCorrupt(_) => "ARCHIVE_CORRUPT",
            IngestError::StructureInvalid(_) => "STRUCTURE_INVALID",
            IngestError::CatalogPersist(_) => "CATALOG_PERSIST_ERROR",
            IngestError::Worker(_) => "INTERNAL_ERROR",
        }
    }
}
