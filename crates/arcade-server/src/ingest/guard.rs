//! Drop guards for artifacts written during a publish attempt
//!
//! A guard owns one path. Unless [`ArtifactGuard::commit`] is called, the
//! path is removed when the guard is dropped: on an early `?` return, on a
//! panic, or when the future holding it is cancelled. Removal is
//! best-effort; failures are logged and never propagated so they cannot mask
//! the error that triggered the rollback.

use super::error::{IngestError, IngestResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    File,
    Directory,
}

#[derive(Debug)]
pub struct ArtifactGuard {
    path: PathBuf,
    kind: ArtifactKind,
    armed: bool,
}

impl ArtifactGuard {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::File,
            armed: true,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::Directory,
            armed: true,
        }
    }

    /// Exclusively create `path` as a new directory and guard it.
    ///
    /// Fails if the directory already exists; two attempts can never share a
    /// build directory.
    pub fn create_dir(path: impl Into<PathBuf>) -> IngestResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| IngestError::fs("create builds area", parent, e))?;
        }
        std::fs::create_dir(&path).map_err(|e| IngestError::fs("create build directory", &path, e))?;
        Ok(Self::directory(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Keep the artifact and hand back its path
    pub fn commit(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let result = match self.kind {
            ArtifactKind::File => std::fs::remove_file(&self.path),
            ArtifactKind::Directory => std::fs::remove_dir_all(&self.path),
        };

        match result {
            Ok(()) => info!(path = %self.path.display(), kind = ?self.kind, "Rolled back artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Artifact already absent during rollback")
            },
            Err(e) => warn!(
                path = %self.path.display(),
                kind = ?self.kind,
                error = %e,
                "Compensating cleanup failed; artifact left on disk"
            ),
        }
    }
}
