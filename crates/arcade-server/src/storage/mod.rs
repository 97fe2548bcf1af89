//! Filesystem layout of published artifacts
//!
//! ```text
//! <public_root>/
//!   thumbnails/thumbnail-<uuid>.<ext>
//!   games/game-<uuid>/index.html ...
//! <staging_dir>/
//!   <field>-<millis>-<uuid><ext>
//! ```
//!
//! Public paths (what the catalog stores and the static responder serves)
//! are always derived from on-disk locations relative to the public root.

use arcade_common::types::BuildToken;
use std::path::{Component, Path, PathBuf};
use tracing::{info, instrument};

pub mod config;

pub use config::StorageConfig;

pub const THUMBNAILS_DIR: &str = "thumbnails";
pub const GAMES_DIR: &str = "games";

#[derive(Debug, Clone)]
pub struct StorageLayout {
    public_root: PathBuf,
    staging_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            public_root: config.public_root.clone(),
            staging_dir: config.staging_dir.clone(),
        }
    }

    pub fn public_root(&self) -> &Path {
        &self.public_root
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.public_root.join(THUMBNAILS_DIR)
    }

    pub fn builds_dir(&self) -> PathBuf {
        self.public_root.join(GAMES_DIR)
    }

    pub fn build_dir(&self, token: &BuildToken) -> PathBuf {
        self.builds_dir().join(token.dir_name())
    }

    /// Create the thumbnails, builds and staging areas if missing
    #[instrument(skip(self))]
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [self.thumbnails_dir(), self.builds_dir(), self.staging_dir.clone()] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        info!(
            public_root = %self.public_root.display(),
            staging_dir = %self.staging_dir.display(),
            "Storage directories ready"
        );
        Ok(())
    }

    /// Public URL path (`/games/game-<uuid>`) for a location under the public root
    pub fn public_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.public_root).ok()?;
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str()?),
                _ => return None,
            }
        }
        if segments.is_empty() {
            return None;
        }
        Some(format!("/{}", segments.join("/")))
    }

    /// Inverse of [`public_path`](Self::public_path), restricted to artifacts
    /// this service owns: exactly one segment below `thumbnails/` or `games/`.
    pub fn resolve_public(&self, public_path: &str) -> Option<PathBuf> {
        let trimmed = public_path.strip_prefix('/')?;
        let (area, name) = trimmed.split_once('/')?;
        if area != THUMBNAILS_DIR && area != GAMES_DIR {
            return None;
        }
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return None;
        }
        Some(self.public_root.join(area).join(name))
    }
}
