//! Shared fixtures for Arcade server integration tests
//!
//! - [`TestEnv`]: isolated storage root, in-memory catalog and a publisher
//! - [`zip_bytes`]: build fixture archives in memory
//! - [`TestPostgres`]: PostgreSQL container with migrations applied (Docker)
#![allow(dead_code)]

use anyhow::{Context, Result};
use arcade_server::catalog::MemoryCatalog;
use arcade_server::features::GamePublisher;
use arcade_server::ingest::{IngestOptions, StagedFile};
use arcade_server::storage::{StorageConfig, StorageLayout};
use arcade_server::features::games::PublishGameCommand;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::info;
use zip::write::SimpleFileOptions;

pub const INDEX_HTML: &[u8] = b"<!DOCTYPE html><html><body><canvas id=\"game\"></canvas></body></html>";
pub const THUMBNAIL_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-thumbnail";

// ============================================================================
// Archives
// ============================================================================

/// Zip `entries` in order; names ending in `/` become directory entries
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, SimpleFileOptions::default())
                .expect("add directory entry");
        } else {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start file entry");
            writer.write_all(data).expect("write file entry");
        }
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Regular files below `dir`, relative to it, sorted
pub fn list_files(dir: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }

    let mut files = Vec::new();
    walk(dir, dir, &mut files);
    files.sort();
    files
}

/// Direct children of `dir`; empty if it does not exist
pub fn children(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.flatten().map(|e| e.path()).collect())
        .unwrap_or_default()
}

// ============================================================================
// Publishing Environment
// ============================================================================

pub struct TestEnv {
    _root: tempfile::TempDir,
    pub layout: StorageLayout,
    pub catalog: Arc<MemoryCatalog>,
    pub publisher: GamePublisher,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_options(IngestOptions::default()).await
    }

    pub async fn with_options(options: IngestOptions) -> Self {
        let root = tempfile::tempdir().expect("create temp root");
        let layout = StorageLayout::new(&StorageConfig::rooted_at(root.path()));
        layout.ensure_dirs().await.expect("create storage dirs");

        let catalog = Arc::new(MemoryCatalog::new());
        let publisher = GamePublisher::new(layout.clone(), catalog.clone(), options);

        Self {
            _root: root,
            layout,
            catalog,
            publisher,
        }
    }

    /// Write `data` to a fresh staging file, as the upload handler would
    pub fn stage(&self, field: &str, original_name: &str, data: &[u8], mime: &str) -> StagedFile {
        let path = self.publisher.staging().stage_path(field, original_name);
        std::fs::write(&path, data).expect("write staged file");
        StagedFile {
            path,
            original_name: original_name.to_string(),
            mime_type: Some(mime.to_string()),
            size: data.len() as u64,
        }
    }

    pub fn command(&self, title: &str, archive: &[(&str, &[u8])]) -> PublishGameCommand {
        PublishGameCommand {
            title: title.to_string(),
            description: format!("{} is a test game", title),
            thumbnail: self.stage("thumbnail", "cover.png", THUMBNAIL_PNG, "image/png"),
            archive: self.stage("gameFile", "game.zip", &zip_bytes(archive), "application/zip"),
        }
    }

    pub fn build_dirs(&self) -> Vec<PathBuf> {
        children(&self.layout.builds_dir())
    }

    pub fn thumbnails(&self) -> Vec<PathBuf> {
        children(&self.layout.thumbnails_dir())
    }

    pub fn staged(&self) -> Vec<PathBuf> {
        children(self.layout.staging_dir())
    }

    /// Nothing published, nothing staged
    pub fn assert_no_artifacts(&self) {
        assert!(self.build_dirs().is_empty(), "build dirs left: {:?}", self.build_dirs());
        assert!(self.thumbnails().is_empty(), "thumbnails left: {:?}", self.thumbnails());
        assert!(self.staged().is_empty(), "staging files left: {:?}", self.staged());
    }
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
}

impl TestPostgres {
    /// Start a PostgreSQL container and apply the migrations
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let url = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            _container: container,
            pool,
        })
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}
