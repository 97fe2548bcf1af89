//! Game build ingestion
//!
//! Turns an uploaded zip archive into a published, browser-playable build:
//!
//! - **staging**: transient uploads and thumbnail finalization
//! - **extractor**: streaming zip extraction with path-escape protection
//! - **normalizer**: collapses a single wrapping folder into the build root
//! - **validator**: entry point presence check
//! - **size**: advisory on-disk size of a build
//! - **retire**: removal of a game's artifacts
//! - **guard**: drop guards that undo partial work on failure or cancellation
//!
//! Everything except `staging` and `retire` is synchronous and expected to
//! run on the blocking pool; [`build_from_archive`] chains those steps for
//! one attempt.

pub mod error;
pub mod extractor;
pub mod guard;
pub mod normalizer;
pub mod retire;
pub mod sanitize;
pub mod size;
pub mod staging;
pub mod validator;

pub use error::{IngestError, IngestResult};
pub use extractor::{extract, ExtractOptions, ExtractionReport, DEFAULT_LARGE_ENTRY_THRESHOLD};
pub use guard::{ArtifactGuard, ArtifactKind};
pub use normalizer::{normalize, Normalization};
pub use retire::retire;
pub use size::size_of;
pub use staging::{StagedFile, StagingArea};
pub use validator::validate;

use arcade_common::checksum;
use arcade_common::types::BuildToken;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// File that must sit at the root of every published build
pub const ENTRY_POINT: &str = "index.html";

pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 500 * 1024 * 1024;
pub const DEFAULT_MAX_THUMBNAIL_BYTES: u64 = 10 * 1024 * 1024;

/// Tunables of the ingestion pipeline
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub large_entry_threshold: u64,
    /// Upper bound on archives being extracted at the same time
    pub max_concurrent_extractions: usize,
    pub max_archive_bytes: u64,
    pub max_thumbnail_bytes: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            large_entry_threshold: DEFAULT_LARGE_ENTRY_THRESHOLD,
            max_concurrent_extractions: default_concurrent_extractions(),
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            max_thumbnail_bytes: DEFAULT_MAX_THUMBNAIL_BYTES,
        }
    }
}

/// One extraction per available core, at least one
pub fn default_concurrent_extractions() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

impl IngestOptions {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            large_entry_threshold: self.large_entry_threshold,
        }
    }
}

/// A build extracted, normalized and validated under its own directory
#[derive(Debug, Clone)]
pub struct ExtractedBuild {
    pub token: BuildToken,
    pub root: PathBuf,
    /// Name of the wrapping folder collapsed by the normalizer
    pub wrapper_folder: Option<String>,
    pub entries: usize,
    pub extracted_bytes: u64,
    /// Hex SHA-256 of the uploaded archive, if it could be computed
    pub archive_sha256: Option<String>,
}

/// Extract `archive` into a fresh `game-<token>` directory under
/// `builds_dir`, then normalize and validate it.
///
/// Blocking. The returned guard still owns the build directory; the caller
/// commits it once the build is recorded in the catalog. On error the
/// directory has already been removed.
#[instrument(skip_all, fields(token = %token, archive = %archive.display()))]
pub fn build_from_archive(
    builds_dir: &Path,
    token: BuildToken,
    archive: &Path,
    options: &IngestOptions,
) -> IngestResult<(ArtifactGuard, ExtractedBuild)> {
    let guard = ArtifactGuard::create_dir(builds_dir.join(token.dir_name()))?;
    let root = guard.path().to_path_buf();

    let report = extract(archive, &root, &options.extract_options())?;
    let normalization = normalize(&root, ENTRY_POINT)?;
    validate(&root, ENTRY_POINT)?;

    let extracted_bytes = size_of(&root);
    let archive_sha256 = match checksum::sha256_file(archive) {
        Ok(digest) => Some(digest),
        Err(e) => {
            warn!(error = %e, "Could not checksum archive");
            None
        },
    };

    info!(
        entries = report.entries,
        extracted_bytes,
        wrapper = ?normalization.detected_folder(),
        "Build ready for publication"
    );

    let build = ExtractedBuild {
        token,
        root,
        wrapper_folder: normalization.detected_folder().map(str::to_string),
        entries: report.entries,
        extracted_bytes,
        archive_sha256,
    };
    Ok((guard, build))
}
