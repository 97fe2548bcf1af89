//! Streaming zip extraction into a directory owned by one ingestion attempt
//!
//! Entries are decompressed one at a time through a fixed-size buffer, so
//! peak memory does not depend on archive size. Every entry path goes
//! through [`sanitize::resolve_entry_path`] before anything is written. The
//! first failure deletes the whole destination directory.
//!
//! This module does blocking I/O; callers on the async runtime run it via
//! `tokio::task::spawn_blocking`.

use super::error::{IngestError, IngestResult};
use super::sanitize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info, instrument, warn};
use zip::ZipArchive;

/// Default size above which an entry emits a progress event (1 MiB).
pub const DEFAULT_LARGE_ENTRY_THRESHOLD: u64 = 1024 * 1024;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Entries at least this large are reported at `debug` level
    pub large_entry_threshold: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            large_entry_threshold: DEFAULT_LARGE_ENTRY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub entries: usize,
    pub files: usize,
    pub directories: usize,
    pub bytes_written: u64,
}

/// Extract `archive_path` into `destination`.
///
/// `destination` is created if missing and emptied if present, before the
/// first entry is written. On error it no longer exists.
#[instrument(skip_all, fields(archive = %archive_path.display(), destination = %destination.display()))]
pub fn extract(
    archive_path: &Path,
    destination: &Path,
    options: &ExtractOptions,
) -> IngestResult<ExtractionReport> {
    let result = prepare_destination(destination)
        .and_then(|()| extract_entries(archive_path, destination, options));

    match result {
        Ok(report) => {
            info!(
                entries = report.entries,
                files = report.files,
                bytes = report.bytes_written,
                "Archive extracted"
            );
            Ok(report)
        },
        Err(err) => {
            discard_destination(destination);
            Err(err)
        },
    }
}

fn prepare_destination(destination: &Path) -> IngestResult<()> {
    match fs::symlink_metadata(destination) {
        Ok(meta) if meta.is_dir() => empty_dir(destination),
        Ok(_) => Err(IngestError::fs(
            "prepare extraction directory",
            destination,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "path exists and is not a directory"),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => fs::create_dir_all(destination)
            .map_err(|e| IngestError::fs("create extraction directory", destination, e)),
        Err(e) => Err(IngestError::fs("inspect extraction directory", destination, e)),
    }
}

fn empty_dir(dir: &Path) -> IngestResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| IngestError::fs("list extraction directory", dir, e))?;
    let mut removed = 0usize;

    for entry in entries {
        let entry = entry.map_err(|e| IngestError::fs("list extraction directory", dir, e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| IngestError::fs("inspect stale entry", &path, e))?;
        let result = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| IngestError::fs("remove stale entry", &path, e))?;
        removed += 1;
    }

    if removed > 0 {
        warn!(directory = %dir.display(), removed, "Emptied non-empty extraction directory");
    }
    Ok(())
}

fn extract_entries(
    archive_path: &Path,
    destination: &Path,
    options: &ExtractOptions,
) -> IngestResult<ExtractionReport> {
    let file = File::open(archive_path).map_err(|e| IngestError::fs("open archive", archive_path, e))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| IngestError::ArchiveCorrupt(format!("cannot read zip structure: {}", e)))?;

    let mut report = ExtractionReport::default();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| IngestError::ArchiveCorrupt(format!("cannot read entry #{}: {}", index, e)))?;
        let name = entry.name().to_string();
        report.entries += 1;

        let target = match sanitize::resolve_entry_path(&name, destination)? {
            Some(target) => target,
            None if entry.is_dir() => continue,
            None => {
                return Err(IngestError::ArchiveCorrupt(format!(
                    "file entry '{}' has no usable name",
                    name
                )))
            },
        };

        check_layout_conflict(destination, &target, entry.is_dir(), &name)?;

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| IngestError::fs("create directory", &target, e))?;
            report.directories += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| IngestError::fs("create directory", parent, e))?;
        }

        let declared_size = entry.size();
        if declared_size >= options.large_entry_threshold {
            debug!(entry = %name, bytes = declared_size, "Extracting large entry");
        }

        let written = copy_entry(&mut entry, &name, &target, &mut buffer)?;
        report.files += 1;
        report.bytes_written += written;
    }

    Ok(report)
}

/// Reject an entry whose path clashes with what earlier entries created:
/// a parent that is already a file, or a file/directory kind mismatch at the
/// target itself. Both mean the archive is malformed.
fn check_layout_conflict(destination: &Path, target: &Path, is_dir: bool, name: &str) -> IngestResult<()> {
    let conflict = |what: &str| {
        IngestError::ArchiveCorrupt(format!("entry '{}' conflicts with an earlier {}", name, what))
    };

    for ancestor in target.ancestors().skip(1) {
        if ancestor == destination || !ancestor.starts_with(destination) {
            break;
        }
        match fs::symlink_metadata(ancestor) {
            Ok(meta) if !meta.is_dir() => return Err(conflict("file entry")),
            _ => {},
        }
    }

    match fs::symlink_metadata(target) {
        Ok(meta) if is_dir && !meta.is_dir() => Err(conflict("file entry")),
        Ok(meta) if !is_dir && meta.is_dir() => Err(conflict("directory entry")),
        _ => Ok(()),
    }
}

/// Stream one entry to disk, telling read (archive) failures apart from
/// write (filesystem) failures.
fn copy_entry(
    entry: &mut impl Read,
    name: &str,
    target: &Path,
    buffer: &mut [u8],
) -> IngestResult<u64> {
    let file = File::create(target).map_err(|e| IngestError::fs("create file", target, e))?;
    let mut writer = BufWriter::new(file);
    let mut written = 0u64;

    loop {
        let read = entry
            .read(buffer)
            .map_err(|e| IngestError::ArchiveCorrupt(format!("cannot decompress '{}': {}", name, e)))?;
        if read == 0 {
            break;
        }
        writer
            .write_all(&buffer[..read])
            .map_err(|e| IngestError::fs("write file", target, e))?;
        written += read as u64;
    }

    writer.flush().map_err(|e| IngestError::fs("write file", target, e))?;
    Ok(written)
}

fn discard_destination(destination: &Path) {
    match fs::remove_dir_all(destination) {
        Ok(()) => debug!(destination = %destination.display(), "Removed partial extraction"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => warn!(
            destination = %destination.display(),
            error = %e,
            "Failed to remove partial extraction"
        ),
    }
}
