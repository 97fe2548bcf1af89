//! Collapse a single wrapping folder into the build root
//!
//! Archives are often zipped one level too high (`MyGame/index.html` rather
//! than `index.html`). When the build root holds exactly one directory and
//! that directory contains the entry point, its children are promoted to the
//! root. A lone directory without the entry point is rejected rather than
//! guessed at.

use super::error::{IngestError, IngestResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalization {
    /// Tree already in canonical shape
    Unchanged,
    /// Children of `folder` were moved up to the build root
    Promoted { folder: String },
}

impl Normalization {
    /// Wrapping folder name, if one was collapsed
    pub fn detected_folder(&self) -> Option<&str> {
        match self {
            Normalization::Unchanged => None,
            Normalization::Promoted { folder } => Some(folder),
        }
    }
}

#[instrument(skip_all, fields(build_root = %build_root.display()))]
pub fn normalize(build_root: &Path, entry_point: &str) -> IngestResult<Normalization> {
    let children = list_children(build_root)?;

    let [only] = children.as_slice() else {
        debug!(children = children.len(), "Build root already canonical");
        return Ok(Normalization::Unchanged);
    };

    let meta = fs::symlink_metadata(only).map_err(|e| IngestError::fs("inspect entry", only, e))?;
    if !meta.is_dir() {
        return Ok(Normalization::Unchanged);
    }

    let folder = only
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !only.join(entry_point).is_file() {
        return Err(IngestError::StructureInvalid(format!(
            "the only top-level folder '{}' does not contain {}",
            folder, entry_point
        )));
    }

    promote(build_root, only)?;
    info!(folder = %folder, "Promoted wrapping folder to build root");

    Ok(Normalization::Promoted { folder })
}

/// Move every child of `wrapper` into `root`, then remove `wrapper`.
///
/// The wrapper is first renamed to a private name so that a child sharing
/// the wrapper's name (`X/X/...`) can be promoted. On a name collision the
/// promoted child replaces the existing root entry.
fn promote(root: &Path, wrapper: &Path) -> IngestResult<()> {
    let holding = root.join(format!(".promote-{}", Uuid::new_v4().simple()));
    fs::rename(wrapper, &holding).map_err(|e| IngestError::fs("rename wrapping folder", wrapper, e))?;

    for child in list_children(&holding)? {
        let Some(name) = child.file_name() else {
            continue;
        };
        let target = root.join(name);
        remove_existing(&target)?;
        fs::rename(&child, &target).map_err(|e| IngestError::fs("promote entry", &child, e))?;
    }

    fs::remove_dir(&holding).map_err(|e| IngestError::fs("remove wrapping folder", &holding, e))
}

fn remove_existing(target: &Path) -> IngestResult<()> {
    let meta = match fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(IngestError::fs("inspect promotion target", target, e)),
    };

    debug!(target = %target.display(), "Promoted entry overwrites existing root entry");
    let result = if meta.is_dir() {
        fs::remove_dir_all(target)
    } else {
        fs::remove_file(target)
    };
    result.map_err(|e| IngestError::fs("replace promotion target", target, e))
}

fn list_children(dir: &Path) -> IngestResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| IngestError::fs("list directory", dir, e))?;
    entries
        .map(|entry| {
            entry
                .map(|entry| entry.path())
                .map_err(|e| IngestError::fs("list directory", dir, e))
        })
        .collect()
}
