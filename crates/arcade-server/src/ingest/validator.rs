use super::error::{IngestError, IngestResult};
use std::path::Path;

/// Check that `entry_point` is a regular file directly under `build_root`.
///
/// Read-only and idempotent; safe to call again long after publication.
pub fn validate(build_root: &Path, entry_point: &str) -> IngestResult<()> {
    let candidate = build_root.join(entry_point);

    match std::fs::metadata(&candidate) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(IngestError::StructureInvalid(format!(
            "{} at the build root is not a regular file",
            entry_point
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(IngestError::StructureInvalid(
            format!("{} not found at root level", entry_point),
        )),
        Err(e) => Err(IngestError::fs("inspect entry point", &candidate, e)),
    }
}
