//! Path-escape protection for archive entries
//!
//! Archive entry names are untrusted. An entry resolves to a location under
//! the destination only if, after lexical normalization, it is relative and
//! stays inside the destination. Anything else is a fatal
//! [`IngestError::ArchiveCorrupt`]; entries are never silently skipped.
//!
//! Symlink entries are never materialized as links (the extractor writes
//! their payload as a regular file), so a resolved path cannot be redirected
//! through a link created by an earlier entry.

use super::error::{IngestError, IngestResult};
use std::path::{Component, Path, PathBuf};

/// Resolve `entry_name` against `destination`.
///
/// Returns `Ok(None)` when the entry names the destination itself
/// (e.g. `./`).
pub fn resolve_entry_path(entry_name: &str, destination: &Path) -> IngestResult<Option<PathBuf>> {
    let relative = normalize_entry_name(entry_name)?;
    if relative.as_os_str().is_empty() {
        return Ok(None);
    }

    let resolved = destination.join(&relative);
    if !resolved.starts_with(destination) {
        return Err(escape(entry_name));
    }

    Ok(Some(resolved))
}

/// Lexically normalize an entry name into a relative path.
///
/// Backslashes are treated as separators, since archives produced on Windows
/// frequently use them.
fn normalize_entry_name(entry_name: &str) -> IngestResult<PathBuf> {
    if entry_name.contains('\0') {
        return Err(IngestError::ArchiveCorrupt(format!(
            "entry name contains a NUL byte: {:?}",
            entry_name
        )));
    }

    let unified = entry_name.replace('\\', "/");
    if unified.starts_with('/') || has_drive_prefix(&unified) {
        return Err(escape(entry_name));
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {},
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(escape(entry_name));
                }
            },
            Component::RootDir | Component::Prefix(_) => return Err(escape(entry_name)),
        }
    }

    Ok(normalized)
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn escape(entry_name: &str) -> IngestError {
    IngestError::ArchiveCorrupt(format!(
        "entry '{}' resolves outside the destination directory",
        entry_name
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base() -> PathBuf {
        PathBuf::from("/srv/games/game-1")
    }

    #[test]
    fn test_plain_entries_resolve_inside() {
        let resolved = resolve_entry_path("Build/app.wasm", &base()).unwrap().unwrap();
        assert_eq!(resolved, base().join("Build/app.wasm"));
    }

    #[test]
    fn test_inner_parent_dirs_are_folded() {
        let resolved = resolve_entry_path("a/b/../c.js", &base()).unwrap().unwrap();
        assert_eq!(resolved, base().join("a/c.js"));
    }

    #[test]
    fn test_current_dir_names_the_root() {
        assert!(resolve_entry_path("./", &base()).unwrap().is_none());
        let resolved = resolve_entry_path("./index.html", &base()).unwrap().unwrap();
        assert_eq!(resolved, base().join("index.html"));
    }

    #[test]
    fn test_escaping_entries_are_fatal() {
        for name in [
            "../evil.sh",
            "a/../../evil.sh",
            "/etc/passwd",
            "..\\..\\windows\\system32",
            "C:/Windows/evil.dll",
            "c:evil",
        ] {
            let err = resolve_entry_path(name, &base()).unwrap_err();
            assert!(
                matches!(err, IngestError::ArchiveCorrupt(_)),
                "expected ArchiveCorrupt for {name}"
            );
        }
    }

    #[test]
    fn test_nul_byte_is_rejected() {
        assert!(matches!(
            resolve_entry_path("index\0.html", &base()),
            Err(IngestError::ArchiveCorrupt(_))
        ));
    }
}
