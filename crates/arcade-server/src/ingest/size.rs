use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const PROGRESS_EVERY: u64 = 100;

/// Total size in bytes of all regular files below `dir`.
///
/// Advisory only: unreadable directories and failed stats are skipped, so
/// the result is a best-effort lower bound (zero if `dir` is unreadable).
/// Symlinks are not followed.
pub fn size_of(dir: &Path) -> u64 {
    let mut total = 0u64;
    let mut files = 0u64;
    let mut pending: Vec<PathBuf> = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(path = %current.display(), error = %e, "Skipping unreadable directory");
                continue;
            },
        };

        for entry in entries.flatten() {
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "Skipping entry without metadata");
                    continue;
                },
            };

            if meta.is_dir() {
                pending.push(entry.path());
            } else if meta.is_file() {
                total = total.saturating_add(meta.len());
                files += 1;
                if files % PROGRESS_EVERY == 0 {
                    trace!(files, bytes = total, "Measuring build size");
                }
            }
        }
    }

    total
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sums_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("Build/deep")).unwrap();
        std::fs::write(tmp.path().join("index.html"), vec![0u8; 10]).unwrap();
        std::fs::write(tmp.path().join("Build/app.wasm"), vec![0u8; 250]).unwrap();
        std::fs::write(tmp.path().join("Build/deep/data"), vec![0u8; 40]).unwrap();

        assert_eq!(size_of(tmp.path()), 300);
    }

    #[test]
    fn test_missing_directory_is_zero() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(size_of(&tmp.path().join("nope")), 0);
    }

    #[test]
    fn test_empty_directory_is_zero() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(size_of(tmp.path()), 0);
    }
}
