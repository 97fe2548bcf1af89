//! Physical removal of a published game's artifacts

use super::error::{IngestError, IngestResult};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, info, instrument};

/// Remove a game's thumbnail file and build directory.
///
/// Both removals run concurrently. A path that is `None` or already gone
/// counts as removed, so retiring twice is harmless. When both fail, the
/// build directory error is returned and the thumbnail error is logged.
#[instrument(skip_all, fields(
    thumbnail = ?thumbnail.map(Path::display),
    build_dir = ?build_dir.map(Path::display),
))]
pub async fn retire(thumbnail: Option<&Path>, build_dir: Option<&Path>) -> IngestResult<()> {
    let (thumbnail_result, build_result) = tokio::join!(
        remove_thumbnail(thumbnail),
        remove_build_dir(build_dir)
    );

    match (build_result, thumbnail_result) {
        (Ok(()), Ok(())) => {
            info!("Game artifacts retired");
            Ok(())
        },
        (Err(build_err), Err(thumb_err)) => {
            error!(error = %thumb_err, "Thumbnail removal also failed");
            Err(build_err)
        },
        (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
    }
}

async fn remove_thumbnail(path: Option<&Path>) -> IngestResult<()> {
    let Some(path) = path else {
        return Ok(());
    };
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(IngestError::fs("remove thumbnail", path, e)),
    }
}

async fn remove_build_dir(path: Option<&Path>) -> IngestResult<()> {
    let Some(path) = path else {
        return Ok(());
    };
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(IngestError::fs("remove build directory", path, e)),
    }
}
