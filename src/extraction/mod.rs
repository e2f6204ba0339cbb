//! Archive detection and extraction
//!
//! This module classifies files as archives by name, extracts ZIP and tar
//! (plain, gzip, bzip2, xz) archives, and resolves nested archives by walking
//! the extracted tree with an explicit worklist.

mod shared;
mod tar;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

// Re-exports
pub use self::tar::TarExtractor;
pub use self::zip::ZipExtractor;
pub use shared::{detect_archive_type, is_archive, recursive_unpack, strip_archive_suffix};

use crate::error::{Error, ExtractionError, FileOperation, Result};
use crate::types::ArchiveType;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info};

/// Directory an archive is extracted into when no target is given
///
/// This is the archive path with its archive suffix removed, so `data/a.zip`
/// extracts into `data/a` and `data/b.tar.gz` into `data/b`.
pub fn default_extract_dir(archive_path: &Path) -> Result<PathBuf> {
    strip_archive_suffix(archive_path).ok_or_else(|| {
        ExtractionError::UnsupportedFormat {
            archive: archive_path.to_path_buf(),
        }
        .into()
    })
}

/// Extract one archive, then optionally delete it
///
/// Detects the archive type and routes to the matching extractor. The archive is
/// only removed after extraction succeeded, so a failed extraction never loses the
/// source file.
///
/// # Arguments
/// * `archive_path` - Path to the archive file
/// * `extract_to` - Destination directory (default: [`default_extract_dir`])
/// * `cleanup` - Delete the archive after a successful extraction
///
/// # Returns
/// * `Ok(PathBuf)` - The directory the archive was extracted into
/// * `Err(Error)` - Unsupported format, corrupt archive or filesystem failure
///
/// # Example
/// ```no_run
/// use dataset_dl::extraction::unpack;
/// use std::path::Path;
///
/// # fn example() -> dataset_dl::Result<()> {
/// let dir = unpack(Path::new("artifacts/datasets/yelp_json.zip"), None, true)?;
/// assert_eq!(dir, Path::new("artifacts/datasets/yelp_json"));
/// # Ok(())
/// # }
/// ```
pub fn unpack(archive_path: &Path, extract_to: Option<&Path>, cleanup: bool) -> Result<PathBuf> {
    let archive_type =
        detect_archive_type(archive_path).ok_or_else(|| ExtractionError::UnsupportedFormat {
            archive: archive_path.to_path_buf(),
        })?;

    let dest_path = match extract_to {
        Some(path) => path.to_path_buf(),
        None => default_extract_dir(archive_path)?,
    };

    debug!(
        ?archive_path,
        ?dest_path,
        %archive_type,
        "dispatching extraction to appropriate extractor"
    );

    let extracted = match archive_type {
        ArchiveType::Zip => ZipExtractor::extract(archive_path, &dest_path)?,
        ArchiveType::Tar | ArchiveType::TarGz | ArchiveType::TarBz2 | ArchiveType::TarXz => {
            TarExtractor::extract(archive_path, archive_type, &dest_path)?
        }
    };

    if cleanup {
        debug!(?archive_path, "removing extracted archive");
        std::fs::remove_file(archive_path)
            .map_err(|e| Error::filesystem(archive_path, FileOperation::Remove, e))?;
    }

    info!(
        ?archive_path,
        ?dest_path,
        extracted_count = extracted.len(),
        "unpacked archive"
    );

    Ok(dest_path)
}

/// Result of unpacking an archive and everything nested inside it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackSummary {
    /// Directory the top-level archive was extracted into
    pub destination: PathBuf,
    /// Directories where nested archives were unpacked, in visit order
    pub nested: Vec<PathBuf>,
}

/// Unpack an archive and resolve every archive nested inside it
///
/// Runs [`unpack`] followed by [`recursive_unpack`] on the extracted directory,
/// on a blocking thread so the async runtime keeps serving other jobs.
pub async fn unpack_recursive(
    archive_path: &Path,
    cleanup: bool,
    max_depth: u32,
) -> Result<UnpackSummary> {
    let archive_owned = archive_path.to_path_buf();

    spawn_blocking(move || {
        let destination = unpack(&archive_owned, None, cleanup)?;
        let nested = recursive_unpack(&destination, cleanup, max_depth)?;
        Ok(UnpackSummary {
            destination,
            nested,
        })
    })
    .await
    .map_err(|e| Error::TaskFailed(format!("extraction task panicked: {}", e)))?
}
