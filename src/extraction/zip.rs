use crate::error::{Error, ExtractionError, FileOperation, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::shared::extraction_io_error;

/// Archive extractor for ZIP files
pub struct ZipExtractor;

impl ZipExtractor {
    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_zip_entry(
        mut file: zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>> {
        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(
                    ?archive_path,
                    entry = file.name(),
                    "skipping entry with unsafe path"
                );
                return Ok(None);
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&file_path)
                .map_err(|e| Error::filesystem(&file_path, FileOperation::CreateDir, e))?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::filesystem(parent, FileOperation::CreateDir, e))?;
        }

        let mut outfile = std::fs::File::create(&file_path)
            .map_err(|e| Error::filesystem(&file_path, FileOperation::Create, e))?;

        std::io::copy(&mut file, &mut outfile)
            .map_err(|e| extraction_io_error(archive_path, &file_path, e))?;

        Ok(Some(file_path))
    }

    /// Extract every entry of a ZIP archive into `dest_path`
    ///
    /// Entries whose names would escape `dest_path` are skipped.
    ///
    /// # Returns
    ///
    /// The regular files written, in archive order.
    pub fn extract(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, ?dest_path, "extracting ZIP archive");

        let file = std::fs::File::open(archive_path)
            .map_err(|e| Error::filesystem(archive_path, FileOperation::Read, e))?;

        std::fs::create_dir_all(dest_path)
            .map_err(|e| Error::filesystem(dest_path, FileOperation::CreateDir, e))?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractionError::Corrupt {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to read ZIP archive: {}", e),
        })?;

        let mut extracted_files = Vec::new();

        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|e| ExtractionError::Corrupt {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read ZIP entry {}: {}", i, e),
            })?;

            if let Some(file_path) = Self::extract_zip_entry(file, dest_path, archive_path)? {
                extracted_files.push(file_path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }
}
