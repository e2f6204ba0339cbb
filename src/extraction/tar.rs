use crate::error::{Error, ExtractionError, FileOperation, Result};
use crate::types::ArchiveType;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::shared::extraction_io_error;

/// Read buffer for compressed tarballs
const TAR_READ_BUFFER: usize = 1024 * 1024;

/// Decompression layer in front of the tar reader
enum TarCompression<R: Read> {
    Plain(R),
    Gzip(flate2::read::GzDecoder<R>),
    Bzip2(bzip2::read::BzDecoder<R>),
    Xz(xz2::read::XzDecoder<R>),
}

impl<R: Read> TarCompression<R> {
    fn new(archive_type: ArchiveType, reader: R) -> Option<Self> {
        match archive_type {
            ArchiveType::Tar => Some(TarCompression::Plain(reader)),
            ArchiveType::TarGz => Some(TarCompression::Gzip(flate2::read::GzDecoder::new(reader))),
            ArchiveType::TarBz2 => Some(TarCompression::Bzip2(bzip2::read::BzDecoder::new(reader))),
            ArchiveType::TarXz => Some(TarCompression::Xz(xz2::read::XzDecoder::new(reader))),
            ArchiveType::Zip => None,
        }
    }
}

impl<R: Read> Read for TarCompression<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            TarCompression::Plain(reader) => reader.read(buf),
            TarCompression::Gzip(reader) => reader.read(buf),
            TarCompression::Bzip2(reader) => reader.read(buf),
            TarCompression::Xz(reader) => reader.read(buf),
        }
    }
}

/// Archive extractor for tarballs (plain, gzip, bzip2, xz)
pub struct TarExtractor;

impl TarExtractor {
    /// Extract every entry of a tarball into `dest_path`
    ///
    /// Entries whose paths would escape `dest_path` are skipped.
    ///
    /// # Returns
    ///
    /// The regular files written, in archive order.
    pub fn extract(
        archive_path: &Path,
        archive_type: ArchiveType,
        dest_path: &Path,
    ) -> Result<Vec<PathBuf>> {
        debug!(?archive_path, %archive_type, ?dest_path, "extracting tarball");

        let corrupt = |reason: String| -> Error {
            ExtractionError::Corrupt {
                archive: archive_path.to_path_buf(),
                reason,
            }
            .into()
        };

        let file = std::fs::File::open(archive_path)
            .map_err(|e| Error::filesystem(archive_path, FileOperation::Read, e))?;

        std::fs::create_dir_all(dest_path)
            .map_err(|e| Error::filesystem(dest_path, FileOperation::CreateDir, e))?;

        let reader = BufReader::with_capacity(TAR_READ_BUFFER, file);

        let decoder = TarCompression::new(archive_type, reader).ok_or_else(|| {
            ExtractionError::UnsupportedFormat {
                archive: archive_path.to_path_buf(),
            }
        })?;
        let mut archive = tar::Archive::new(decoder);

        let entries = archive
            .entries()
            .map_err(|e| corrupt(format!("failed to read tar entries: {}", e)))?;

        let mut extracted_files = Vec::new();

        for entry in entries {
            let mut entry = entry.map_err(|e| corrupt(format!("failed to read tar entry: {}", e)))?;
            let relative = entry
                .path()
                .map_err(|e| corrupt(format!("invalid tar entry path: {}", e)))?
                .into_owned();
            let is_file = entry.header().entry_type().is_file();
            let target = dest_path.join(&relative);

            let unpacked = entry
                .unpack_in(dest_path)
                .map_err(|e| extraction_io_error(archive_path, &target, e))?;

            if !unpacked {
                warn!(?archive_path, entry = ?relative, "skipping entry with unsafe path");
                continue;
            }

            if is_file {
                extracted_files.push(target);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "tar extraction successful"
        );

        Ok(extracted_files)
    }
}
