//! Core types for dataset-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Archive type detected by file name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveType {
    /// ZIP archive (.zip)
    Zip,
    /// Uncompressed tarball (.tar)
    Tar,
    /// Gzip-compressed tarball (.tar.gz, .tgz)
    TarGz,
    /// Bzip2-compressed tarball (.tar.bz2, .tbz, .tbz2)
    TarBz2,
    /// Xz-compressed tarball (.tar.xz, .txz)
    TarXz,
}

impl ArchiveType {
    /// File name suffixes recognized for this archive type (lowercase, with leading dot)
    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            ArchiveType::Zip => &[".zip"],
            ArchiveType::Tar => &[".tar"],
            ArchiveType::TarGz => &[".tar.gz", ".tgz"],
            ArchiveType::TarBz2 => &[".tar.bz2", ".tbz", ".tbz2"],
            ArchiveType::TarXz => &[".tar.xz", ".txz"],
        }
    }

    /// All supported archive types
    pub const ALL: [ArchiveType; 5] = [
        ArchiveType::Zip,
        ArchiveType::Tar,
        ArchiveType::TarGz,
        ArchiveType::TarBz2,
        ArchiveType::TarXz,
    ];
}

impl std::fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArchiveType::Zip => "zip",
            ArchiveType::Tar => "tar",
            ArchiveType::TarGz => "gztar",
            ArchiveType::TarBz2 => "bztar",
            ArchiveType::TarXz => "xztar",
        };
        f.write_str(name)
    }
}

/// A single dataset download, fully resolved and ready to dispatch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Short name used in logs, events and progress bars
    pub name: String,
    /// Source URL
    pub url: String,
    /// Where the downloaded file is written
    pub output_path: PathBuf,
    /// Delete the parent directory of `output_path` before starting
    pub truncate_existing: bool,
    /// Delete archives after successful extraction
    pub cleanup_archive: bool,
    /// Maximum bytes buffered in memory before a write
    pub chunk_size_bytes: usize,
}

impl DownloadJob {
    /// Create a job with default flags (no truncate, cleanup on, 10 MiB chunks)
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            output_path: output_path.into(),
            truncate_existing: false,
            cleanup_archive: true,
            chunk_size_bytes: 10 * 1024 * 1024,
        }
    }

    /// Set whether the output directory is wiped first
    pub fn with_truncate_existing(mut self, truncate: bool) -> Self {
        self.truncate_existing = truncate;
        self
    }

    /// Set whether archives are deleted after extraction
    pub fn with_cleanup_archive(mut self, cleanup: bool) -> Self {
        self.cleanup_archive = cleanup;
        self
    }

    /// Set the in-memory write buffer size
    pub fn with_chunk_size(mut self, chunk_size_bytes: usize) -> Self {
        self.chunk_size_bytes = chunk_size_bytes;
        self
    }
}

/// How a dataset job ended, when it did not fail
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Output already present; nothing was fetched
    Skipped {
        /// The existing path that satisfied the idempotency check
        existing: PathBuf,
    },
    /// Dataset fetched (and unpacked, if it was an archive)
    Completed {
        /// Where the download was written
        path: PathBuf,
        /// Directory the top-level archive was extracted into, if any
        extracted_to: Option<PathBuf>,
        /// Directories where nested archives were unpacked, in visit order
        unpacked: Vec<PathBuf>,
    },
}

/// Event emitted during a dataset job
///
/// Every variant carries the job name so that consumers can keep concurrent
/// jobs apart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job started fetching
    Started {
        /// Job name
        job: String,
        /// Source URL
        url: String,
    },

    /// Output already present, job skipped
    Skipped {
        /// Job name
        job: String,
        /// Existing path
        path: PathBuf,
    },

    /// Bytes written so far
    Downloading {
        /// Job name
        job: String,
        /// Bytes written to disk
        downloaded: u64,
        /// Content-Length, when the server sent one
        total: Option<u64>,
    },

    /// Fetch finished and the file is in place
    Downloaded {
        /// Job name
        job: String,
        /// Final file path
        path: PathBuf,
        /// Total bytes written
        size: u64,
    },

    /// Top-level archive extraction started
    Extracting {
        /// Job name
        job: String,
        /// Archive being extracted
        archive: PathBuf,
    },

    /// Top-level and nested extraction finished
    Extracted {
        /// Job name
        job: String,
        /// Extraction root
        destination: PathBuf,
        /// Number of nested archives unpacked
        nested: usize,
    },

    /// Job finished successfully
    Complete {
        /// Job name
        job: String,
        /// Final path (extraction root for archives, the file otherwise)
        path: PathBuf,
    },

    /// Job failed
    Failed {
        /// Job name
        job: String,
        /// Error message
        error: String,
    },
}

impl Event {
    /// Name of the job this event belongs to
    pub fn job(&self) -> &str {
        match self {
            Event::Started { job, .. }
            | Event::Skipped { job, .. }
            | Event::Downloading { job, .. }
            | Event::Downloaded { job, .. }
            | Event::Extracting { job, .. }
            | Event::Extracted { job, .. }
            | Event::Complete { job, .. }
            | Event::Failed { job, .. } => job,
        }
    }
}
