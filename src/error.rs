//! Error types for dataset-dl
//!
//! This module provides the error taxonomy for the library:
//! - Domain-specific error types (Download, Extraction, Filesystem, Config)
//! - Contextual information (URL, archive path, filesystem operation)
//! - Stable machine-readable error codes for per-job status reporting

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dataset-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dataset-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "chunk_size_bytes")
        key: Option<String>,
    },

    /// Download-related error (HTTP status, transport failure, bad URL)
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Archive extraction error (corrupt or unsupported archive)
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Filesystem operation failed on a known path
    #[error("failed to {operation} {path}: {source}")]
    Filesystem {
        /// The path the operation was applied to
        path: PathBuf,
        /// The operation that failed
        operation: FileOperation,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error without path context
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (configuration files)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A spawned job or blocking task panicked or was aborted
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl Error {
    /// Wrap an I/O error with the path and operation it came from
    pub fn filesystem(
        path: impl Into<PathBuf>,
        operation: FileOperation,
        source: std::io::Error,
    ) -> Self {
        Error::Filesystem {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Download(e) => match e {
                DownloadError::InvalidUrl { .. } => "invalid_url",
                DownloadError::HttpStatus { .. } => "http_status",
                DownloadError::Transport { .. } => "transport_error",
            },
            Error::Extraction(e) => match e {
                ExtractionError::UnsupportedFormat { .. } => "unsupported_archive",
                ExtractionError::Corrupt { .. } => "corrupt_archive",
                ExtractionError::Write { .. } => "extraction_write_failed",
            },
            Error::Filesystem { .. } => "filesystem_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::TaskFailed(_) => "task_failed",
        }
    }
}

/// Filesystem operation kinds, used for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    /// Creating a file
    Create,
    /// Creating a directory (and its parents)
    CreateDir,
    /// Writing file contents
    Write,
    /// Renaming a file into place
    Rename,
    /// Deleting a file
    Remove,
    /// Recursively deleting a directory
    RemoveDir,
    /// Listing a directory
    ReadDir,
    /// Reading a file
    Read,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self {
            FileOperation::Create => "create",
            FileOperation::CreateDir => "create directory",
            FileOperation::Write => "write",
            FileOperation::Rename => "rename",
            FileOperation::Remove => "remove",
            FileOperation::RemoveDir => "remove directory",
            FileOperation::ReadDir => "read directory",
            FileOperation::Read => "read",
        };
        f.write_str(verb)
    }
}

/// Download-related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL could not be parsed
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Why parsing failed
        reason: String,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The requested URL
        url: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// Connection, timeout or body-streaming failure
    #[error("transport failure fetching {url}: {source}")]
    Transport {
        /// The requested URL
        url: String,
        /// The underlying client error
        #[source]
        source: reqwest::Error,
    },
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The archive's name does not match any supported format
    #[error("unsupported archive format: {archive}")]
    UnsupportedFormat {
        /// The archive that could not be classified
        archive: PathBuf,
    },

    /// The archive could not be read or decoded
    #[error("corrupt archive {archive}: {reason}")]
    Corrupt {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// Writing an extracted entry to disk failed
    #[error("failed to write {path} while extracting {archive}: {source}")]
    Write {
        /// The archive being extracted
        archive: PathBuf,
        /// The output path that could not be written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
