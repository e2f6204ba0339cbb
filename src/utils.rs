//! Utility functions for URL and path manipulation

use crate::error::{DownloadError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix appended to a download target while bytes are still arriving
pub const PARTIAL_SUFFIX: &str = ".part";

/// Derive a file name from the last path segment of a URL
///
/// Query strings and fragments are ignored. Percent-encoded characters are kept
/// as they appear in the URL.
///
/// # Examples
///
/// ```
/// use dataset_dl::utils::file_name_from_url;
///
/// let name = file_name_from_url("https://example.com/files/Yelp-JSON.zip?dl=1").unwrap();
/// assert_eq!(name, "Yelp-JSON.zip");
/// ```
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if let Some(mut segments) = parsed.path_segments()
        && let Some(last_segment) = segments.next_back()
        && !last_segment.is_empty()
    {
        return Ok(last_segment.to_string());
    }

    Err(DownloadError::InvalidUrl {
        url: url.to_string(),
        reason: "URL path has no file name".to_string(),
    }
    .into())
}

/// Path a download is streamed to before it is renamed onto `path`
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("download"));
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Render a list of paths for a single log line
pub fn display_paths(paths: &[PathBuf]) -> String {
    let rendered: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", rendered.join(", "))
}
