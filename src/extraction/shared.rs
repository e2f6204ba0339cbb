use crate::error::{Error, ExtractionError, FileOperation, Result};
use crate::types::ArchiveType;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::unpack;

/// Find the longest supported archive suffix at the end of `name`
///
/// Matching is ASCII case-insensitive. Returns the archive type and the byte length
/// of the matched suffix. A name that is nothing but a suffix (".zip") never matches.
fn match_archive_suffix(name: &str) -> Option<(ArchiveType, usize)> {
    let mut best: Option<(ArchiveType, usize)> = None;

    for archive_type in ArchiveType::ALL {
        for suffix in archive_type.suffixes() {
            if name.len() <= suffix.len() {
                continue;
            }
            let split = name.len() - suffix.len();
            if !name.is_char_boundary(split) || !name[split..].eq_ignore_ascii_case(suffix) {
                continue;
            }
            if best.is_none_or(|(_, len)| suffix.len() > len) {
                best = Some((archive_type, suffix.len()));
            }
        }
    }

    best
}

/// Detect archive type by file name
///
/// Looks only at the name, never at file contents or metadata. The longest matching
/// suffix wins, so `data.tar.gz` is [`ArchiveType::TarGz`] rather than a plain tar.
pub fn detect_archive_type(path: &Path) -> Option<ArchiveType> {
    let name = path.file_name()?.to_str()?;
    match_archive_suffix(name).map(|(archive_type, _)| archive_type)
}

/// Remove the archive suffix from a path (`a/b.tar.gz` becomes `a/b`)
///
/// Returns `None` when the file name has no supported archive suffix.
pub fn strip_archive_suffix(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let (_, suffix_len) = match_archive_suffix(name)?;
    Some(path.with_file_name(&name[..name.len() - suffix_len]))
}

/// Check whether a path is an archive that should be unpacked
///
/// Returns `false` when the path is not an existing regular file, or when its name
/// starts with `.` or `_` (metadata such as `._data.zip` resource forks).
/// Otherwise the decision is made by [`detect_archive_type`].
pub fn is_archive(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || name.starts_with('_') {
        return false;
    }

    detect_archive_type(path).is_some()
}

/// Classify an I/O failure raised while writing extracted entries
///
/// Decoder failures surface as I/O errors too; those mean the archive is damaged,
/// everything else is a problem with the destination.
pub(crate) fn extraction_io_error(archive: &Path, path: &Path, e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::InvalidData
        | std::io::ErrorKind::InvalidInput
        | std::io::ErrorKind::UnexpectedEof => ExtractionError::Corrupt {
            archive: archive.to_path_buf(),
            reason: e.to_string(),
        }
        .into(),
        _ => ExtractionError::Write {
            archive: archive.to_path_buf(),
            path: path.to_path_buf(),
            source: e,
        }
        .into(),
    }
}

/// List a directory's entries sorted by name, with their (non-followed) file types
fn sorted_entries(dir: &Path) -> Result<Vec<(PathBuf, std::fs::FileType)>> {
    let read_dir =
        std::fs::read_dir(dir).map_err(|e| Error::filesystem(dir, FileOperation::ReadDir, e))?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| Error::filesystem(dir, FileOperation::ReadDir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| Error::filesystem(entry.path(), FileOperation::Read, e))?;
        entries.push((entry.path(), file_type));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

/// Unpack every archive reachable from `root`, including archives that earlier
/// extractions in the same walk produced
///
/// The walk is driven by an explicit queue of directories, each tagged with the
/// deepest nesting level it was reached at. Each extraction raises its output
/// directory one level deeper than the archive, even when that directory was
/// already queued, so nested archives are found no matter where they land and a
/// pre-existing directory cannot hide nesting. Archives at a nesting level of
/// `max_depth` or more are left in place.
///
/// Symlinks are never followed, whether they point at directories or archives,
/// and every directory is visited once.
///
/// # Returns
///
/// The directories in which an extraction took place, in visit order. A directory
/// appears once per archive unpacked inside it. A missing `root` (or one that is
/// not a directory) yields an empty list.
///
/// # Errors
///
/// The first failing extraction stops the walk and is returned.
pub fn recursive_unpack(root: &Path, cleanup: bool, max_depth: u32) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        debug!(?root, "not a directory, nothing to unpack");
        return Ok(Vec::new());
    }

    let mut queue = VecDeque::new();
    let mut depths: HashMap<PathBuf, u32> = HashMap::new();
    let mut visited = HashSet::new();
    let mut unpacked_dirs = Vec::new();

    enqueue(&mut queue, &mut depths, root.to_path_buf(), 0);

    while let Some(dir) = queue.pop_front() {
        if !visited.insert(dir.clone()) {
            continue;
        }
        let depth = depths.get(&dir).copied().unwrap_or(0);

        for (path, file_type) in sorted_entries(&dir)? {
            if file_type.is_symlink() {
                debug!(?path, "not following symlink");
                continue;
            }

            if file_type.is_dir() {
                enqueue(&mut queue, &mut depths, path, depth);
                continue;
            }

            if !is_archive(&path) {
                continue;
            }

            if depth >= max_depth {
                warn!(
                    archive = ?path,
                    depth,
                    max_depth,
                    "archive nested too deeply, leaving it packed"
                );
                continue;
            }

            debug!(archive = ?path, depth, "found nested archive");
            let destination = unpack(&path, None, cleanup)?;
            unpacked_dirs.push(dir.clone());
            enqueue(&mut queue, &mut depths, destination, depth + 1);
        }
    }

    info!(
        ?root,
        unpacked = unpacked_dirs.len(),
        "recursive unpack finished"
    );

    Ok(unpacked_dirs)
}

/// Queue `dir` for walking, keeping the deepest nesting level it was reached at
fn enqueue(
    queue: &mut VecDeque<PathBuf>,
    depths: &mut HashMap<PathBuf, u32>,
    dir: PathBuf,
    depth: u32,
) {
    let recorded = depths.entry(dir.clone()).or_insert(depth);
    *recorded = (*recorded).max(depth);
    queue.push_back(dir);
}
