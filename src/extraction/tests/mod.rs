use crate::error::{Error, ExtractionError};
use crate::extraction::{
    default_extract_dir, detect_archive_type, is_archive, recursive_unpack, strip_archive_suffix,
    unpack, unpack_recursive,
};
use crate::types::ArchiveType;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build an in-memory ZIP archive from (name, content) pairs
fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ::zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Build an in-memory tarball of the given type from (name, content) pairs
fn tar_bytes(archive_type: ArchiveType, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = ::tar::Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = ::tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(::tar::EntryType::Regular);
        builder.append_data(&mut header, name, *content).unwrap();
    }
    let raw = builder.into_inner().unwrap();

    match archive_type {
        ArchiveType::Tar => raw,
        ArchiveType::TarGz => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&raw).unwrap();
            encoder.finish().unwrap()
        }
        ArchiveType::TarBz2 => {
            let mut encoder =
                bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(&raw).unwrap();
            encoder.finish().unwrap()
        }
        ArchiveType::TarXz => {
            let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
            encoder.write_all(&raw).unwrap();
            encoder.finish().unwrap()
        }
        ArchiveType::Zip => panic!("use zip_bytes for ZIP archives"),
    }
}

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Every file under `root` that still looks like an archive
fn remaining_archives(root: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| detect_archive_type(p).is_some())
        .collect()
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn test_is_archive_false_for_missing_path() {
    let temp = TempDir::new().unwrap();
    assert!(!is_archive(&temp.path().join("nope.zip")));
}

#[test]
fn test_is_archive_false_for_directory_with_archive_name() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("looks_like.zip");
    std::fs::create_dir(&dir).unwrap();
    assert!(!is_archive(&dir));
}

#[test]
fn test_is_archive_false_for_hidden_and_underscore_files() {
    let temp = TempDir::new().unwrap();
    for name in ["._data.zip", ".hidden.tar", "_meta.zip", "__MACOSX.tar.gz"] {
        let path = temp.path().join(name);
        write_file(&path, b"irrelevant");
        assert!(!is_archive(&path), "{name} should be treated as metadata");
    }
}

#[test]
fn test_is_archive_by_extension() {
    let temp = TempDir::new().unwrap();
    let cases = [
        ("x.zip", true),
        ("x.tar", true),
        ("x.tar.gz", true),
        ("x.TGZ", true),
        ("x.tar.bz2", true),
        ("x.tbz2", true),
        ("x.tar.xz", true),
        ("X.ZIP", true),
        ("x.txt", false),
        ("x.gz", false),
        ("x.rar", false),
        ("zip", false),
    ];
    for (name, expected) in cases {
        let path = temp.path().join(name);
        write_file(&path, b"not really an archive");
        assert_eq!(is_archive(&path), expected, "classification of {name}");
    }
}

#[test]
fn test_is_archive_ignores_content() {
    let temp = TempDir::new().unwrap();
    let real_zip_named_txt = temp.path().join("data.txt");
    write_file(&real_zip_named_txt, &zip_bytes(&[("a.txt", b"a")]));
    assert!(!is_archive(&real_zip_named_txt));
}

#[test]
fn test_detect_archive_type_prefers_longest_suffix() {
    assert_eq!(
        detect_archive_type(Path::new("a.tar.gz")),
        Some(ArchiveType::TarGz)
    );
    assert_eq!(
        detect_archive_type(Path::new("a.tar.bz2")),
        Some(ArchiveType::TarBz2)
    );
    assert_eq!(
        detect_archive_type(Path::new("a.TXZ")),
        Some(ArchiveType::TarXz)
    );
    assert_eq!(detect_archive_type(Path::new("a.tar")), Some(ArchiveType::Tar));
    assert_eq!(detect_archive_type(Path::new("a.zip")), Some(ArchiveType::Zip));
    assert_eq!(detect_archive_type(Path::new("a.json")), None);
    assert_eq!(detect_archive_type(Path::new(".zip")), None);
}

#[test]
fn test_strip_archive_suffix() {
    assert_eq!(
        strip_archive_suffix(Path::new("artifacts/datasets/yelp_json.zip")),
        Some(PathBuf::from("artifacts/datasets/yelp_json"))
    );
    assert_eq!(
        strip_archive_suffix(Path::new("b.tar.gz")),
        Some(PathBuf::from("b"))
    );
    assert_eq!(
        strip_archive_suffix(Path::new("dir/C.TGZ")),
        Some(PathBuf::from("dir/C"))
    );
    assert_eq!(
        strip_archive_suffix(Path::new("release.v2.tar")),
        Some(PathBuf::from("release.v2"))
    );
    assert_eq!(strip_archive_suffix(Path::new("notes.txt")), None);
}

#[test]
fn test_default_extract_dir_rejects_unsupported() {
    let err = default_extract_dir(Path::new("movie.rar")).unwrap_err();
    assert!(matches!(
        err,
        Error::Extraction(ExtractionError::UnsupportedFormat { .. })
    ));
}

// ---------------------------------------------------------------------------
// Single-archive unpacking
// ---------------------------------------------------------------------------

#[test]
fn test_unpack_zip_to_default_dir_and_cleanup() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("a.zip");
    write_file(
        &archive,
        &zip_bytes(&[("hello.txt", b"Hello, World"), ("nested/deep.txt", b"deep")]),
    );

    let dest = unpack(&archive, None, true).unwrap();

    assert_eq!(dest, temp.path().join("a"));
    assert_eq!(
        std::fs::read_to_string(dest.join("hello.txt")).unwrap(),
        "Hello, World"
    );
    assert_eq!(
        std::fs::read_to_string(dest.join("nested/deep.txt")).unwrap(),
        "deep"
    );
    assert!(!archive.exists(), "archive should be removed after extraction");
}

#[test]
fn test_unpack_without_cleanup_keeps_archive() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("keep.zip");
    write_file(&archive, &zip_bytes(&[("a.txt", b"a")]));

    let dest = unpack(&archive, None, false).unwrap();

    assert!(dest.join("a.txt").exists());
    assert!(archive.exists());
}

#[test]
fn test_unpack_to_explicit_directory() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("a.zip");
    let target = temp.path().join("somewhere/else");
    write_file(&archive, &zip_bytes(&[("a.txt", b"a")]));

    let dest = unpack(&archive, Some(&target), true).unwrap();

    assert_eq!(dest, target);
    assert!(target.join("a.txt").exists());
    assert!(!temp.path().join("a").exists());
}

#[test]
fn test_unpack_every_tar_flavor() {
    let temp = TempDir::new().unwrap();
    let flavors = [
        (ArchiveType::Tar, "plain.tar"),
        (ArchiveType::TarGz, "gz.tar.gz"),
        (ArchiveType::TarGz, "short.tgz"),
        (ArchiveType::TarBz2, "bz.tar.bz2"),
        (ArchiveType::TarXz, "xz.tar.xz"),
    ];

    for (archive_type, name) in flavors {
        let archive = temp.path().join(name);
        write_file(
            &archive,
            &tar_bytes(archive_type, &[("data/c.txt", b"payload")]),
        );

        let dest = unpack(&archive, None, true).unwrap();

        assert_eq!(
            std::fs::read_to_string(dest.join("data/c.txt")).unwrap(),
            "payload",
            "contents of {name}"
        );
        assert!(!archive.exists(), "{name} should be removed");
    }
}

#[test]
fn test_unpack_corrupt_zip_keeps_archive() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("broken.zip");
    write_file(&archive, b"this is definitely not a zip file");

    let err = unpack(&archive, None, true).unwrap_err();

    assert!(
        matches!(err, Error::Extraction(ExtractionError::Corrupt { .. })),
        "unexpected error: {err:?}"
    );
    assert!(archive.exists(), "archive must survive a failed extraction");
}

#[test]
fn test_unpack_corrupt_gzip_keeps_archive() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("broken.tar.gz");
    write_file(&archive, b"garbage that is not gzip at all");

    let err = unpack(&archive, None, true).unwrap_err();

    assert!(
        matches!(err, Error::Extraction(ExtractionError::Corrupt { .. })),
        "unexpected error: {err:?}"
    );
    assert!(archive.exists());
}

#[test]
fn test_unpack_unsupported_format() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("movie.rar");
    write_file(&archive, b"Rar!");

    let err = unpack(&archive, None, true).unwrap_err();

    assert!(matches!(
        err,
        Error::Extraction(ExtractionError::UnsupportedFormat { .. })
    ));
    assert!(archive.exists());
}

#[test]
fn test_unpack_missing_archive_is_filesystem_error() {
    let temp = TempDir::new().unwrap();
    let err = unpack(&temp.path().join("ghost.zip"), None, true).unwrap_err();
    assert!(matches!(err, Error::Filesystem { .. }), "{err:?}");
}

#[test]
fn test_unpack_zip_skips_entries_escaping_destination() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("inner/evil.zip");
    write_file(
        &archive,
        &zip_bytes(&[("../escaped.txt", b"nope"), ("safe.txt", b"ok")]),
    );

    let dest = unpack(&archive, None, true).unwrap();

    assert!(dest.join("safe.txt").exists());
    assert!(!temp.path().join("inner/escaped.txt").exists());
    assert!(!temp.path().join("escaped.txt").exists());
}

// ---------------------------------------------------------------------------
// Recursive unpacking
// ---------------------------------------------------------------------------

#[test]
fn test_recursive_unpack_missing_root_is_empty() {
    let temp = TempDir::new().unwrap();
    let result = recursive_unpack(&temp.path().join("does-not-exist"), true, 16).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_recursive_unpack_file_root_is_empty() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("a.zip");
    write_file(&file, &zip_bytes(&[("a.txt", b"a")]));

    let result = recursive_unpack(&file, true, 16).unwrap();

    assert!(result.is_empty());
    assert!(file.exists(), "a file root is not walked");
}

#[test]
fn test_recursive_unpack_zip_containing_tar() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    let inner_tar = tar_bytes(ArchiveType::Tar, &[("c.txt", b"leaf")]);
    write_file(&root.join("a.zip"), &zip_bytes(&[("b.tar", &inner_tar)]));

    let result = recursive_unpack(&root, true, 16).unwrap();

    assert_eq!(
        std::fs::read_to_string(root.join("a/b/c.txt")).unwrap(),
        "leaf"
    );
    assert_eq!(result, vec![root.clone(), root.join("a")]);
    assert!(remaining_archives(&root).is_empty());
}

#[test]
fn test_recursive_unpack_resolves_three_levels_in_new_directories() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    let innermost = zip_bytes(&[("deep/leaf.json", b"{}")]);
    let middle = tar_bytes(ArchiveType::TarGz, &[("parts/inner.zip", &innermost)]);
    let outer = zip_bytes(&[("bundle/middle.tar.gz", &middle)]);
    write_file(&root.join("outer.zip"), &outer);

    let result = recursive_unpack(&root, true, 16).unwrap();

    assert!(root.join("outer/bundle/middle/parts/inner/deep/leaf.json").exists());
    assert_eq!(result.len(), 3);
    assert!(remaining_archives(&root).is_empty());
}

#[test]
fn test_recursive_unpack_reports_directory_per_archive() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    write_file(&root.join("x.zip"), &zip_bytes(&[("x.txt", b"x")]));
    write_file(&root.join("y.zip"), &zip_bytes(&[("y.txt", b"y")]));

    let result = recursive_unpack(&root, true, 16).unwrap();

    assert_eq!(result, vec![root.clone(), root.clone()]);
    assert!(root.join("x/x.txt").exists());
    assert!(root.join("y/y.txt").exists());
}

#[test]
fn test_recursive_unpack_without_cleanup_unpacks_each_archive_once() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    let inner = zip_bytes(&[("c.txt", b"c")]);
    write_file(&root.join("a.zip"), &zip_bytes(&[("b.zip", &inner)]));

    let result = recursive_unpack(&root, false, 16).unwrap();

    assert_eq!(result, vec![root.clone(), root.join("a")]);
    assert!(root.join("a.zip").exists());
    assert!(root.join("a/b.zip").exists());
    assert!(root.join("a/b/c.txt").exists());
}

#[test]
fn test_recursive_unpack_skips_metadata_archives() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    write_file(&root.join("__MACOSX/._a.zip"), b"resource fork");
    write_file(&root.join("_index.zip"), b"metadata");

    let result = recursive_unpack(&root, true, 16).unwrap();

    assert!(result.is_empty());
    assert!(root.join("__MACOSX/._a.zip").exists());
    assert!(root.join("_index.zip").exists());
}

#[test]
fn test_recursive_unpack_respects_max_depth() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    let inner = zip_bytes(&[("c.txt", b"c")]);
    write_file(&root.join("a.zip"), &zip_bytes(&[("b.zip", &inner)]));

    let result = recursive_unpack(&root, true, 1).unwrap();

    assert_eq!(result, vec![root.clone()]);
    assert!(root.join("a/b.zip").exists(), "depth-1 archive stays packed");
}

#[test]
fn test_recursive_unpack_stops_on_corrupt_nested_archive() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    write_file(&root.join("bad.zip"), b"not a zip");

    let err = recursive_unpack(&root, true, 16).unwrap_err();

    assert!(matches!(
        err,
        Error::Extraction(ExtractionError::Corrupt { .. })
    ));
    assert!(root.join("bad.zip").exists());
}

#[test]
fn test_recursive_unpack_depth_survives_existing_destination_dir() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    std::fs::create_dir_all(root.join("a")).unwrap();
    let inner = zip_bytes(&[("c.txt", b"deep")]);
    write_file(&root.join("a.zip"), &zip_bytes(&[("b.zip", &inner)]));

    let dirs = recursive_unpack(&root, true, 1).unwrap();

    assert_eq!(dirs, vec![root.clone()]);
    assert!(root.join("a").join("b.zip").is_file());
    assert!(!root.join("a").join("b").exists());
    assert!(!root.join("a").join("b").join("c.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_recursive_unpack_does_not_follow_symlinked_archives() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    std::fs::create_dir_all(&root).unwrap();
    let outside = temp.path().join("outside.zip");
    write_file(&outside, &zip_bytes(&[("secret.txt", b"outside root")]));
    std::os::unix::fs::symlink(&outside, root.join("link.zip")).unwrap();

    let dirs = recursive_unpack(&root, true, 16).unwrap();

    assert!(dirs.is_empty());
    assert!(outside.is_file());
    assert!(root.join("link.zip").symlink_metadata().is_ok());
    assert!(!root.join("link").exists());
}

#[cfg(unix)]
#[test]
fn test_recursive_unpack_does_not_follow_symlinked_dirs() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    std::fs::create_dir_all(&root).unwrap();
    let outside = temp.path().join("outside");
    write_file(&outside.join("x.zip"), &zip_bytes(&[("x.txt", b"x")]));
    std::os::unix::fs::symlink(&outside, root.join("linked")).unwrap();

    let dirs = recursive_unpack(&root, true, 16).unwrap();

    assert!(dirs.is_empty());
    assert!(outside.join("x.zip").is_file());
    assert!(!outside.join("x").exists());
}

#[tokio::test]
async fn test_unpack_recursive_runs_full_pipeline() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("dataset.zip");
    let inner = tar_bytes(ArchiveType::TarXz, &[("photos/1.jpg", b"jpeg")]);
    write_file(
        &archive,
        &zip_bytes(&[("photos.tar.xz", &inner), ("README", b"readme")]),
    );

    let summary = unpack_recursive(&archive, true, 16).await.unwrap();

    assert_eq!(summary.destination, temp.path().join("dataset"));
    assert_eq!(summary.nested, vec![temp.path().join("dataset")]);
    assert!(temp.path().join("dataset/photos/photos/1.jpg").exists());
    assert!(temp.path().join("dataset/README").exists());
    assert!(!archive.exists());
}
