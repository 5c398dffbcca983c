use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::error::{BuildError, Result};

/// Zip every wanted file under `source_dir` and return the archive bytes.
///
/// `want` is called with the `/`-relative path of every entry, directories
/// included; a rejected directory is skipped together with everything below
/// it. Entries are visited in file-name order and stamped with a fixed
/// timestamp, so the same tree always produces the same bytes.
///
/// This does blocking I/O. Call it from `spawn_blocking` inside async code.
pub fn archive_directory<F>(source_dir: &Path, want: F) -> Result<Vec<u8>>
where
    F: Fn(&Path) -> bool + Send + Sync + 'static,
{
    let root = source_dir.to_path_buf();
    let walker = ignore::WalkBuilder::new(source_dir)
        // Only the caller's predicate decides what is excluded: no .gitignore, no hidden-file rules.
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            match entry.path().strip_prefix(&root) {
                Ok(rel) => want(rel),
                Err(_) => false,
            }
        })
        .build();

    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = 0usize;

    for result in walker {
        let entry = result.map_err(|err| {
            let path = err_path(&err).unwrap_or_else(|| source_dir.to_path_buf());
            BuildError::io("failed to read source directory", path, into_io_error(err))
        })?;

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(name) = entry_name(source_dir, path) else {
            continue;
        };

        let mut file = std::fs::File::open(path)
            .map_err(|e| BuildError::io("failed to open source file", path, e))?;
        zip.start_file(name, options)?;
        std::io::copy(&mut file, &mut zip)
            .map_err(|e| BuildError::io("failed to add file to archive", path, e))?;
        entries += 1;
    }

    let cursor = zip.finish()?;
    debug!("Archived {entries} file(s) from {}", source_dir.display());
    Ok(cursor.into_inner())
}

/// Zip entry name for `path`: relative to `root`, `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn err_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            err_path(err)
        }
        _ => None,
    }
}

fn into_io_error(err: ignore::Error) -> std::io::Error {
    match err.into_io_error() {
        Some(io) => io,
        None => std::io::Error::other("directory walk failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("manifest.json"), "{}").unwrap();
        fs::create_dir_all(dir.path().join("lib/util")).unwrap();
        fs::write(dir.path().join("lib/background.js"), "// bg").unwrap();
        fs::write(dir.path().join("lib/util/helpers.js"), "// helpers").unwrap();
        fs::create_dir_all(dir.path().join("skipped")).unwrap();
        fs::write(dir.path().join("skipped/file.txt"), "x").unwrap();
        dir
    }

    #[test]
    fn test_archive_contains_wanted_files_with_relative_names() {
        let dir = fixture();
        let bytes = archive_directory(dir.path(), |_| true).unwrap();

        let mut names = entry_names(bytes);
        names.sort();
        assert_eq!(
            names,
            vec![
                "lib/background.js",
                "lib/util/helpers.js",
                "manifest.json",
                "skipped/file.txt",
            ]
        );
    }

    #[test]
    fn test_rejected_directory_prunes_subtree() {
        let dir = fixture();
        let bytes = archive_directory(dir.path(), |p| !p.starts_with("skipped")).unwrap();

        let names = entry_names(bytes);
        assert!(!names.iter().any(|n| n.starts_with("skipped")), "{names:?}");
        assert!(names.contains(&"manifest.json".to_string()));
    }

    #[test]
    fn test_entry_contents_are_preserved() {
        let dir = fixture();
        let bytes = archive_directory(dir.path(), |_| true).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut contents = String::new();
        archive
            .by_name("lib/util/helpers.js")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "// helpers");
    }

    #[test]
    fn test_same_tree_gives_same_bytes() {
        let dir = fixture();
        let first = archive_directory(dir.path(), |_| true).unwrap();
        let second = archive_directory(dir.path(), |_| true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_source_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = archive_directory(&missing, |_| true).unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }), "{err:?}");
    }
}
