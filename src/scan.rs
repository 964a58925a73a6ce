//! Directory scanning.
//!
//! Finds the files a refresh should compile and the directories a
//! refresh should watch. Both walks are synchronous; they only ever run
//! on the cold-start path or inside a refresh.
use crate::error::Error;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// List the files under `root` matching the given glob patterns.
///
/// Results are sorted lexicographically and deduplicated, so a file
/// matched by more than one pattern is compiled once, and a flattened
/// key contested by two files resolves the same way on every platform.
pub fn templates(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();

    for pattern in patterns {
        let pattern = root.join(pattern);

        for path in glob::glob(&pattern.to_string_lossy())?.flatten() {
            if path.is_file() {
                files.push(path);
            }
        }
    }

    files.sort();
    files.dedup();

    Ok(files)
}

/// List every directory under `root`, the root itself included.
///
/// Directories that can't be read are skipped.
pub fn directories(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}
