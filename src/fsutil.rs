//! Small filesystem and list helpers shared by the scaffolder and the pipeline.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path};

/// Check whether a file or directory exists.
///
/// Any access failure (missing path, permission denied, broken symlink)
/// counts as "does not exist".
pub fn exists(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

/// Return the distinct values of `items`.
///
/// The first occurrence of each value wins; callers must not rely on the
/// order of the result.
pub fn unique<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for item in items {
        let item = item.into();
        if seen.insert(item.clone()) {
            result.push(item);
        }
    }
    result
}

/// Render a path with forward slashes, for use inside generated source files.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| match c {
            Component::RootDir => String::new(),
            other => other.as_os_str().to_string_lossy().into_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Recursively copy the contents of `src` into `dst`.
///
/// Returns the number of files copied.
pub fn copy_dir_contents(src: &Path, dst: &Path) -> io::Result<usize> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_dir_contents(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Remove every entry inside `dir`, leaving the directory itself in place.
///
/// A missing directory is not an error. Returns the number of top-level
/// entries removed.
pub fn clear_dir(dir: &Path) -> io::Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }
    Ok(removed)
}
