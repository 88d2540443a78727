//! Block discovery under the blocks root.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

use crate::fsutil::exists;
use crate::scaffold::IMG_DIR;

/// Extensions reported by [`list_blocks`].
pub const BLOCK_ASSET_EXTENSIONS: [&str; 3] = ["pug", "scss", "js"];

/// A block directory and the assets it currently has
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    /// Block (directory) name
    pub name: String,
    /// Extensions `e` for which `<name>/<name>.e` exists, plus `img` for an image directory
    pub extensions: Vec<String>,
}

/// Names of the block directories directly under `blocks_root`.
///
/// Symlinks are not followed. Names are sorted so generated files do not
/// depend on the platform's directory listing order.
fn block_dirs(blocks_root: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(blocks_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => {
                tracing::warn!(name = ?raw, "skipping block directory with non UTF-8 name");
            }
        }
    }
    names.sort();
    Ok(names)
}

/// List blocks under `blocks_root` that own a `<name>.<ext>` file.
///
/// Only immediate subdirectories are considered; files and deeper
/// directories are ignored.
pub fn scan_blocks(blocks_root: &Path, ext: &str) -> io::Result<Vec<String>> {
    let names = block_dirs(blocks_root)?
        .into_iter()
        .filter(|name| exists(&blocks_root.join(name).join(format!("{}.{}", name, ext))))
        .collect();
    Ok(names)
}

/// Describe every block under `blocks_root` with the assets it has.
pub fn list_blocks(blocks_root: &Path) -> io::Result<Vec<BlockInfo>> {
    let blocks = block_dirs(blocks_root)?
        .into_iter()
        .map(|name| {
            let dir = blocks_root.join(&name);
            let mut extensions: Vec<String> = BLOCK_ASSET_EXTENSIONS
                .iter()
                .filter(|ext| exists(&dir.join(format!("{}.{}", name, ext))))
                .map(|ext| ext.to_string())
                .collect();
            if dir.join(IMG_DIR).is_dir() {
                extensions.push(IMG_DIR.to_string());
            }
            BlockInfo { name, extensions }
        })
        .collect();
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_scan_blocks_filters_by_extension() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/a.pug");
        touch(temp.path(), "b/b.scss");
        touch(temp.path(), "c/c.pug");

        let found: BTreeSet<String> = scan_blocks(temp.path(), "pug").unwrap().into_iter().collect();
        let expected: BTreeSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_scan_blocks_requires_matching_file_name() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "card/other.pug");
        touch(temp.path(), "card/nested/card.pug");

        assert!(scan_blocks(temp.path(), "pug").unwrap().is_empty());
    }

    #[test]
    fn test_scan_blocks_ignores_top_level_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "stray.pug");
        touch(temp.path(), "menu/menu.pug");

        assert_eq!(scan_blocks(temp.path(), "pug").unwrap(), vec!["menu"]);
    }

    #[test]
    fn test_scan_blocks_is_sorted() {
        let temp = TempDir::new().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            touch(temp.path(), &format!("{0}/{0}.scss", name));
        }
        assert_eq!(scan_blocks(temp.path(), "scss").unwrap(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_scan_blocks_missing_root() {
        let temp = TempDir::new().unwrap();
        assert!(scan_blocks(&temp.path().join("missing"), "pug").is_err());
    }

    #[test]
    fn test_list_blocks_reports_assets() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "card/card.pug");
        touch(temp.path(), "card/card.scss");
        touch(temp.path(), "card/card.js");
        fs::create_dir_all(temp.path().join("card/img")).unwrap();
        touch(temp.path(), "footer/footer.scss");

        let blocks = list_blocks(temp.path()).unwrap();
        assert_eq!(
            blocks,
            vec![
                BlockInfo {
                    name: "card".to_string(),
                    extensions: vec!["pug".into(), "scss".into(), "js".into(), "img".into()],
                },
                BlockInfo { name: "footer".to_string(), extensions: vec!["scss".into()] },
            ]
        );
    }
}
