//! Block scaffolding
//!
//! Creates a block directory under the blocks root with one starter file per
//! extension (or an `img/` directory). Existing files are never overwritten.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::fsutil::{exists, unique};

/// Extensions every new block receives.
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["scss", "pug"];

/// Pseudo-extension that creates an image directory instead of a file.
pub const IMG_DIR: &str = "img";

/// Error that refuses a scaffold before any item is attempted
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// No block name was given
    #[error("Operation cancelled: no block name given")]
    MissingName,
    /// Block name would escape the blocks root
    #[error("Operation cancelled: invalid block name '{0}'")]
    InvalidName(String),
    /// The block directory itself could not be created
    #[error("Operation cancelled: cannot create {}: {source}", .path.display())]
    CreateRoot {
        /// Block directory
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// What a scaffold item is on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A seeded source file
    File,
    /// A directory (`img/`)
    Directory,
}

/// Outcome of creating one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Item was created
    Created,
    /// Item was already present and left untouched
    AlreadyExists,
    /// Item could not be created
    Failed(String),
}

/// One file or directory the scaffolder attempted
#[derive(Debug, Clone)]
pub struct ScaffoldItem {
    /// Target path
    pub path: PathBuf,
    /// File or directory
    pub kind: ItemKind,
    /// What happened
    pub outcome: Outcome,
}

impl std::fmt::Display for ScaffoldItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let noun = match self.kind {
            ItemKind::File => "File",
            ItemKind::Directory => "Directory",
        };
        match &self.outcome {
            Outcome::Created => write!(f, "{} created: {}", noun, self.path.display()),
            Outcome::AlreadyExists => {
                write!(f, "{} already exists: {}", noun, self.path.display())
            }
            Outcome::Failed(reason) => {
                write!(f, "Failed to create {}: {} ({})", noun.to_lowercase(), self.path.display(), reason)
            }
        }
    }
}

/// Result of scaffolding a block
#[derive(Debug, Clone)]
pub struct BlockReport {
    /// Block name
    pub name: String,
    /// Block directory
    pub dir: PathBuf,
    /// Per-extension outcomes, in request order
    pub items: Vec<ScaffoldItem>,
}

impl BlockReport {
    /// Number of items newly created.
    pub fn created_count(&self) -> usize {
        self.items.iter().filter(|i| i.outcome == Outcome::Created).count()
    }

    /// Number of items skipped because they already existed.
    pub fn existing_count(&self) -> usize {
        self.items.iter().filter(|i| i.outcome == Outcome::AlreadyExists).count()
    }

    /// Number of items that failed.
    pub fn failed_count(&self) -> usize {
        self.items.iter().filter(|i| matches!(i.outcome, Outcome::Failed(_))).count()
    }

    /// True when no item failed.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Build the extension set for a new block: the defaults plus `extra`, deduplicated.
pub fn block_extensions<S: AsRef<str>>(extra: &[S]) -> Vec<String> {
    unique(
        DEFAULT_EXTENSIONS
            .iter()
            .copied()
            .chain(extra.iter().map(|e| e.as_ref()))
            .map(|e| e.trim_start_matches('.'))
            .filter(|e| !e.is_empty()),
    )
}

/// Starter content for a block file with the given extension.
pub fn seed_content(ext: &str) -> &'static str {
    match ext {
        "js" => "import { default as ready } from '../../js/utils/ready';",
        _ => "",
    }
}

fn validate_name(name: &str) -> Result<(), ScaffoldError> {
    if name.is_empty() {
        return Err(ScaffoldError::MissingName);
    }
    if name.trim().is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(ScaffoldError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Create block `name` under `blocks_root` with one item per extension.
///
/// `img` creates `<name>/img/`; any other extension creates
/// `<name>/<name>.<ext>` with [`seed_content`]. Items that already exist are
/// reported and left alone. Item failures are recorded in the report; only a
/// failure to create the block directory itself aborts the call.
///
/// # Example
/// ```ignore
/// let report = create_block(Path::new("src/blocks"), "card", &block_extensions(&["js"]))?;
/// for item in &report.items {
///     println!("{}", item);
/// }
/// ```
pub fn create_block<S: AsRef<str>>(
    blocks_root: &Path,
    name: &str,
    extensions: &[S],
) -> Result<BlockReport, ScaffoldError> {
    validate_name(name)?;

    let dir = blocks_root.join(name);
    fs::create_dir_all(&dir)
        .map_err(|source| ScaffoldError::CreateRoot { path: dir.clone(), source })?;

    let items = extensions
        .iter()
        .map(|ext| {
            let ext = ext.as_ref();
            if ext == IMG_DIR {
                create_dir_item(dir.join(IMG_DIR))
            } else {
                create_file_item(dir.join(format!("{}.{}", name, ext)), seed_content(ext))
            }
        })
        .collect();

    Ok(BlockReport { name: name.to_string(), dir, items })
}

fn create_dir_item(path: PathBuf) -> ScaffoldItem {
    let outcome = if exists(&path) {
        Outcome::AlreadyExists
    } else {
        match fs::create_dir_all(&path) {
            Ok(()) => Outcome::Created,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    };
    tracing::debug!(path = %path.display(), ?outcome, "scaffold directory");
    ScaffoldItem { path, kind: ItemKind::Directory, outcome }
}

fn create_file_item(path: PathBuf, content: &str) -> ScaffoldItem {
    let outcome = if exists(&path) {
        Outcome::AlreadyExists
    } else {
        // create_new closes the gap between the existence check and the write
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .and_then(|mut f| f.write_all(content.as_bytes()))
        {
            Ok(()) => Outcome::Created,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Outcome::AlreadyExists,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    };
    tracing::debug!(path = %path.display(), ?outcome, "scaffold file");
    ScaffoldItem { path, kind: ItemKind::File, outcome }
}
