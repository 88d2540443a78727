//! Aggregator file generation
//!
//! An aggregator is a generated file that includes every block owning a
//! given asset type, so pages, styles and scripts never register blocks by
//! hand:
//!
//! - `mixins.pug` (`include ../blocks/<name>/<name>.pug`)
//! - `blocks.scss` (`@import 'src/blocks/<name>/<name>.scss';`)
//! - `entry.js` (`import '../blocks/<name>/<name>.js';`)
//!
//! [`render`] is pure. [`write_aggregator`] scans the blocks root and
//! rewrites the whole file synchronously, so a compile started afterwards
//! always reads a complete aggregator.

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::blocks::scan_blocks;
use crate::build::BuildContext;
use crate::config::PathsConfig;
use crate::fsutil::slash_path;

/// Warning placed on the first line of every generated file.
pub const DO_NOT_EDIT: &str =
    "Warning! This file is generated automatically. Any changes to it will be lost on the next compilation.";

/// The three generated files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AggregatorKind {
    /// `mixins.pug` in the pug directory
    PugMixins,
    /// `blocks.scss` in the scss directory
    ScssImports,
    /// `entry.js` in the js directory
    JsEntry,
}

impl AggregatorKind {
    /// All aggregator kinds.
    pub const ALL: [AggregatorKind; 3] =
        [AggregatorKind::PugMixins, AggregatorKind::ScssImports, AggregatorKind::JsEntry];

    /// Block file extension this aggregator collects.
    pub fn extension(self) -> &'static str {
        match self {
            AggregatorKind::PugMixins => "pug",
            AggregatorKind::ScssImports => "scss",
            AggregatorKind::JsEntry => "js",
        }
    }

    /// Aggregator collecting block files with extension `ext`.
    pub fn for_extension(ext: &str) -> Option<Self> {
        match ext {
            "pug" => Some(AggregatorKind::PugMixins),
            "scss" => Some(AggregatorKind::ScssImports),
            "js" => Some(AggregatorKind::JsEntry),
            _ => None,
        }
    }

    /// File name of the generated file.
    pub fn file_name(self) -> &'static str {
        match self {
            AggregatorKind::PugMixins => "mixins.pug",
            AggregatorKind::ScssImports => "blocks.scss",
            AggregatorKind::JsEntry => "entry.js",
        }
    }

    /// Destination of the generated file, relative to the project root.
    pub fn destination(self, paths: &PathsConfig) -> PathBuf {
        let dir = match self {
            AggregatorKind::PugMixins => &paths.pug,
            AggregatorKind::ScssImports => &paths.scss,
            AggregatorKind::JsEntry => &paths.js,
        };
        dir.join(self.file_name())
    }

    fn comment_prefix(self) -> &'static str {
        match self {
            AggregatorKind::PugMixins => "//- ",
            AggregatorKind::ScssImports | AggregatorKind::JsEntry => "// ",
        }
    }

    /// First line of the generated file, including its newline.
    pub fn banner(self) -> String {
        format!("{}{}\n", self.comment_prefix(), DO_NOT_EDIT)
    }
}

impl std::fmt::Display for AggregatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Block root prefixes used inside generated lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPrefixes {
    /// Blocks root as configured (used by the SCSS imports)
    pub blocks: String,
    /// Blocks root with the source root rewritten to `../` (used by pug and js)
    pub relative_blocks: String,
}

impl BlockPrefixes {
    /// Derive the prefixes from the configured paths.
    ///
    /// When the blocks root is not inside the source root, the configured
    /// blocks path is used for both.
    pub fn from_paths(paths: &PathsConfig) -> Self {
        let blocks = slash_path(&paths.blocks);
        let (blocks_dir, src_dir) = (without_cur_dir(&paths.blocks), without_cur_dir(&paths.src));
        let relative_blocks = match blocks_dir.strip_prefix(&src_dir) {
            Ok(rest) => format!("../{}", slash_path(rest)),
            Err(_) => blocks.clone(),
        };
        Self { blocks, relative_blocks }
    }
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components().filter(|c| !matches!(c, Component::CurDir)).collect()
}

/// Render one line for block `name`, including its newline.
fn render_line(kind: AggregatorKind, name: &str, prefixes: &BlockPrefixes) -> String {
    match kind {
        AggregatorKind::PugMixins => {
            format!("include {}/{}/{}.pug\n", prefixes.relative_blocks, name, name)
        }
        AggregatorKind::ScssImports => {
            format!("@import '{}/{}/{}.scss';\n", prefixes.blocks, name, name)
        }
        AggregatorKind::JsEntry => {
            format!("import '{}/{}/{}.js';\n", prefixes.relative_blocks, name, name)
        }
    }
}

/// Render an aggregator: the banner, then one line per block in the given order.
pub fn render<S: AsRef<str>>(kind: AggregatorKind, names: &[S], prefixes: &BlockPrefixes) -> String {
    names.iter().fold(kind.banner(), |mut acc, name| {
        acc.push_str(&render_line(kind, name.as_ref(), prefixes));
        acc
    })
}

/// Error while regenerating an aggregator
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The blocks root could not be listed
    #[error("cannot scan blocks in {}: {source}", .root.display())]
    Scan {
        /// Blocks root
        root: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// The aggregator file could not be written
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        /// Aggregator path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// A freshly written aggregator
#[derive(Debug, Clone)]
pub struct Aggregate {
    /// Which aggregator
    pub kind: AggregatorKind,
    /// Absolute path written
    pub path: PathBuf,
    /// Blocks included, in file order
    pub blocks: Vec<String>,
}

/// Scan the blocks root and rewrite the aggregator of `kind`.
///
/// The write completes before this function returns.
pub fn write_aggregator(kind: AggregatorKind, ctx: &BuildContext) -> Result<Aggregate, AggregateError> {
    let root = ctx.blocks_dir();
    let blocks = scan_blocks(&root, kind.extension())
        .map_err(|source| AggregateError::Scan { root: root.clone(), source })?;

    let prefixes = BlockPrefixes::from_paths(&ctx.config().paths);
    let content = render(kind, &blocks, &prefixes);
    let path = ctx.aggregator_path(kind);

    write_whole_file(&path, &content).map_err(|source| AggregateError::Write { path: path.clone(), source })?;
    tracing::debug!(file = %path.display(), blocks = blocks.len(), "aggregator written");

    Ok(Aggregate { kind, path, blocks })
}

fn write_whole_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}
