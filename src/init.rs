//! Project initialization for blocksmith
//!
//! Writes the skeleton of a new site: configuration, page and layout
//! templates, the stylesheet and script entry points, the `ready` helper
//! block scripts import, empty block and image directories, and the three
//! aggregator files.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::aggregate::{render, AggregatorKind, BlockPrefixes};
use crate::config::PathsConfig;

/// Error during project initialization
#[derive(Debug, Error)]
pub enum InitError {
    /// Target directory exists and is not empty
    #[error("Directory is not empty: {0}")]
    DirectoryNotEmpty(String),
    /// Failed to create directory
    #[error("Failed to create directory: {0}")]
    CreateDir(std::io::Error),
    /// Failed to write file
    #[error("Failed to write file: {0}")]
    WriteFile(std::io::Error),
}

/// Initialize a new project in `path`.
///
/// # Example
/// ```ignore
/// init_project(Path::new("landing"), "landing")?;
/// ```
pub fn init_project(path: &Path, name: &str) -> Result<(), InitError> {
    if path.exists() {
        let is_empty = path.read_dir().map(|mut d| d.next().is_none()).unwrap_or(false);
        if !is_empty {
            return Err(InitError::DirectoryNotEmpty(path.display().to_string()));
        }
    }

    let paths = PathsConfig::default();
    for dir in [&paths.blocks, &paths.pages, &paths.pug, &paths.scss, &paths.img] {
        create_dir(&path.join(dir))?;
    }
    create_dir(&path.join(&paths.js).join("utils"))?;

    write_file(&path.join(crate::config::loader::CONFIG_FILE), &generate_config(name))?;
    write_file(&path.join(".gitignore"), GITIGNORE)?;
    write_file(&path.join(&paths.pages).join("index.pug"), &generate_index(name))?;
    write_file(&path.join(&paths.pug).join("layout.pug"), LAYOUT_PUG)?;
    write_file(&path.join(&paths.scss).join("style.scss"), STYLE_SCSS)?;
    write_file(&path.join(&paths.js).join("utils").join("ready.js"), READY_JS)?;
    write_file(&path.join(&paths.blocks).join(".gitkeep"), "")?;
    write_file(&path.join(&paths.img).join(".gitkeep"), "")?;

    let prefixes = BlockPrefixes::from_paths(&paths);
    for kind in AggregatorKind::ALL {
        write_file(&path.join(kind.destination(&paths)), &render::<&str>(kind, &[], &prefixes))?;
    }

    Ok(())
}

fn create_dir(path: &Path) -> Result<(), InitError> {
    fs::create_dir_all(path).map_err(InitError::CreateDir)
}

fn write_file(path: &Path, content: &str) -> Result<(), InitError> {
    fs::write(path, content).map_err(InitError::WriteFile)
}

fn generate_config(name: &str) -> String {
    format!(
        r#"[project]
name = "{}"

[serve]
port = 8080

[deploy]
branch = "gh-pages"
"#,
        name
    )
}

const GITIGNORE: &str = r#"# Build output
build/
node_modules/

# OS files
.DS_Store
Thumbs.db
"#;

fn generate_index(name: &str) -> String {
    format!(
        r#"extends ../pug/layout

block content
  h1 {}
"#,
        name
    )
}

const LAYOUT_PUG: &str = r#"include mixins

doctype html
html(lang="en")
  head
    meta(charset="utf-8")
    meta(name="viewport" content="width=device-width, initial-scale=1")
    link(rel="stylesheet" href="css/style.css")
  body
    block content
    script(src="js/bundle.js")
"#;

const STYLE_SCSS: &str = r#"*,
*::before,
*::after {
  box-sizing: border-box;
}

@import 'blocks';
"#;

const READY_JS: &str = r#"export default function ready(fn) {
  if (document.readyState !== 'loading') {
    fn();
  } else {
    document.addEventListener('DOMContentLoaded', fn);
  }
}
"#;
