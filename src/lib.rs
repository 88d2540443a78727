//! Blocksmith - block scaffolding and build pipeline for static sites
//!
//! This library provides functionality to:
//! - Scaffold block directories (`<blocks>/<name>/<name>.<ext>`)
//! - Regenerate the pug mixin, scss import and js entry aggregators
//! - Run the compile, image and deploy tasks in ordered stages
//! - Watch the sources and serve the build directory with live reload

pub mod aggregate;
pub mod blocks;
pub mod build;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod fsutil;
pub mod init;
pub mod scaffold;
pub mod serve;
pub mod watch;
