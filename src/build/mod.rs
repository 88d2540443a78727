//! Task system for blocksmith
//!
//! Provides the named tasks a project is built with and the runner that
//! executes them.
//!
//! # Overview
//!
//! A full build runs in stages:
//! - **Clean**: empty the build directory
//! - **Aggregate**: regenerate `mixins.pug`, `blocks.scss` and `entry.js`
//! - **Compile**: pages, styles and scripts, concurrently
//! - **Images**: optimize images into the build directory
//!
//! # Example
//!
//! ```ignore
//! use blocksmith::build::{BuildContext, Task, TaskRunner};
//! use blocksmith::config::load_project;
//!
//! let (config, root) = load_project(None)?;
//! let runner = TaskRunner::new(BuildContext::new(config, root));
//!
//! let result = runner.run(Task::MakeScssBlocksFile);
//! println!("{}", result.status);
//! ```

pub mod compile;
pub mod context;
pub mod images;
pub mod progress;
pub mod result;
pub mod runner;
pub mod task;

pub use compile::{CompileError, CompileTarget, Compiler, ToolCompiler};
pub use context::*;
pub use result::*;
pub use runner::*;
pub use task::*;
