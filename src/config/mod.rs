//! Configuration module for blocksmith
//!
//! Provides types and parsing for `bsm.toml` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{default_config, load_config, load_project, ConfigError};
pub use schema::*;
