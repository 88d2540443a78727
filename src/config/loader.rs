//! Configuration loading and discovery for `bsm.toml`
//!
//! The config file is searched for from the working directory upwards; the
//! directory it lives in becomes the project root.

use super::schema::{BsmConfig, ProjectConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "bsm.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read bsm.toml: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for the schema
    #[error("invalid bsm.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// The file parsed but has invalid values
    #[error("bsm.toml has {} invalid value(s):{}", .0.len(), .0.iter().map(|e| format!("\n  - {}", e)).collect::<String>())]
    Validation(Vec<String>),
}

/// Values given on the command line that win over the config file
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// `--build-dir`
    pub build: Option<PathBuf>,
    /// `--port`
    pub port: Option<u16>,
}

/// Search for bsm.toml from the working directory upwards.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Search for bsm.toml in `start` and each of its ancestors.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(CONFIG_FILE)).find(|candidate| candidate.is_file())
}

fn locate(path: Option<&Path>) -> Option<PathBuf> {
    path.map(Path::to_path_buf).or_else(find_config)
}

/// Load the configuration alone, falling back to defaults when no file
/// exists. An explicit `path` must exist.
pub fn load_config(path: Option<&Path>) -> Result<BsmConfig, ConfigError> {
    locate(path).map_or_else(|| Ok(default_config()), |p| read_config(&p))
}

/// Load the configuration together with the project root it applies to.
///
/// The project root is the directory holding bsm.toml, or the current
/// directory when running without a config file.
pub fn load_project(path: Option<&Path>) -> Result<(BsmConfig, PathBuf), ConfigError> {
    let Some(config_path) = locate(path) else {
        tracing::debug!("no {} found, using defaults", CONFIG_FILE);
        return Ok((default_config(), env::current_dir()?));
    };

    let config = read_config(&config_path)?;
    let root = match project_root(&config_path) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tracing::debug!(config = %config_path.display(), root = %root.display(), "loaded project config");
    Ok((config, root))
}

fn read_config(path: &Path) -> Result<BsmConfig, ConfigError> {
    let config: BsmConfig = toml::from_str(&fs::read_to_string(path)?)?;
    match config.validate() {
        errors if errors.is_empty() => Ok(config),
        errors => Err(ConfigError::Validation(errors.iter().map(ToString::to_string).collect())),
    }
}

/// Configuration used without a bsm.toml, named after the working directory.
pub fn default_config() -> BsmConfig {
    let name = env::current_dir()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "site".to_string());

    BsmConfig {
        project: ProjectConfig { name },
        paths: Default::default(),
        watch: Default::default(),
        serve: Default::default(),
        tools: Default::default(),
        css: Default::default(),
        images: Default::default(),
        deploy: Default::default(),
    }
}

/// Apply command-line overrides on top of a loaded configuration.
pub fn merge_cli_overrides(config: &mut BsmConfig, overrides: &CliOverrides) {
    if let Some(build) = &overrides.build {
        config.paths.build.clone_from(build);
    }
    if let Some(port) = overrides.port {
        config.serve.port = port;
    }
}

/// Directory a config file applies to.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// `path` itself when absolute, otherwise `path` below `project_root`.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    project_root.join(path)
}
