//! Build context containing configuration and resolved paths for a run.

use crate::aggregate::AggregatorKind;
use crate::config::loader::resolve_path;
use crate::config::BsmConfig;
use std::path::{Path, PathBuf};

/// Build context passed to every task.
///
/// Holds the loaded configuration and the project root all configured
/// paths are resolved against.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: BsmConfig,
    /// Project root directory (where bsm.toml is located)
    project_root: PathBuf,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(config: BsmConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, verbose: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &BsmConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        resolve_path(&self.project_root, path)
    }

    /// Source root.
    pub fn src_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.src)
    }

    /// Blocks root.
    pub fn blocks_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.blocks)
    }

    /// Page templates directory.
    pub fn pages_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.pages)
    }

    /// Shared pug directory.
    pub fn pug_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.pug)
    }

    /// Stylesheet directory.
    pub fn scss_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.scss)
    }

    /// Script directory.
    pub fn js_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.js)
    }

    /// Image source directory.
    pub fn img_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.img)
    }

    /// Build output directory.
    pub fn build_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.build)
    }

    /// Absolute path of a generated aggregator file.
    pub fn aggregator_path(&self, kind: AggregatorKind) -> PathBuf {
        self.resolve_path(&kind.destination(&self.config.paths))
    }

    /// Absolute paths of all generated aggregator files.
    pub fn aggregator_paths(&self) -> Vec<PathBuf> {
        AggregatorKind::ALL.iter().map(|k| self.aggregator_path(*k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    #[test]
    fn test_resolved_directories() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/site"));
        assert_eq!(ctx.src_dir(), PathBuf::from("/site/src"));
        assert_eq!(ctx.blocks_dir(), PathBuf::from("/site/src/blocks"));
        assert_eq!(ctx.pages_dir(), PathBuf::from("/site/src/pages"));
        assert_eq!(ctx.img_dir(), PathBuf::from("/site/src/img"));
        assert_eq!(ctx.build_dir(), PathBuf::from("/site/build"));
    }

    #[test]
    fn test_absolute_paths_kept() {
        let mut config = default_config();
        config.paths.build = PathBuf::from("/var/www/site");
        let ctx = BuildContext::new(config, PathBuf::from("/site"));
        assert_eq!(ctx.build_dir(), PathBuf::from("/var/www/site"));
    }

    #[test]
    fn test_aggregator_paths() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/site"));
        assert_eq!(
            ctx.aggregator_paths(),
            vec![
                PathBuf::from("/site/src/pug/mixins.pug"),
                PathBuf::from("/site/src/scss/blocks.scss"),
                PathBuf::from("/site/src/js/entry.js"),
            ]
        );
    }

    #[test]
    fn test_verbose_flag() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("."));
        assert!(!ctx.is_verbose());
        assert!(ctx.with_verbose(true).is_verbose());
    }
}
