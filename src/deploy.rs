//! Publishing the build directory to a git branch.
//!
//! A throwaway repository is staged in a temporary directory, the build
//! output copied into it, committed and force-pushed to the configured
//! branch of the project's remote.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::build::BuildContext;
use crate::config::DeployConfig;
use crate::fsutil::copy_dir_contents;

/// Error while publishing
#[derive(Debug, Error)]
pub enum DeployError {
    /// Nothing to publish
    #[error("build directory {} is missing or empty, run a build first", .0.display())]
    EmptyBuild(PathBuf),
    /// The remote URL could not be determined
    #[error("cannot resolve the URL of remote '{remote}': {message}")]
    Remote {
        /// Remote name
        remote: String,
        /// git output
        message: String,
    },
    /// A git command failed
    #[error("git {command} failed: {message}")]
    Git {
        /// Subcommand
        command: String,
        /// git output
        message: String,
    },
    /// Staging the files failed
    #[error("cannot stage build output: {0}")]
    Io(#[from] std::io::Error),
}

/// A completed publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Directory that was published
    pub build_dir: PathBuf,
    /// Repository URL pushed to
    pub repo: String,
    /// Branch pushed to
    pub branch: String,
    /// Number of files published
    pub files: usize,
}

fn git(cwd: &Path, args: &[&str], config: &DeployConfig) -> Result<String, DeployError> {
    let mut command = Command::new("git");
    command.args(args).current_dir(cwd);
    if let Some(name) = &config.user_name {
        command.env("GIT_AUTHOR_NAME", name).env("GIT_COMMITTER_NAME", name);
    }
    if let Some(email) = &config.user_email {
        command.env("GIT_AUTHOR_EMAIL", email).env("GIT_COMMITTER_EMAIL", email);
    }

    let output = command.output().map_err(|e| DeployError::Git {
        command: args.first().copied().unwrap_or_default().to_string(),
        message: e.to_string(),
    })?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(DeployError::Git {
            command: args.first().copied().unwrap_or_default().to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Repository URL to push to: the explicit `repo`, or the URL of `remote`.
pub fn resolve_repo(project_root: &Path, config: &DeployConfig) -> Result<String, DeployError> {
    if let Some(repo) = &config.repo {
        return Ok(repo.clone());
    }
    git(project_root, &["remote", "get-url", &config.remote], config).map_err(|e| DeployError::Remote {
        remote: config.remote.clone(),
        message: e.to_string(),
    })
}

fn is_empty_dir(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// Publish the build directory of `ctx`.
pub fn publish(ctx: &BuildContext) -> Result<Published, DeployError> {
    let config = &ctx.config().deploy;
    let build_dir = ctx.build_dir();
    if is_empty_dir(&build_dir) {
        return Err(DeployError::EmptyBuild(build_dir));
    }

    let repo = resolve_repo(ctx.project_root(), config)?;
    let stage = tempfile::tempdir()?;
    let dir = stage.path();

    git(dir, &["init", "--quiet"], config)?;
    git(dir, &["checkout", "--quiet", "-b", &config.branch], config)?;
    let files = copy_dir_contents(&build_dir, dir)?;
    git(dir, &["add", "-A"], config)?;
    git(dir, &["commit", "--quiet", "-m", &config.message], config)?;
    git(dir, &["push", "--force", "--quiet", &repo, &format!("HEAD:{}", config.branch)], config)?;

    tracing::info!(repo = %repo, branch = %config.branch, files, "published");
    Ok(Published { build_dir, repo, branch: config.branch.clone(), files })
}
