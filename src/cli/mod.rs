//! Command-line interface implementation

mod block;
mod init;
mod task;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::build::progress::{ConsoleProgress, JsonProgress, ProgressReporter};
use crate::build::{BuildContext, Task};
use crate::config::loader::{load_project, merge_cli_overrides, CliOverrides};

/// Exit code: Success
pub(crate) const EXIT_SUCCESS: u8 = 0;
/// Exit code: Error (task failure, I/O error)
pub(crate) const EXIT_ERROR: u8 = 1;
/// Exit code: Invalid arguments
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Environment variable holding the tracing filter
const LOG_ENV: &str = "BSM_LOG";

/// Blocksmith - block scaffolding and build pipeline for static sites
#[derive(Parser)]
#[command(name = "bsm")]
#[command(about = "Scaffold site blocks and run the pug/scss/js build pipeline", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: bsm.toml found by searching upward)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Report progress as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Override the build output directory
    #[arg(long, global = true, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Override the preview server port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a block with scss and pug files plus any extra extensions
    #[command(visible_alias = "new")]
    Block {
        /// Block name (directory under the blocks root)
        name: Option<String>,

        /// Extra extensions; `img` creates an image directory
        extensions: Vec<String>,
    },

    /// List blocks and the assets each one has
    Blocks,

    /// Run one named task
    Task {
        /// Task name
        #[arg(value_enum)]
        task: Task,
    },

    /// Build, serve the build directory and rebuild on change
    Dev,

    /// Build once without serving
    Build,

    /// Create a new project skeleton
    Init {
        /// Project directory (default: current directory)
        path: Option<PathBuf>,

        /// Project name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Init { path, name } => init::run_init(path.as_deref(), name.as_deref()),
        Commands::Block { name, extensions } => {
            with_context(&cli, |ctx| block::run_block(ctx, name.as_deref(), extensions))
        }
        Commands::Blocks => with_context(&cli, |ctx| block::run_blocks(ctx, cli.json)),
        Commands::Task { task } => {
            let task = *task;
            with_context(&cli, |ctx| task::run_task(ctx, task, reporter(&cli)))
        }
        Commands::Dev => with_context(&cli, |ctx| task::run_task(ctx, Task::Default, reporter(&cli))),
        Commands::Build => with_context(&cli, |ctx| task::run_build(ctx, reporter(&cli))),
    }
}

/// Install the tracing subscriber. `BSM_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn reporter(cli: &Cli) -> Arc<dyn ProgressReporter> {
    if cli.json {
        Arc::new(JsonProgress::new())
    } else {
        Arc::new(ConsoleProgress::new().with_verbose(cli.verbose))
    }
}

/// Load the project configuration, apply CLI overrides and hand the
/// resulting context to `f`.
fn with_context<F>(cli: &Cli, f: F) -> ExitCode
where
    F: FnOnce(BuildContext) -> ExitCode,
{
    match load_context(cli.config.as_deref(), cli) {
        Ok(ctx) => f(ctx),
        Err(message) => {
            eprintln!("Error loading config: {}", message);
            ExitCode::from(EXIT_INVALID_ARGS)
        }
    }
}

fn load_context(config_path: Option<&Path>, cli: &Cli) -> Result<BuildContext, String> {
    let (mut config, root) = load_project(config_path).map_err(|e| e.to_string())?;
    if cli.verbose {
        match config_path {
            Some(path) => eprintln!("Using config: {}", path.display()),
            None => eprintln!("Project root: {}", root.display()),
        }
    }

    let overrides = CliOverrides { build: cli.build_dir.clone(), port: cli.port };
    merge_cli_overrides(&mut config, &overrides);

    // Watcher events carry absolute paths; keep the context comparable.
    let root = root.canonicalize().unwrap_or(root);
    Ok(BuildContext::new(config, root).with_verbose(cli.verbose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_block_with_extensions() {
        let cli = Cli::parse_from(["bsm", "block", "card", "js", "img"]);
        match cli.command {
            Commands::Block { name, extensions } => {
                assert_eq!(name.as_deref(), Some("card"));
                assert_eq!(extensions, vec!["js", "img"]);
            }
            _ => panic!("expected block"),
        }
    }

    #[test]
    fn test_parse_new_alias_without_name() {
        let cli = Cli::parse_from(["bsm", "new"]);
        assert!(matches!(cli.command, Commands::Block { name: None, .. }));
    }

    #[test]
    fn test_parse_task_names() {
        let cli = Cli::parse_from(["bsm", "task", "makeScssBlocksFile"]);
        assert!(matches!(cli.command, Commands::Task { task: Task::MakeScssBlocksFile }));

        let cli = Cli::parse_from(["bsm", "task", "clearBuildDir", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Task { task: Task::ClearBuildDir }));
    }

    #[test]
    fn test_parse_rejects_unknown_task() {
        assert!(Cli::try_parse_from(["bsm", "task", "compileLess"]).is_err());
    }

    #[test]
    fn test_parse_global_overrides() {
        let cli = Cli::parse_from(["bsm", "dev", "--port", "3000", "--build-dir", "public", "-v"]);
        assert_eq!(cli.port, Some(3000));
        assert_eq!(cli.build_dir, Some(PathBuf::from("public")));
        assert!(cli.verbose);
    }
}
