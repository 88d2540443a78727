//! Block commands (block, blocks)

use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::blocks::list_blocks;
use crate::build::BuildContext;
use crate::scaffold::{block_extensions, create_block, Outcome, ScaffoldError};

/// Run the block command
pub fn run_block(ctx: BuildContext, name: Option<&str>, extensions: &[String]) -> ExitCode {
    let extensions = block_extensions(extensions);
    let report = match create_block(&ctx.blocks_dir(), name.unwrap_or_default(), &extensions) {
        Ok(report) => report,
        Err(e @ (ScaffoldError::MissingName | ScaffoldError::InvalidName(_))) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    for item in &report.items {
        match item.outcome {
            Outcome::Failed(_) => eprintln!("{}", item),
            _ => println!("{}", item),
        }
    }
    if ctx.is_verbose() {
        println!(
            "Block '{}': {} created, {} already existed, {} failed",
            report.name,
            report.created_count(),
            report.existing_count(),
            report.failed_count()
        );
    }

    if report.is_success() {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}

/// Run the blocks command
pub fn run_blocks(ctx: BuildContext, json: bool) -> ExitCode {
    let root = ctx.blocks_dir();
    let blocks = if root.is_dir() {
        match list_blocks(&root) {
            Ok(blocks) => blocks,
            Err(e) => {
                eprintln!("Error: cannot read {}: {}", root.display(), e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        Vec::new()
    };

    if json {
        match serde_json::to_string_pretty(&blocks) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else if blocks.is_empty() {
        println!("No blocks in {}", root.display());
    } else {
        let width = blocks.iter().map(|b| b.name.len()).max().unwrap_or(0);
        for block in &blocks {
            println!("{:<width$}  {}", block.name, block.extensions.join(" "), width = width);
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}
