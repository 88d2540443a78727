//! bsm - block scaffolding and build pipeline for static sites

use std::process::ExitCode;

use blocksmith::cli;

fn main() -> ExitCode {
    cli::run()
}
