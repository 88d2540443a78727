//! Init command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::init::init_project;

/// Run the init command
pub fn run_init(path: Option<&Path>, name: Option<&str>) -> ExitCode {
    let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let name = match name {
        Some(name) => name.to_string(),
        None => project_name(&path),
    };

    match init_project(&path, &name) {
        Ok(()) => {
            println!("Created project '{}' in {}", name, path.display());
            println!();
            println!("Next steps:");
            if path != Path::new(".") {
                println!("  cd {}", path.display());
            }
            println!("  bsm block header js img");
            println!("  bsm dev");
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn project_name(path: &Path) -> String {
    let absolute = path.canonicalize().ok().or_else(|| std::env::current_dir().ok().map(|d| d.join(path)));
    absolute
        .as_deref()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .unwrap_or("site")
        .to_string()
}
