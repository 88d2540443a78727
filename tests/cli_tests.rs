//! CLI integration tests for the `bsm` binary.
//!
//! Covers block scaffolding, block listing, project init, single tasks and
//! the exit codes for invalid arguments.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Get the path to the bsm binary.
fn bsm_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bsm"))
}

/// Run bsm in `dir` with logging silenced.
fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(bsm_binary())
        .args(args)
        .current_dir(dir)
        .env("BSM_LOG", "off")
        .output()
        .expect("Failed to execute bsm")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// A project created by `bsm init`.
fn initialized() -> TempDir {
    let temp = TempDir::new().unwrap();
    let output = run_in(temp.path(), &["init", "--name", "landing"]);
    assert!(output.status.success(), "init failed: {}", stderr(&output));
    temp
}

#[test]
fn test_init_creates_skeleton() {
    let temp = initialized();
    for file in ["bsm.toml", "src/pages/index.pug", "src/scss/style.scss", "src/scss/blocks.scss"] {
        assert!(temp.path().join(file).is_file(), "missing {}", file);
    }
    let config = fs::read_to_string(temp.path().join("bsm.toml")).unwrap();
    assert!(config.contains("name = \"landing\""));
}

#[test]
fn test_init_refuses_non_empty_directory() {
    let temp = initialized();
    let output = run_in(temp.path(), &["init"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not empty"));
}

#[test]
fn test_block_twice_reports_existing_items() {
    let temp = initialized();

    let first = run_in(temp.path(), &["block", "foo", "scss", "pug", "img"]);
    assert!(first.status.success());
    assert_eq!(stdout(&first).matches("created").count(), 3);

    let scss = temp.path().join("src/blocks/foo/foo.scss");
    fs::write(&scss, ".foo { color: red; }").unwrap();

    let second = run_in(temp.path(), &["new", "foo", "scss", "pug", "img"]);
    assert!(second.status.success());
    let out = stdout(&second);
    assert_eq!(out.matches("already exists").count(), 3);
    assert!(!out.contains("created"));
    assert_eq!(fs::read_to_string(&scss).unwrap(), ".foo { color: red; }");
    assert!(temp.path().join("src/blocks/foo/img").is_dir());
}

#[test]
fn test_block_js_is_seeded() {
    let temp = initialized();
    let output = run_in(temp.path(), &["block", "menu", "js"]);
    assert!(output.status.success());
    let js = fs::read_to_string(temp.path().join("src/blocks/menu/menu.js")).unwrap();
    assert_eq!(js, "import { default as ready } from '../../js/utils/ready';");
}

#[test]
fn test_block_without_name_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let output = run_in(temp.path(), &["block"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Operation cancelled"));
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_block_rejects_path_names() {
    let temp = initialized();
    let output = run_in(temp.path(), &["block", "../escape"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!temp.path().join("src/escape").exists());
}

#[test]
fn test_blocks_json_lists_assets() {
    let temp = initialized();
    assert!(run_in(temp.path(), &["block", "card", "js", "img"]).status.success());
    assert!(run_in(temp.path(), &["block", "aside"]).status.success());

    let output = run_in(temp.path(), &["blocks", "--json"]);
    assert!(output.status.success());
    let blocks: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(blocks[0]["name"], "aside");
    assert_eq!(blocks[1]["name"], "card");
    let card: Vec<&str> =
        blocks[1]["extensions"].as_array().unwrap().iter().filter_map(|e| e.as_str()).collect();
    for ext in ["pug", "scss", "js", "img"] {
        assert!(card.contains(&ext), "card is missing {}", ext);
    }
}

#[test]
fn test_task_regenerates_scss_imports() {
    let temp = initialized();
    assert!(run_in(temp.path(), &["block", "hero"]).status.success());

    let output = run_in(temp.path(), &["task", "makeScssBlocksFile"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let scss = fs::read_to_string(temp.path().join("src/scss/blocks.scss")).unwrap();
    let lines: Vec<&str> = scss.lines().collect();
    assert!(lines[0].starts_with("// Warning! This file is generated automatically."));
    assert_eq!(lines[1], "@import 'src/blocks/hero/hero.scss';");
    assert!(stderr(&output).contains("Finished 'makeScssBlocksFile'"));
}

#[test]
fn test_task_json_progress() {
    let temp = initialized();
    fs::create_dir_all(temp.path().join("build/css")).unwrap();
    fs::write(temp.path().join("build/css/old.css"), "").unwrap();

    let output = run_in(temp.path(), &["task", "clearBuildDir", "--json"]);
    assert!(output.status.success());
    assert!(!temp.path().join("build/css").exists());

    let events: Vec<serde_json::Value> = stderr(&output)
        .lines()
        .filter(|l| l.starts_with('{'))
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events[0]["event"], "task_started");
    assert_eq!(events.last().unwrap()["event"], "task_completed");
    assert_eq!(events.last().unwrap()["status"], "success");
}

#[test]
fn test_reload_task_without_server_is_skipped() {
    let temp = initialized();
    let output = run_in(temp.path(), &["task", "reload"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("no preview server running"));
}

#[test]
fn test_unknown_task_is_invalid() {
    let temp = initialized();
    let output = run_in(temp.path(), &["task", "compileLess"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_config_is_invalid() {
    let temp = TempDir::new().unwrap();
    let output = run_in(temp.path(), &["--config", "nope.toml", "blocks"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Error loading config"));
}
