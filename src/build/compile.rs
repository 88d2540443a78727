//! Compile tasks for pages, styles and scripts.
//!
//! The compilers themselves are external programs (a Pug compiler, a SCSS
//! compiler and a JS bundler) configured under `[tools]` in `bsm.toml`.
//! They are reached through the [`Compiler`] trait so the task runner and
//! watch loop can be driven by a fake in tests. Autoprefixing of the
//! compiled stylesheet runs in-process with lightningcss.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use super::BuildContext;
use crate::config::{parse_browser_target, CssConfig, ToolCommand};

/// Something that can be compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompileTarget {
    /// Page templates to HTML
    Pug,
    /// Stylesheet to CSS
    Scss,
    /// Script entry to a bundle
    Js,
}

impl CompileTarget {
    /// All compile targets.
    pub const ALL: [CompileTarget; 3] = [CompileTarget::Pug, CompileTarget::Scss, CompileTarget::Js];

    /// Input handed to the external tool.
    pub fn input(self, ctx: &BuildContext) -> PathBuf {
        match self {
            CompileTarget::Pug => ctx.pages_dir(),
            CompileTarget::Scss => ctx.scss_dir().join("style.scss"),
            CompileTarget::Js => ctx.aggregator_path(crate::aggregate::AggregatorKind::JsEntry),
        }
    }

    /// Output written by the external tool.
    pub fn output(self, ctx: &BuildContext) -> PathBuf {
        let build = ctx.build_dir();
        match self {
            CompileTarget::Pug => build,
            CompileTarget::Scss => build.join("css").join("style.css"),
            CompileTarget::Js => build.join("js").join("bundle.js"),
        }
    }

    fn tool(self, ctx: &BuildContext) -> &ToolCommand {
        let tools = &ctx.config().tools;
        match self {
            CompileTarget::Pug => &tools.pug,
            CompileTarget::Scss => &tools.scss,
            CompileTarget::Js => &tools.js,
        }
    }
}

impl std::fmt::Display for CompileTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileTarget::Pug => write!(f, "pug"),
            CompileTarget::Scss => write!(f, "scss"),
            CompileTarget::Js => write!(f, "js"),
        }
    }
}

/// Failure running an external tool
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started
    #[error("cannot run '{program}': {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// The program ran and reported failure
    #[error("'{program}' exited with {status}\n{stderr}")]
    Failed {
        /// Program name
        program: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },
}

/// Failure compiling a target
#[derive(Debug, Error)]
pub enum CompileError {
    /// The compile input does not exist
    #[error("missing input {}", .0.display())]
    MissingInput(PathBuf),
    /// External tool failure
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// Reading or writing an artifact failed
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// lightningcss rejected the stylesheet or a target
    #[error("autoprefix failed: {0}")]
    Css(String),
}

/// Compiles one target and returns the artifacts it wrote.
pub trait Compiler: Send + Sync {
    /// Compile `target` within `ctx`.
    fn compile(&self, target: CompileTarget, ctx: &BuildContext) -> Result<Vec<PathBuf>, CompileError>;
}

/// Default compiler: spawns the tools configured in `bsm.toml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToolCompiler;

impl ToolCompiler {
    /// Create a tool compiler.
    pub fn new() -> Self {
        Self
    }
}

impl Compiler for ToolCompiler {
    fn compile(&self, target: CompileTarget, ctx: &BuildContext) -> Result<Vec<PathBuf>, CompileError> {
        let input = target.input(ctx);
        let output = target.output(ctx);
        if !input.exists() {
            return Err(CompileError::MissingInput(input));
        }

        let out_dir = match target {
            CompileTarget::Pug => output.as_path(),
            CompileTarget::Scss | CompileTarget::Js => output.parent().unwrap_or(&output),
        };
        fs::create_dir_all(out_dir)
            .map_err(|source| CompileError::Io { path: out_dir.to_path_buf(), source })?;

        run_tool(target.tool(ctx), &input, &output, ctx.project_root())?;

        if target == CompileTarget::Scss && ctx.config().css.autoprefix {
            autoprefix_file(&output, &ctx.config().css)?;
        }

        Ok(vec![output])
    }
}

/// Substitute `{input}` and `{output}` in the tool arguments.
pub fn expand_args(tool: &ToolCommand, input: &Path, output: &Path) -> Vec<String> {
    let input = input.display().to_string();
    let output = output.display().to_string();
    tool.args
        .iter()
        .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
        .collect()
}

/// Run `tool` in `cwd` and fail with its stderr when it exits unsuccessfully.
pub fn run_tool(tool: &ToolCommand, input: &Path, output: &Path, cwd: &Path) -> Result<(), ToolError> {
    let args = expand_args(tool, input, output);
    tracing::debug!(program = %tool.program, ?args, "running tool");

    let result = Command::new(&tool.program)
        .args(&args)
        .current_dir(cwd)
        .output()
        .map_err(|source| ToolError::Spawn { program: tool.program.clone(), source })?;

    if result.status.success() {
        Ok(())
    } else {
        Err(ToolError::Failed {
            program: tool.program.clone(),
            status: result.status.to_string(),
            stderr: String::from_utf8_lossy(&result.stderr).trim_end().to_string(),
        })
    }
}

/// Browser targets for the configured `css.targets`.
pub fn browser_targets(css: &CssConfig) -> Result<Browsers, String> {
    let mut browsers = Browsers::default();
    for target in &css.targets {
        let (name, major) = parse_browser_target(target)?;
        let version = Some(major << 16);
        match name.as_str() {
            "android" => browsers.android = version,
            "chrome" => browsers.chrome = version,
            "edge" => browsers.edge = version,
            "firefox" => browsers.firefox = version,
            "ie" => browsers.ie = version,
            "ios_saf" => browsers.ios_saf = version,
            "opera" => browsers.opera = version,
            "safari" => browsers.safari = version,
            "samsung" => browsers.samsung = version,
            other => return Err(format!("unknown browser '{}'", other)),
        }
    }
    Ok(browsers)
}

fn targets_for(browsers: Browsers) -> Targets {
    Targets::from(browsers)
}

/// Add vendor prefixes required by the configured browsers.
///
/// Rules lightningcss cannot parse (old `*prop` hacks and the like) are
/// dropped with a warning instead of failing the stylesheet.
pub fn autoprefix(css: &str, config: &CssConfig) -> Result<String, CompileError> {
    let browsers = browser_targets(config).map_err(CompileError::Css)?;

    let warnings = Arc::new(RwLock::new(Vec::new()));
    let options = ParserOptions {
        error_recovery: true,
        warnings: Some(Arc::clone(&warnings)),
        ..ParserOptions::default()
    };
    let mut sheet = StyleSheet::parse(css, options).map_err(|e| CompileError::Css(e.to_string()))?;
    if let Ok(warnings) = warnings.read() {
        for warning in warnings.iter() {
            tracing::warn!("skipped unparseable css: {}", warning);
        }
    }
    sheet
        .minify(MinifyOptions { targets: targets_for(browsers), ..MinifyOptions::default() })
        .map_err(|e| CompileError::Css(e.to_string()))?;
    let printed = sheet
        .to_css(PrinterOptions { targets: targets_for(browsers), ..PrinterOptions::default() })
        .map_err(|e| CompileError::Css(e.to_string()))?;

    Ok(printed.code)
}

fn autoprefix_file(path: &Path, config: &CssConfig) -> Result<(), CompileError> {
    let css = fs::read_to_string(path)
        .map_err(|source| CompileError::Io { path: path.to_path_buf(), source })?;
    let prefixed = autoprefix(&css, config)?;
    fs::write(path, prefixed).map_err(|source| CompileError::Io { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use tempfile::TempDir;

    fn ctx() -> BuildContext {
        BuildContext::new(default_config(), PathBuf::from("/site"))
    }

    #[test]
    fn test_inputs_and_outputs() {
        let ctx = ctx();
        assert_eq!(CompileTarget::Pug.input(&ctx), PathBuf::from("/site/src/pages"));
        assert_eq!(CompileTarget::Pug.output(&ctx), PathBuf::from("/site/build"));
        assert_eq!(CompileTarget::Scss.input(&ctx), PathBuf::from("/site/src/scss/style.scss"));
        assert_eq!(CompileTarget::Scss.output(&ctx), PathBuf::from("/site/build/css/style.css"));
        assert_eq!(CompileTarget::Js.input(&ctx), PathBuf::from("/site/src/js/entry.js"));
        assert_eq!(CompileTarget::Js.output(&ctx), PathBuf::from("/site/build/js/bundle.js"));
    }

    #[test]
    fn test_expand_args() {
        let tool = ToolCommand::new("sass", &["--no-source-map", "{input}", "{output}"]);
        let args = expand_args(&tool, Path::new("a.scss"), Path::new("b.css"));
        assert_eq!(args, vec!["--no-source-map", "a.scss", "b.css"]);

        let tool = ToolCommand::new("esbuild", &["{input}", "--outfile={output}"]);
        let args = expand_args(&tool, Path::new("entry.js"), Path::new("bundle.js"));
        assert_eq!(args, vec!["entry.js", "--outfile=bundle.js"]);
    }

    #[test]
    fn test_run_tool_missing_program() {
        let temp = TempDir::new().unwrap();
        let tool = ToolCommand::new("bsm-definitely-not-a-program", &[]);
        let err = run_tool(&tool, Path::new("in"), Path::new("out"), temp.path()).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_tool_captures_stderr() {
        let temp = TempDir::new().unwrap();
        let tool = ToolCommand::new("sh", &["-c", "echo broken {input} >&2; exit 3"]);
        let err = run_tool(&tool, Path::new("style.scss"), Path::new("out"), temp.path()).unwrap_err();
        match err {
            ToolError::Failed { stderr, .. } => assert_eq!(stderr, "broken style.scss"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_compiler_writes_output() {
        let temp = TempDir::new().unwrap();
        let mut config = default_config();
        config.tools.js = ToolCommand::new("cp", &["{input}", "{output}"]);
        let ctx = BuildContext::new(config, temp.path().to_path_buf());

        fs::create_dir_all(ctx.js_dir()).unwrap();
        fs::write(ctx.js_dir().join("entry.js"), "console.log(1);").unwrap();

        let outputs = ToolCompiler::new().compile(CompileTarget::Js, &ctx).unwrap();
        assert_eq!(outputs, vec![temp.path().join("build/js/bundle.js")]);
        assert_eq!(fs::read_to_string(&outputs[0]).unwrap(), "console.log(1);");
    }

    #[test]
    fn test_tool_compiler_missing_input() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let err = ToolCompiler::new().compile(CompileTarget::Scss, &ctx).unwrap_err();
        assert!(matches!(err, CompileError::MissingInput(_)));
    }

    #[test]
    fn test_browser_targets() {
        let css = CssConfig { autoprefix: true, targets: vec!["chrome 61".into(), "safari 11".into()] };
        let browsers = browser_targets(&css).unwrap();
        assert_eq!(browsers.chrome, Some(61 << 16));
        assert_eq!(browsers.safari, Some(11 << 16));
        assert_eq!(browsers.firefox, None);

        let bad = CssConfig { autoprefix: true, targets: vec!["netscape 4".into()] };
        assert!(browser_targets(&bad).is_err());
    }

    #[test]
    fn test_autoprefix_old_safari() {
        let css = CssConfig { autoprefix: true, targets: vec!["safari 8".into()] };
        let out = autoprefix(".a { user-select: none; }", &css).unwrap();
        assert!(out.contains("-webkit-user-select"), "{}", out);
    }

    #[test]
    fn test_autoprefix_skips_star_hack() {
        let css = CssConfig { autoprefix: true, targets: vec!["chrome 61".into()] };
        let out = autoprefix(".a { *zoom: 1; color: red; }\n.b { color: blue; }", &css).unwrap();
        assert!(out.contains("red"), "{}", out);
        assert!(out.contains(".b"), "{}", out);
        assert!(out.contains("blue"), "{}", out);
    }
}
