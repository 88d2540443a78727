//! Configuration schema types for `bsm.toml`
//!
//! Defines the structure and validation rules for blocksmith project configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required)
    pub name: String,
}

/// Source and output directories, relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Source root; `blocks` is rewritten relative to it in pug/js aggregators
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Root directory holding one directory per block
    #[serde(default = "default_blocks")]
    pub blocks: PathBuf,
    /// Page templates compiled to HTML
    #[serde(default = "default_pages")]
    pub pages: PathBuf,
    /// Shared pug layouts and the generated `mixins.pug`
    #[serde(default = "default_pug")]
    pub pug: PathBuf,
    /// Stylesheets, `style.scss` and the generated `blocks.scss`
    #[serde(default = "default_scss")]
    pub scss: PathBuf,
    /// Scripts and the generated `entry.js`
    #[serde(default = "default_js")]
    pub js: PathBuf,
    /// Images copied (and minified) into the build
    #[serde(default = "default_img")]
    pub img: PathBuf,
    /// Build output directory
    #[serde(default = "default_build")]
    pub build: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_blocks() -> PathBuf {
    PathBuf::from("src/blocks")
}

fn default_pages() -> PathBuf {
    PathBuf::from("src/pages")
}

fn default_pug() -> PathBuf {
    PathBuf::from("src/pug")
}

fn default_scss() -> PathBuf {
    PathBuf::from("src/scss")
}

fn default_js() -> PathBuf {
    PathBuf::from("src/js")
}

fn default_img() -> PathBuf {
    PathBuf::from("src/img")
}

fn default_build() -> PathBuf {
    PathBuf::from("build")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            blocks: default_blocks(),
            pages: default_pages(),
            pug: default_pug(),
            scss: default_scss(),
            js: default_js(),
            img: default_img(),
            build: default_build(),
        }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100, clear_screen: false }
    }
}

/// Preview server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Page printed as the preview URL
    #[serde(default = "default_start_path")]
    pub start_path: String,
    /// Inject the reload script into served HTML
    #[serde(default = "default_true")]
    pub live_reload: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_start_path() -> String {
    "index.html".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            start_path: default_start_path(),
            live_reload: true,
        }
    }
}

/// An external program invocation.
///
/// `{input}` and `{output}` in `args` are replaced with the task's paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    /// Executable name or path
    pub program: String,
    /// Arguments, with placeholders
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Build a tool command from a program and argument list.
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self { program: program.into(), args: args.iter().map(|a| a.to_string()).collect() }
    }
}

/// External compilers used by the compile tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Pug compiler: `{input}` is the pages directory, `{output}` the build directory
    #[serde(default = "default_pug_tool")]
    pub pug: ToolCommand,
    /// SCSS compiler: `{input}` is `style.scss`, `{output}` is `css/style.css`
    #[serde(default = "default_scss_tool")]
    pub scss: ToolCommand,
    /// JS bundler: `{input}` is `entry.js`, `{output}` is `js/bundle.js`
    #[serde(default = "default_js_tool")]
    pub js: ToolCommand,
}

fn default_pug_tool() -> ToolCommand {
    ToolCommand::new("npx", &["pug", "--pretty", "{input}", "--out", "{output}"])
}

fn default_scss_tool() -> ToolCommand {
    ToolCommand::new("npx", &["sass", "--no-source-map", "{input}", "{output}"])
}

fn default_js_tool() -> ToolCommand {
    ToolCommand::new(
        "npx",
        &["esbuild", "{input}", "--bundle", "--target=es2015", "--outfile={output}"],
    )
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { pug: default_pug_tool(), scss: default_scss_tool(), js: default_js_tool() }
    }
}

/// Stylesheet post-processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CssConfig {
    /// Add vendor prefixes to the compiled stylesheet
    #[serde(default = "default_true")]
    pub autoprefix: bool,
    /// Browser targets as "<browser> <major>" (e.g. "safari 11")
    #[serde(default = "default_css_targets")]
    pub targets: Vec<String>,
}

fn default_css_targets() -> Vec<String> {
    ["chrome 61", "firefox 60", "safari 11", "edge 16", "ios_saf 11"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CssConfig {
    fn default() -> Self {
        Self { autoprefix: true, targets: default_css_targets() }
    }
}

/// Image minification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// JPEG re-encode quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_jpeg_quality() -> u8 {
    85
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { jpeg_quality: default_jpeg_quality() }
    }
}

/// Branch publishing settings for `deploy`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Git remote of the project whose URL receives the push
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Explicit repository URL, overrides `remote`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Branch receiving the build output
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Commit message
    #[serde(default = "default_message")]
    pub message: String,
    /// Commit author name (falls back to git's own configuration)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Commit author email (falls back to git's own configuration)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "gh-pages".to_string()
}

fn default_message() -> String {
    "Updates".to_string()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            repo: None,
            branch: default_branch(),
            message: default_message(),
            user_name: None,
            user_email: None,
        }
    }
}

/// Complete bsm.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BsmConfig {
    /// Project metadata (required)
    pub project: ProjectConfig,
    /// Directory layout
    #[serde(default)]
    pub paths: PathsConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
    /// Preview server settings
    #[serde(default)]
    pub serve: ServeConfig,
    /// External compilers
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Stylesheet post-processing
    #[serde(default)]
    pub css: CssConfig,
    /// Image minification
    #[serde(default)]
    pub images: ImagesConfig,
    /// Deploy settings
    #[serde(default)]
    pub deploy: DeployConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "serve.port")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bsm.toml: '{}' {}", self.field, self.message)
    }
}

impl BsmConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ConfigValidationError { field: field.to_string(), message });
        };

        if self.project.name.is_empty() {
            push("project.name", "must be a non-empty string".to_string());
        }

        if self.watch.debounce_ms == 0 {
            push("watch.debounce_ms", "must be greater than 0".to_string());
        }

        if self.serve.port == 0 {
            push("serve.port", "must be a non-zero port number".to_string());
        }

        if self.images.jpeg_quality == 0 || self.images.jpeg_quality > 100 {
            push("images.jpeg_quality", format!("must be 1-100, got {}", self.images.jpeg_quality));
        }

        for (field, tool) in
            [("tools.pug", &self.tools.pug), ("tools.scss", &self.tools.scss), ("tools.js", &self.tools.js)]
        {
            if tool.program.trim().is_empty() {
                push(&format!("{}.program", field), "must be a non-empty string".to_string());
            }
        }

        for target in &self.css.targets {
            if let Err(message) = parse_browser_target(target) {
                push("css.targets", message);
            }
        }

        if self.deploy.branch.trim().is_empty() {
            push("deploy.branch", "must be a non-empty string".to_string());
        }

        errors
    }
}

/// Browsers understood by `css.targets`.
pub const KNOWN_BROWSERS: &[&str] =
    &["android", "chrome", "edge", "firefox", "ie", "ios_saf", "opera", "safari", "samsung"];

/// Parse a "<browser> <major>" target into its browser name and major version.
pub fn parse_browser_target(target: &str) -> Result<(String, u32), String> {
    let mut parts = target.split_whitespace();
    let (Some(name), Some(version), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("invalid browser target '{}', expected \"<browser> <major>\"", target));
    };

    let name = name.to_lowercase();
    if !KNOWN_BROWSERS.contains(&name.as_str()) {
        return Err(format!(
            "unknown browser '{}' (known: {})",
            name,
            KNOWN_BROWSERS.join(", ")
        ));
    }

    let major: u32 =
        version.parse().map_err(|_| format!("invalid version '{}' for {}", version, name))?;
    Ok((name, major))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let toml = r#"
[project]
name = "landing"
"#;
        let config: BsmConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.project.name, "landing");
        assert_eq!(config.paths.blocks, PathBuf::from("src/blocks"));
        assert_eq!(config.paths.build, PathBuf::from("build"));
        assert_eq!(config.watch.debounce_ms, 100);
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.start_path, "index.html");
        assert_eq!(config.deploy.branch, "gh-pages");
        assert!(config.css.targets.iter().all(|t| !t.starts_with("ie ")));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[project]
name = "landing"

[paths]
src = "app"
blocks = "app/components"
build = "dist"

[watch]
debounce_ms = 250
clear_screen = true

[serve]
port = 3000
live_reload = false

[tools.scss]
program = "sass"
args = ["{input}", "{output}"]

[css]
autoprefix = false
targets = ["safari 12"]

[images]
jpeg_quality = 70

[deploy]
repo = "git@example.com:site.git"
branch = "pages"
"#;
        let config: BsmConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.paths.src, PathBuf::from("app"));
        assert_eq!(config.paths.blocks, PathBuf::from("app/components"));
        assert_eq!(config.paths.pages, PathBuf::from("src/pages"));
        assert_eq!(config.paths.build, PathBuf::from("dist"));
        assert_eq!(config.watch.debounce_ms, 250);
        assert!(config.watch.clear_screen);
        assert_eq!(config.serve.port, 3000);
        assert!(!config.serve.live_reload);
        assert_eq!(config.tools.scss, ToolCommand::new("sass", &["{input}", "{output}"]));
        assert_eq!(config.tools.pug.program, "npx");
        assert!(!config.css.autoprefix);
        assert_eq!(config.images.jpeg_quality, 70);
        assert_eq!(config.deploy.repo.as_deref(), Some("git@example.com:site.git"));
        assert_eq!(config.deploy.branch, "pages");
        assert_eq!(config.deploy.remote, "origin");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validation_errors() {
        let toml = r#"
[project]
name = ""

[watch]
debounce_ms = 0

[images]
jpeg_quality = 0

[css]
targets = ["netscape 4", "chrome"]

[tools.js]
program = " "
"#;
        let config: BsmConfig = toml::from_str(toml).unwrap();
        let errors = config.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"project.name"));
        assert!(fields.contains(&"watch.debounce_ms"));
        assert!(fields.contains(&"images.jpeg_quality"));
        assert!(fields.contains(&"tools.js.program"));
        assert_eq!(fields.iter().filter(|f| **f == "css.targets").count(), 2);
    }

    #[test]
    fn test_parse_browser_target() {
        assert_eq!(parse_browser_target("chrome 61"), Ok(("chrome".to_string(), 61)));
        assert_eq!(parse_browser_target("Safari 11"), Ok(("safari".to_string(), 11)));
        assert!(parse_browser_target("chrome").is_err());
        assert!(parse_browser_target("chrome 6x").is_err());
        assert!(parse_browser_target("chrome 61 beta").is_err());
        assert!(parse_browser_target("lynx 2").is_err());
    }

    #[test]
    fn test_validation_error_display() {
        let error = ConfigValidationError {
            field: "serve.port".to_string(),
            message: "must be a non-zero port number".to_string(),
        };
        assert_eq!(error.to_string(), "bsm.toml: 'serve.port' must be a non-zero port number");
    }
}
