//! Watch mode for incremental rebuilds on file changes
//!
//! The debouncer only reports that something happened at a path. A
//! [`ChangeDetector`] keeps a snapshot of known files to tell additions,
//! removals and modifications apart, [`classify`](Classifier::classify)
//! decides what a path is, and [`route`] maps each change to the steps it
//! needs. Steps from one debounced batch are merged into a [`Plan`] and run
//! in order: aggregators first, then compiles and images, then a reload.

use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;

use crate::aggregate::AggregatorKind;
use crate::build::images::is_image;
use crate::build::progress::ProgressEvent;
use crate::build::{BuildContext, CompileTarget, RunResult, Task, TaskRunner};
use crate::fsutil::slash_path;

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch {}: {source}", .path.display())]
    WatchPath {
        /// Directory
        path: PathBuf,
        /// Underlying error
        source: notify::Error,
    },
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    Channel(String),
    /// Source directory not found
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
}

/// How a path changed between two batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Path appeared
    Added,
    /// Path disappeared
    Removed,
    /// Known path changed content
    Modified,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Removed => write!(f, "removed"),
            ChangeKind::Modified => write!(f, "modified"),
        }
    }
}

/// What a changed path is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    /// One of the generated aggregator files
    Generated(AggregatorKind),
    /// A pug, scss or js file inside a block
    Block(AggregatorKind),
    /// An image in the image directory
    Image,
    /// A page template
    Page,
    /// A shared pug template
    Template,
    /// A stylesheet outside the blocks
    Style,
    /// A script outside the blocks
    Script,
    /// Anything else
    Other,
}

/// A classified change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Changed path
    pub path: PathBuf,
    /// Change kind
    pub kind: ChangeKind,
    /// Classification
    pub class: AssetClass,
}

/// One unit of work triggered by a change.
///
/// The derived order is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    /// Rewrite an aggregator file
    Regenerate(AggregatorKind),
    /// Run a compile task
    Compile(CompileTarget),
    /// Optimize images
    MinifyImages,
    /// Notify the preview server
    Reload,
}

impl Step {
    /// Task implementing this step.
    pub fn task(self) -> Task {
        match self {
            Step::Regenerate(kind) => Task::regenerate(kind),
            Step::Compile(target) => Task::compile(target),
            Step::MinifyImages => Task::MinifyImg,
            Step::Reload => Task::Reload,
        }
    }
}

fn compile_for(kind: AggregatorKind) -> CompileTarget {
    match kind {
        AggregatorKind::PugMixins => CompileTarget::Pug,
        AggregatorKind::ScssImports => CompileTarget::Scss,
        AggregatorKind::JsEntry => CompileTarget::Js,
    }
}

/// Steps required by a single change.
pub fn route(event: &WatchEvent) -> Vec<Step> {
    use AssetClass::*;
    use ChangeKind::*;

    match (event.class, event.kind) {
        (Generated(_), _) | (Other, _) => vec![],
        (Block(kind), Added | Removed) => {
            vec![Step::Regenerate(kind), Step::Compile(compile_for(kind)), Step::Reload]
        }
        (Block(kind), Modified) => vec![Step::Compile(compile_for(kind)), Step::Reload],
        (Image, _) => vec![Step::MinifyImages, Step::Reload],
        (Page | Template, Removed) | (Style, Removed) | (Script, Removed) => vec![],
        (Page | Template, _) => vec![Step::Compile(CompileTarget::Pug), Step::Reload],
        (Style, _) => vec![Step::Compile(CompileTarget::Scss), Step::Reload],
        (Script, _) => vec![Step::Compile(CompileTarget::Js), Step::Reload],
    }
}

/// Deduplicated, ordered steps for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    steps: BTreeSet<Step>,
}

impl Plan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the steps of one event.
    pub fn add(&mut self, event: &WatchEvent) {
        self.steps.extend(route(event));
    }

    /// Plan for a whole batch.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a WatchEvent>) -> Self {
        let mut plan = Self::new();
        for event in events {
            plan.add(event);
        }
        plan
    }

    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps in execution order.
    pub fn steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.steps.iter().copied()
    }

    /// Tasks grouped into stages: aggregators, then compiles and images.
    /// The reload is returned separately.
    pub fn stages(&self) -> (Vec<Vec<Task>>, Option<Task>) {
        let regenerate: Vec<Task> =
            self.steps().filter(|s| matches!(s, Step::Regenerate(_))).map(Step::task).collect();
        let build: Vec<Task> = self
            .steps()
            .filter(|s| matches!(s, Step::Compile(_) | Step::MinifyImages))
            .map(Step::task)
            .collect();
        let reload = self.steps.contains(&Step::Reload).then_some(Task::Reload);

        let stages = [regenerate, build].into_iter().filter(|s| !s.is_empty()).collect();
        (stages, reload)
    }
}

/// Classifies paths by the project directory they belong to.
#[derive(Debug, Clone)]
pub struct Classifier {
    generated: Vec<(PathBuf, AggregatorKind)>,
    build: PathBuf,
    blocks: PathBuf,
    img: PathBuf,
    pages: PathBuf,
    pug: PathBuf,
    scss: PathBuf,
    js: PathBuf,
}

fn has_ext(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

impl Classifier {
    /// Classifier for the directories of `ctx`.
    pub fn new(ctx: &BuildContext) -> Self {
        Self {
            generated: AggregatorKind::ALL.iter().map(|k| (ctx.aggregator_path(*k), *k)).collect(),
            build: ctx.build_dir(),
            blocks: ctx.blocks_dir(),
            img: ctx.img_dir(),
            pages: ctx.pages_dir(),
            pug: ctx.pug_dir(),
            scss: ctx.scss_dir(),
            js: ctx.js_dir(),
        }
    }

    /// Classify `path`.
    pub fn classify(&self, path: &Path) -> AssetClass {
        if let Some((_, kind)) = self.generated.iter().find(|(p, _)| p == path) {
            return AssetClass::Generated(*kind);
        }
        if path.starts_with(&self.build) {
            return AssetClass::Other;
        }
        if path.starts_with(&self.blocks) {
            return path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(AggregatorKind::for_extension)
                .map(AssetClass::Block)
                .unwrap_or(AssetClass::Other);
        }
        if path.starts_with(&self.img) {
            return if is_image(path) { AssetClass::Image } else { AssetClass::Other };
        }
        if path.starts_with(&self.pages) && has_ext(path, "pug") {
            return AssetClass::Page;
        }
        if path.starts_with(&self.pug) && has_ext(path, "pug") {
            return AssetClass::Template;
        }
        if path.starts_with(&self.scss) && has_ext(path, "scss") {
            return AssetClass::Style;
        }
        if path.starts_with(&self.js) && has_ext(path, "js") {
            return AssetClass::Script;
        }
        AssetClass::Other
    }
}

/// Files below `dir`, recursively. Unreadable entries are skipped.
fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        match entry.file_type() {
            Ok(t) if t.is_dir() => walk_files(&path, out),
            Ok(t) if t.is_file() => out.push(path),
            _ => {}
        }
    }
}

/// Derives add/remove/modify from a snapshot of known files.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    known: HashSet<PathBuf>,
}

impl ChangeDetector {
    /// Snapshot every file under `roots`.
    pub fn scan<P: AsRef<Path>>(roots: &[P]) -> Self {
        let mut files = Vec::new();
        for root in roots {
            walk_files(root.as_ref(), &mut files);
        }
        Self { known: files.into_iter().collect() }
    }

    /// Number of known files.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Whether no file is known.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Update the snapshot for a reported path and return the file changes.
    ///
    /// A removed directory yields a removal for every known file under it;
    /// a new directory yields an addition for every file inside.
    pub fn detect(&mut self, path: &Path) -> Vec<(PathBuf, ChangeKind)> {
        let mut changes = Vec::new();
        if path.is_file() {
            let kind = if self.known.insert(path.to_path_buf()) {
                ChangeKind::Added
            } else {
                ChangeKind::Modified
            };
            changes.push((path.to_path_buf(), kind));
        } else if path.is_dir() {
            let mut files = Vec::new();
            walk_files(path, &mut files);
            for file in files {
                if self.known.insert(file.clone()) {
                    changes.push((file, ChangeKind::Added));
                }
            }
        } else {
            let gone: Vec<PathBuf> = self.known.iter().filter(|p| p.starts_with(path)).cloned().collect();
            for file in gone {
                self.known.remove(&file);
                changes.push((file, ChangeKind::Removed));
            }
        }
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        changes
    }
}

/// Result of handling one debounced batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Classified changes
    pub events: Vec<WatchEvent>,
    /// Merged plan
    pub plan: Plan,
    /// Task results, empty when the plan was empty
    pub result: RunResult,
}

/// Watch state: the runner, the classifier and the file snapshot.
pub struct WatchSession {
    runner: TaskRunner,
    classifier: Classifier,
    detector: ChangeDetector,
}

impl WatchSession {
    /// Create a session and snapshot the watched directories.
    pub fn new(runner: TaskRunner) -> Self {
        let classifier = Classifier::new(runner.context());
        let detector = ChangeDetector::scan(&watch_roots(runner.context()));
        Self { runner, classifier, detector }
    }

    /// Task runner.
    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Classify the reported paths, plan the batch and run it.
    pub fn handle_batch<P: AsRef<Path>>(&mut self, paths: &[P]) -> BatchOutcome {
        let mut events = Vec::new();
        let mut seen = HashSet::new();
        for path in paths {
            for (path, kind) in self.detector.detect(path.as_ref()) {
                if seen.insert(path.clone()) {
                    let class = self.classifier.classify(&path);
                    events.push(WatchEvent { path, kind, class });
                }
            }
        }

        let root = self.runner.context().project_root().to_path_buf();
        for event in events.iter().filter(|e| e.class != AssetClass::Other) {
            tracing::debug!(path = %event.path.display(), kind = %event.kind, class = ?event.class, "change");
            let shown = event.path.strip_prefix(&root).unwrap_or(&event.path);
            self.runner.reporter().report(ProgressEvent::Changed {
                path: slash_path(shown),
                change: event.kind.to_string(),
            });
        }

        let plan = Plan::from_events(&events);
        let result = if plan.is_empty() {
            RunResult::new()
        } else {
            let (stages, reload) = plan.stages();
            let stages: Vec<&[Task]> = stages.iter().map(|s| s.as_slice()).collect();
            self.runner.run_stages_then(&stages, reload)
        };

        BatchOutcome { events, plan, result }
    }
}

/// Directories to watch: the source root plus configured directories
/// outside it, keeping only outermost existing ones.
pub fn watch_roots(ctx: &BuildContext) -> Vec<PathBuf> {
    let candidates = [
        ctx.src_dir(),
        ctx.blocks_dir(),
        ctx.pages_dir(),
        ctx.pug_dir(),
        ctx.scss_dir(),
        ctx.js_dir(),
        ctx.img_dir(),
    ];
    let existing: Vec<PathBuf> = candidates.into_iter().filter(|p| p.is_dir()).collect();

    let mut roots: Vec<PathBuf> = Vec::new();
    for dir in &existing {
        let nested = existing.iter().any(|other| other != dir && dir.starts_with(other));
        if !nested && !roots.contains(dir) {
            roots.push(dir.clone());
        }
    }
    roots
}

/// Clear the terminal screen
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

/// Watch the project and run the routed steps for every change.
///
/// This function blocks and runs until interrupted (Ctrl+C).
pub fn watch(session: &mut WatchSession) -> Result<(), WatchError> {
    let ctx = session.runner().context().clone();
    let roots = watch_roots(&ctx);
    if roots.is_empty() {
        return Err(WatchError::SourceNotFound(ctx.src_dir()));
    }

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(ctx.config().watch.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    for root in &roots {
        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::WatchPath { path: root.clone(), source })?;
    }

    let shown: Vec<String> = roots
        .iter()
        .map(|r| slash_path(r.strip_prefix(ctx.project_root()).unwrap_or(r)))
        .collect();
    session.runner().reporter().report(ProgressEvent::Watching { roots: shown.clone() });

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let paths: Vec<PathBuf> = events.into_iter().map(|e| e.path).collect();
                if ctx.config().watch.clear_screen {
                    clear_screen();
                }
                let outcome = session.handle_batch(&paths);
                if !outcome.plan.is_empty() {
                    session.runner().reporter().report(ProgressEvent::Watching { roots: shown.clone() });
                }
            }
            Ok(Err(error)) => {
                // Watch errors are not fatal
                tracing::warn!(?error, "watch error, continuing");
            }
            Err(e) => return Err(WatchError::Channel(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use tempfile::TempDir;

    fn ctx() -> BuildContext {
        BuildContext::new(default_config(), PathBuf::from("/site"))
    }

    fn event(path: &str, kind: ChangeKind) -> WatchEvent {
        let path = PathBuf::from(path);
        let class = Classifier::new(&ctx()).classify(&path);
        WatchEvent { path, kind, class }
    }

    #[test]
    fn test_classify() {
        let c = Classifier::new(&ctx());
        let cases = [
            ("/site/src/scss/blocks.scss", AssetClass::Generated(AggregatorKind::ScssImports)),
            ("/site/src/pug/mixins.pug", AssetClass::Generated(AggregatorKind::PugMixins)),
            ("/site/src/js/entry.js", AssetClass::Generated(AggregatorKind::JsEntry)),
            ("/site/src/blocks/card/card.scss", AssetClass::Block(AggregatorKind::ScssImports)),
            ("/site/src/blocks/card/card.js", AssetClass::Block(AggregatorKind::JsEntry)),
            ("/site/src/blocks/card/img/bg.png", AssetClass::Other),
            ("/site/src/img/logo.PNG", AssetClass::Image),
            ("/site/src/img/notes.txt", AssetClass::Other),
            ("/site/src/pages/index.pug", AssetClass::Page),
            ("/site/src/pug/layout.pug", AssetClass::Template),
            ("/site/src/scss/style.scss", AssetClass::Style),
            ("/site/src/js/utils/ready.js", AssetClass::Script),
            ("/site/build/index.html", AssetClass::Other),
            ("/site/README.md", AssetClass::Other),
        ];
        for (path, expected) in cases {
            assert_eq!(c.classify(Path::new(path)), expected, "{}", path);
        }
    }

    #[test]
    fn test_route_block_add_and_remove_regenerate() {
        for kind in [ChangeKind::Added, ChangeKind::Removed] {
            let steps = route(&event("/site/src/blocks/card/card.scss", kind));
            assert_eq!(
                steps,
                vec![
                    Step::Regenerate(AggregatorKind::ScssImports),
                    Step::Compile(CompileTarget::Scss),
                    Step::Reload
                ]
            );
        }
    }

    #[test]
    fn test_route_block_modify_only_compiles() {
        let steps = route(&event("/site/src/blocks/card/card.pug", ChangeKind::Modified));
        assert_eq!(steps, vec![Step::Compile(CompileTarget::Pug), Step::Reload]);
    }

    #[test]
    fn test_route_generated_files_are_ignored() {
        for kind in [ChangeKind::Added, ChangeKind::Modified, ChangeKind::Removed] {
            assert!(route(&event("/site/src/scss/blocks.scss", kind)).is_empty());
        }
    }

    #[test]
    fn test_route_sources() {
        assert_eq!(
            route(&event("/site/src/pages/about.pug", ChangeKind::Added)),
            vec![Step::Compile(CompileTarget::Pug), Step::Reload]
        );
        assert!(route(&event("/site/src/pages/about.pug", ChangeKind::Removed)).is_empty());
        assert_eq!(
            route(&event("/site/src/scss/style.scss", ChangeKind::Modified)),
            vec![Step::Compile(CompileTarget::Scss), Step::Reload]
        );
        assert_eq!(
            route(&event("/site/src/js/utils/ready.js", ChangeKind::Modified)),
            vec![Step::Compile(CompileTarget::Js), Step::Reload]
        );
        assert_eq!(
            route(&event("/site/src/img/a.jpg", ChangeKind::Removed)),
            vec![Step::MinifyImages, Step::Reload]
        );
    }

    #[test]
    fn test_plan_merges_and_orders() {
        let events = [
            event("/site/src/img/a.png", ChangeKind::Added),
            event("/site/src/blocks/x/x.js", ChangeKind::Added),
            event("/site/src/blocks/y/y.js", ChangeKind::Removed),
            event("/site/src/scss/style.scss", ChangeKind::Modified),
        ];
        let plan = Plan::from_events(&events);
        let steps: Vec<Step> = plan.steps().collect();
        assert_eq!(
            steps,
            vec![
                Step::Regenerate(AggregatorKind::JsEntry),
                Step::Compile(CompileTarget::Scss),
                Step::Compile(CompileTarget::Js),
                Step::MinifyImages,
                Step::Reload,
            ]
        );

        let (stages, reload) = plan.stages();
        assert_eq!(
            stages,
            vec![
                vec![Task::MakeJsEntryFile],
                vec![Task::CompileScss, Task::CompileJs, Task::MinifyImg]
            ]
        );
        assert_eq!(reload, Some(Task::Reload));
    }

    #[test]
    fn test_plan_empty() {
        let plan = Plan::from_events(&[event("/site/src/pug/mixins.pug", ChangeKind::Modified)]);
        assert!(plan.is_empty());
        assert_eq!(plan.stages(), (vec![], None));
    }

    #[test]
    fn test_change_detector() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("card")).unwrap();
        fs::write(root.join("card/card.scss"), "").unwrap();

        let mut detector = ChangeDetector::scan(&[root]);
        assert_eq!(detector.len(), 1);

        let file = root.join("card/card.scss");
        assert_eq!(detector.detect(&file), vec![(file.clone(), ChangeKind::Modified)]);

        let added = root.join("card/card.pug");
        fs::write(&added, "").unwrap();
        assert_eq!(detector.detect(&added), vec![(added.clone(), ChangeKind::Added)]);

        fs::remove_dir_all(root.join("card")).unwrap();
        let removed = detector.detect(&root.join("card"));
        assert_eq!(removed, vec![(added, ChangeKind::Removed), (file, ChangeKind::Removed)]);
        assert!(detector.is_empty());
    }

    #[test]
    fn test_change_detector_new_directory() {
        let temp = TempDir::new().unwrap();
        let mut detector = ChangeDetector::scan(&[temp.path()]);
        fs::create_dir_all(temp.path().join("menu")).unwrap();
        fs::write(temp.path().join("menu/menu.js"), "").unwrap();

        let changes = detector.detect(&temp.path().join("menu"));
        assert_eq!(changes, vec![(temp.path().join("menu/menu.js"), ChangeKind::Added)]);
        assert!(detector.detect(&temp.path().join("menu")).is_empty());
    }

    #[test]
    fn test_watch_roots_outermost_only() {
        let temp = TempDir::new().unwrap();
        let mut config = default_config();
        config.paths.blocks = PathBuf::from("components");
        let ctx = BuildContext::new(config, temp.path().to_path_buf());
        fs::create_dir_all(ctx.scss_dir()).unwrap();
        fs::create_dir_all(ctx.blocks_dir()).unwrap();

        assert_eq!(watch_roots(&ctx), vec![ctx.src_dir(), ctx.blocks_dir()]);
    }
}
