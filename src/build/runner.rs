//! Task execution.
//!
//! A [`TaskRunner`] runs named tasks and groups of tasks. A group is a list
//! of stages; every task in a stage runs concurrently and a stage starts
//! only after the previous one finished, so later stages always observe
//! the files earlier stages wrote.
//!
//! # Example
//!
//! ```ignore
//! use blocksmith::build::{BuildContext, TaskRunner};
//!
//! let runner = TaskRunner::new(BuildContext::new(config, project_root));
//! let result = runner.build();
//! println!("{}", result.summary());
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::compile::{CompileTarget, Compiler, ToolCompiler};
use super::images::minify_images;
use super::progress::{NullProgress, ProgressEvent, ProgressReporter};
use super::{BuildContext, RunResult, Task, TaskResult};
use crate::aggregate::{write_aggregator, AggregatorKind};
use crate::fsutil::clear_dir;
use crate::serve::ReloadHandle;

/// Stages of a full build: clean, aggregators, compiles, images.
pub const BUILD_STAGES: [&[Task]; 4] = [
    &[Task::ClearBuildDir],
    &[Task::MakePugMixinsFile, Task::MakeScssBlocksFile, Task::MakeJsEntryFile],
    &[Task::CompilePug, Task::CompileScss, Task::CompileJs],
    &[Task::MinifyImg],
];

enum Outcome {
    Done(Vec<PathBuf>),
    Skipped(String),
}

/// Runs tasks against a build context.
pub struct TaskRunner {
    context: BuildContext,
    compiler: Box<dyn Compiler>,
    reporter: Arc<dyn ProgressReporter>,
    reload: Option<ReloadHandle>,
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("context", &self.context)
            .field("reload", &self.reload)
            .finish()
    }
}

impl TaskRunner {
    /// Create a runner using the configured external tools and no progress output.
    pub fn new(context: BuildContext) -> Self {
        Self {
            context,
            compiler: Box::new(ToolCompiler::new()),
            reporter: Arc::new(NullProgress::new()),
            reload: None,
        }
    }

    /// Replace the compiler.
    pub fn with_compiler<C: Compiler + 'static>(mut self, compiler: C) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    /// Replace the progress reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Attach the reload handle of a running preview server.
    pub fn with_reload(mut self, reload: ReloadHandle) -> Self {
        self.reload = Some(reload);
        self
    }

    /// Build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Progress reporter.
    pub fn reporter(&self) -> &Arc<dyn ProgressReporter> {
        &self.reporter
    }

    /// Reload handle, when a preview server is attached.
    pub fn reload_handle(&self) -> Option<&ReloadHandle> {
        self.reload.as_ref()
    }

    /// Run a single task and report its progress.
    ///
    /// `serve` and `default` run until interrupted and are started by the
    /// CLI; asking the runner for them fails.
    pub fn run(&self, task: Task) -> TaskResult {
        self.reporter.report(ProgressEvent::TaskStarted { task: task.name().to_string() });
        let start = Instant::now();

        let result = match self.execute(task) {
            Ok(Outcome::Done(outputs)) => TaskResult::success(task, outputs, start.elapsed()),
            Ok(Outcome::Skipped(reason)) => {
                self.reporter.report(ProgressEvent::Warning {
                    task: Some(task.name().to_string()),
                    message: reason.clone(),
                });
                TaskResult::skipped(task, reason)
            }
            Err(error) => {
                tracing::error!(task = task.name(), %error, "task failed");
                TaskResult::failed(task, error, start.elapsed())
            }
        };

        self.reporter.report(ProgressEvent::TaskCompleted {
            task: task.name().to_string(),
            status: result.status.clone(),
            duration_ms: result.duration.as_millis() as u64,
        });
        result
    }

    /// Run every task of `stage` concurrently and wait for all of them.
    ///
    /// Results are returned in the order of `stage`.
    pub fn run_stage(&self, stage: &[Task]) -> Vec<TaskResult> {
        if stage.len() <= 1 {
            return stage.iter().map(|t| self.run(*t)).collect();
        }

        std::thread::scope(|s| {
            let handles: Vec<_> = stage.iter().map(|&task| (task, s.spawn(move || self.run(task)))).collect();
            handles
                .into_iter()
                .map(|(task, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        TaskResult::failed(task, "task panicked".to_string(), Default::default())
                    })
                })
                .collect()
        })
    }

    /// Run stages in order. A failed task does not stop later stages.
    pub fn run_stages(&self, stages: &[&[Task]]) -> RunResult {
        self.run_stages_then(stages, None)
    }

    /// Run stages in order, then `finally` if every earlier task succeeded.
    pub fn run_stages_then(&self, stages: &[&[Task]], finally: Option<Task>) -> RunResult {
        let start = Instant::now();
        let total_tasks = stages.iter().map(|s| s.len()).sum::<usize>() + usize::from(finally.is_some());
        self.reporter.report(ProgressEvent::RunStarted { total_tasks });

        let mut result = RunResult::new();
        for stage in stages {
            result.extend(self.run_stage(stage));
        }
        if let Some(task) = finally {
            if result.is_success() {
                result.add_result(self.run(task));
            } else {
                tracing::debug!(task = task.name(), "skipped after failure");
            }
        }
        result.total_duration = start.elapsed();

        self.reporter.report(ProgressEvent::RunCompleted {
            success: result.is_success(),
            duration_ms: result.total_duration.as_millis() as u64,
            succeeded: result.success_count(),
            skipped: result.skipped_count(),
            failed: result.failed_count(),
        });
        result
    }

    /// Full build without serving.
    pub fn build(&self) -> RunResult {
        self.run_stages(&BUILD_STAGES)
    }

    fn execute(&self, task: Task) -> Result<Outcome, String> {
        let ctx = &self.context;
        match task {
            Task::MakePugMixinsFile => self.regenerate(AggregatorKind::PugMixins),
            Task::MakeScssBlocksFile => self.regenerate(AggregatorKind::ScssImports),
            Task::MakeJsEntryFile => self.regenerate(AggregatorKind::JsEntry),
            Task::CompilePug => self.compile(CompileTarget::Pug),
            Task::CompileScss => self.compile(CompileTarget::Scss),
            Task::CompileJs => self.compile(CompileTarget::Js),
            Task::MinifyImg => {
                let images = minify_images(ctx).map_err(|e| e.to_string())?;
                if images.is_empty() {
                    return Ok(Outcome::Skipped("no images found".to_string()));
                }
                Ok(Outcome::Done(images.into_iter().map(|i| i.output).collect()))
            }
            Task::ClearBuildDir => {
                let build = ctx.build_dir();
                let removed = clear_dir(&build).map_err(|e| format!("{}: {}", build.display(), e))?;
                tracing::debug!(removed, dir = %build.display(), "build directory cleared");
                Ok(Outcome::Done(vec![]))
            }
            Task::Deploy => {
                let published = crate::deploy::publish(ctx).map_err(|e| e.to_string())?;
                Ok(Outcome::Done(vec![published.build_dir]))
            }
            Task::Reload => match &self.reload {
                Some(handle) => {
                    handle.trigger();
                    Ok(Outcome::Done(vec![]))
                }
                None => Ok(Outcome::Skipped("no preview server running".to_string())),
            },
            Task::Serve | Task::Default => {
                Err(format!("'{}' runs until interrupted and cannot run as a step", task))
            }
        }
    }

    fn regenerate(&self, kind: AggregatorKind) -> Result<Outcome, String> {
        let aggregate = write_aggregator(kind, &self.context).map_err(|e| e.to_string())?;
        Ok(Outcome::Done(vec![aggregate.path]))
    }

    fn compile(&self, target: CompileTarget) -> Result<Outcome, String> {
        self.compiler.compile(target, &self.context).map(Outcome::Done).map_err(|e| e.to_string())
    }
}
