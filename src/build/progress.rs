//! Task progress reporting.
//!
//! Reporters receive [`ProgressEvent`]s from the task runner and the watch
//! loop. Console output is colored when stderr is a terminal; JSON output
//! writes one object per line.
//!
//! # Example
//!
//! ```ignore
//! use blocksmith::build::progress::{ConsoleProgress, ProgressEvent, ProgressReporter};
//!
//! let reporter = ConsoleProgress::new();
//! reporter.report(ProgressEvent::RunStarted { total_tasks: 3 });
//! reporter.report(ProgressEvent::TaskStarted { task: "compileScss".to_string() });
//! ```

use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;

use super::TaskStatus;

/// Events that can be reported while tasks run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A run of one or more tasks started
    RunStarted {
        /// Number of tasks planned
        total_tasks: usize,
    },
    /// A task started
    TaskStarted {
        /// Task name
        task: String,
    },
    /// A task finished
    TaskCompleted {
        /// Task name
        task: String,
        /// Outcome
        status: TaskStatus,
        /// Duration in milliseconds
        duration_ms: u64,
    },
    /// The run finished
    RunCompleted {
        /// Whether no task failed
        success: bool,
        /// Total duration in milliseconds
        duration_ms: u64,
        /// Number of successful tasks
        succeeded: usize,
        /// Number of skipped tasks
        skipped: usize,
        /// Number of failed tasks
        failed: usize,
    },
    /// The watcher is waiting for changes
    Watching {
        /// Watched directories
        roots: Vec<String>,
    },
    /// A change was picked up by the watcher
    Changed {
        /// Changed path, relative to the project root when possible
        path: String,
        /// Kind of change (`added`, `removed`, `modified`)
        change: String,
    },
    /// A warning was generated
    Warning {
        /// Task that generated the warning (if applicable)
        task: Option<String>,
        /// Warning message
        message: String,
    },
    /// An error occurred
    Error {
        /// Task that generated the error (if applicable)
        task: Option<String>,
        /// Error message
        message: String,
    },
}

/// Trait for progress reporters.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);

    /// Check if this reporter wants verbose output.
    fn is_verbose(&self) -> bool {
        false
    }
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    /// Create a new null progress reporter.
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// ANSI styles used by [`ConsoleProgress`]
#[derive(Debug, Clone, Copy)]
enum Paint {
    Good,
    Warn,
    Bad,
    Tag,
    Faint,
}

impl Paint {
    fn sgr(self) -> &'static str {
        match self {
            Paint::Good => "32",
            Paint::Warn => "33",
            Paint::Bad => "31",
            Paint::Tag => "36",
            Paint::Faint => "2",
        }
    }
}

/// Human-readable reporter; one line per event.
pub struct ConsoleProgress {
    colors: bool,
    verbose: bool,
    done: AtomicUsize,
    planned: AtomicUsize,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("colors", &self.colors)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl ConsoleProgress {
    /// Create a console reporter on stderr, colored when stderr is a terminal.
    pub fn new() -> Self {
        Self::writing_to(std::io::stderr(), atty::is(atty::Stream::Stderr))
    }

    /// Create an uncolored reporter writing to `output`.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self::writing_to(output, false)
    }

    fn writing_to<W: Write + Send + 'static>(output: W, colors: bool) -> Self {
        Self {
            colors,
            verbose: false,
            done: AtomicUsize::new(0),
            planned: AtomicUsize::new(0),
            sink: Mutex::new(Box::new(output)),
        }
    }

    /// Force colors on or off.
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Also print run headers.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn paint(&self, paint: Paint, text: &str) -> String {
        if self.colors {
            format!("\x1b[{}m{}\x1b[0m", paint.sgr(), text)
        } else {
            text.to_string()
        }
    }

    fn line(&self, text: String) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = writeln!(sink, "{}", text);
        }
    }

    fn with_task(task: Option<String>, message: &str) -> String {
        match task {
            Some(task) => format!("{}: {}", task, message),
            None => message.to_string(),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { total_tasks } => {
                self.planned.store(total_tasks, Ordering::SeqCst);
                self.done.store(0, Ordering::SeqCst);
                if self.verbose && total_tasks > 0 {
                    self.line(format!(
                        "{} Running {} task{}...",
                        self.paint(Paint::Tag, "[bsm]"),
                        total_tasks,
                        if total_tasks == 1 { "" } else { "s" }
                    ));
                }
            }
            ProgressEvent::TaskStarted { task } => {
                self.line(format!("{} Starting '{}'...", self.paint(Paint::Tag, "[bsm]"), task));
            }
            ProgressEvent::TaskCompleted { task, status, duration_ms } => {
                let current = self.done.fetch_add(1, Ordering::SeqCst) + 1;
                let total = self.planned.load(Ordering::SeqCst);

                let status_str = match &status {
                    TaskStatus::Success => self.paint(Paint::Good, "Finished"),
                    TaskStatus::Skipped => self.paint(Paint::Warn, "Skipped"),
                    TaskStatus::Failed(_) => self.paint(Paint::Bad, "FAILED"),
                };
                let counter = if total > 0 {
                    format!(" [{}/{}]", current.min(total), total)
                } else {
                    String::new()
                };

                self.line(format!(
                    "{}{} {} '{}' after {}",
                    self.paint(Paint::Tag, "[bsm]"),
                    self.paint(Paint::Faint, &counter),
                    status_str,
                    task,
                    format_duration(duration_ms)
                ));

                if let TaskStatus::Failed(err) = status {
                    for line in err.lines() {
                        self.line(format!("        {}", self.paint(Paint::Bad, line)));
                    }
                }
            }
            ProgressEvent::RunCompleted { success, duration_ms, succeeded, skipped, failed } => {
                let duration_str = format_duration(duration_ms);
                if success {
                    self.line(format!(
                        "{} {} task{} finished, {} skipped in {}",
                        self.paint(Paint::Good, "[done]"),
                        succeeded + skipped,
                        if succeeded + skipped == 1 { "" } else { "s" },
                        skipped,
                        duration_str
                    ));
                } else {
                    self.line(format!(
                        "{} Run failed: {} succeeded, {} skipped, {} {} in {}",
                        self.paint(Paint::Bad, "[error]"),
                        succeeded,
                        skipped,
                        failed,
                        if failed == 1 { "failure" } else { "failures" },
                        duration_str
                    ));
                }
            }
            ProgressEvent::Watching { roots } => {
                self.line(format!(
                    "{} {} Watching {} for changes...",
                    self.paint(Paint::Faint, &format!("[{}]", timestamp())),
                    self.paint(Paint::Tag, "[watch]"),
                    roots.join(", ")
                ));
            }
            ProgressEvent::Changed { path, change } => {
                self.line(format!(
                    "{} {} {} {}",
                    self.paint(Paint::Faint, &format!("[{}]", timestamp())),
                    self.paint(Paint::Tag, "[watch]"),
                    change,
                    path
                ));
            }
            ProgressEvent::Warning { task, message } => {
                self.line(format!("{} {}", self.paint(Paint::Warn, "[warn]"), Self::with_task(task, &message)));
            }
            ProgressEvent::Error { task, message } => {
                self.line(format!("{} {}", self.paint(Paint::Bad, "[error]"), Self::with_task(task, &message)));
            }
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// JSON progress reporter for machine-readable output.
pub struct JsonProgress {
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonProgress").finish()
    }
}

impl JsonProgress {
    /// Create a new JSON progress reporter writing to stderr.
    pub fn new() -> Self {
        Self { output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a JSON progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { output: Mutex::new(Box::new(output)) }
    }

    fn write_json(&self, value: &serde_json::Value) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", value);
        }
    }
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn event_to_json(event: ProgressEvent) -> serde_json::Value {
    match event {
        ProgressEvent::RunStarted { total_tasks } => {
            json!({ "event": "run_started", "total_tasks": total_tasks })
        }
        ProgressEvent::TaskStarted { task } => json!({ "event": "task_started", "task": task }),
        ProgressEvent::TaskCompleted { task, status, duration_ms } => {
            let mut value = json!({
                "event": "task_completed",
                "task": task,
                "status": match &status {
                    TaskStatus::Success => "success",
                    TaskStatus::Skipped => "skipped",
                    TaskStatus::Failed(_) => "failed",
                },
                "duration_ms": duration_ms,
            });
            if let TaskStatus::Failed(error) = status {
                value["error"] = json!(error);
            }
            value
        }
        ProgressEvent::RunCompleted { success, duration_ms, succeeded, skipped, failed } => json!({
            "event": "run_completed",
            "success": success,
            "duration_ms": duration_ms,
            "succeeded": succeeded,
            "skipped": skipped,
            "failed": failed,
        }),
        ProgressEvent::Watching { roots } => json!({ "event": "watching", "roots": roots }),
        ProgressEvent::Changed { path, change } => {
            json!({ "event": "changed", "path": path, "change": change })
        }
        ProgressEvent::Warning { task, message } => {
            let mut value = json!({ "event": "warning", "message": message });
            if let Some(task) = task {
                value["task"] = json!(task);
            }
            value
        }
        ProgressEvent::Error { task, message } => {
            let mut value = json!({ "event": "error", "message": message });
            if let Some(task) = task {
                value["task"] = json!(task);
            }
            value
        }
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        self.write_json(&event_to_json(event));
    }
}

/// Wall-clock time of day (UTC) as `hh:mm:ss`.
fn timestamp() -> String {
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Format a duration in milliseconds to a human-readable string.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{}m {}s", minutes, seconds)
    }
}
