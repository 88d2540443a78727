//! Task result types.
//!
//! Contains types for representing the outcome of task runs.

use std::path::PathBuf;
use std::time::Duration;

use super::Task;

/// Status of a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task succeeded
    Success,
    /// Task had nothing to do
    Skipped,
    /// Task failed with error
    Failed(String),
}

impl TaskStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Skipped)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed(_))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Skipped => write!(f, "skipped"),
            TaskStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of running a single task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task that ran
    pub task: Task,
    /// Status
    pub status: TaskStatus,
    /// Files or directories produced
    pub outputs: Vec<PathBuf>,
    /// Duration
    pub duration: Duration,
    /// Warning messages (if any)
    pub warnings: Vec<String>,
}

impl TaskResult {
    /// Create a successful result.
    pub fn success(task: Task, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { task, status: TaskStatus::Success, outputs, duration, warnings: vec![] }
    }

    /// Create a skipped result.
    pub fn skipped(task: Task, reason: impl Into<String>) -> Self {
        Self {
            task,
            status: TaskStatus::Skipped,
            outputs: vec![],
            duration: Duration::ZERO,
            warnings: vec![reason.into()],
        }
    }

    /// Create a failed result.
    pub fn failed(task: Task, error: String, duration: Duration) -> Self {
        Self { task, status: TaskStatus::Failed(error), outputs: vec![], duration, warnings: vec![] }
    }

    /// Add warnings to the result.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a sequence of tasks.
#[derive(Debug, Default)]
pub struct RunResult {
    /// Results for each task, in completion order per stage
    pub tasks: Vec<TaskResult>,
    /// Total duration
    pub total_duration: Duration,
}

impl RunResult {
    /// Create a new empty run result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task result.
    pub fn add_result(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    /// Add several task results.
    pub fn extend(&mut self, results: impl IntoIterator<Item = TaskResult>) {
        self.tasks.extend(results);
    }

    /// Get the number of successful tasks.
    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, TaskStatus::Success)).count()
    }

    /// Get the number of skipped tasks.
    pub fn skipped_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, TaskStatus::Skipped)).count()
    }

    /// Get the number of failed tasks.
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the overall run succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Result of a particular task, if it ran.
    pub fn get(&self, task: Task) -> Option<&TaskResult> {
        self.tasks.iter().find(|r| r.task == task)
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.tasks.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        let success = self.success_count();
        let skipped = self.skipped_count();
        let failed = self.failed_count();
        let total = self.tasks.len();

        if failed > 0 {
            format!(
                "Run failed: {} succeeded, {} skipped, {} failed (of {} tasks) in {:.2}s",
                success,
                skipped,
                failed,
                total,
                self.total_duration.as_secs_f64()
            )
        } else {
            format!(
                "Run succeeded: {} tasks ({} skipped) in {:.2}s",
                total,
                skipped,
                self.total_duration.as_secs_f64()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status() {
        assert!(TaskStatus::Success.is_success());
        assert!(TaskStatus::Skipped.is_success());
        assert!(!TaskStatus::Failed("error".to_string()).is_success());
        assert!(TaskStatus::Failed("error".to_string()).is_failure());
        assert_eq!(TaskStatus::Failed("boom".to_string()).to_string(), "failed: boom");
    }

    #[test]
    fn test_task_result_constructors() {
        let ok = TaskResult::success(
            Task::CompileScss,
            vec![PathBuf::from("build/css/style.css")],
            Duration::from_millis(12),
        );
        assert!(ok.is_success());
        assert_eq!(ok.outputs.len(), 1);

        let skipped = TaskResult::skipped(Task::Reload, "no preview server running");
        assert!(skipped.is_success());
        assert_eq!(skipped.warnings, vec!["no preview server running"]);

        let failed = TaskResult::failed(Task::CompileJs, "bundler missing".into(), Duration::ZERO);
        assert!(!failed.is_success());
    }

    #[test]
    fn test_run_result_counts_and_summary() {
        let mut run = RunResult::new();
        run.add_result(TaskResult::success(Task::ClearBuildDir, vec![], Duration::ZERO));
        run.add_result(TaskResult::skipped(Task::Reload, "idle"));
        assert!(run.is_success());
        assert!(run.summary().contains("Run succeeded"));

        run.add_result(TaskResult::failed(Task::CompilePug, "oops".into(), Duration::ZERO));
        assert_eq!(run.success_count(), 1);
        assert_eq!(run.skipped_count(), 1);
        assert_eq!(run.failed_count(), 1);
        assert!(!run.is_success());
        assert!(run.summary().contains("1 failed"));
        assert!(run.get(Task::CompilePug).is_some());
        assert!(run.get(Task::Deploy).is_none());
    }
}
