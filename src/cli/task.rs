//! Task commands (task, dev, build)

use std::process::ExitCode;
use std::sync::Arc;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::progress::{ProgressEvent, ProgressReporter};
use crate::build::{BuildContext, RunResult, Task, TaskRunner};
use crate::serve::{PreviewServer, ReloadHandle};
use crate::watch::{watch, WatchSession};

fn exit_for(result: &RunResult) -> ExitCode {
    if result.is_success() {
        ExitCode::from(EXIT_SUCCESS)
    } else {
        ExitCode::from(EXIT_ERROR)
    }
}

/// Run the build command
pub fn run_build(ctx: BuildContext, reporter: Arc<dyn ProgressReporter>) -> ExitCode {
    let runner = TaskRunner::new(ctx).with_reporter(reporter);
    let result = runner.build();
    if runner.context().is_verbose() {
        println!("{}", result.summary());
    }
    exit_for(&result)
}

/// Run the task command
pub fn run_task(ctx: BuildContext, task: Task, reporter: Arc<dyn ProgressReporter>) -> ExitCode {
    match task {
        Task::Default => run_dev(ctx, reporter, true),
        Task::Serve => run_dev(ctx, reporter, false),
        task => {
            let runner = TaskRunner::new(ctx).with_reporter(reporter);
            let result = runner.run(task);
            if result.status.is_failure() {
                ExitCode::from(EXIT_ERROR)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            }
        }
    }
}

/// Optionally build, then serve the build directory and watch the sources
/// until interrupted.
fn run_dev(ctx: BuildContext, reporter: Arc<dyn ProgressReporter>, build_first: bool) -> ExitCode {
    let reload = ReloadHandle::new();
    let runner = TaskRunner::new(ctx).with_reporter(reporter).with_reload(reload.clone());

    if build_first {
        // A broken build still gets served so it can be fixed while watching.
        let result = runner.build();
        if !result.is_success() {
            runner.reporter().report(ProgressEvent::Warning {
                task: None,
                message: format!("initial build failed: {}", result.summary()),
            });
        }
    }

    runner.reporter().report(ProgressEvent::TaskStarted { task: Task::Serve.name().to_string() });
    let server = match PreviewServer::start(runner.context(), reload) {
        Ok(server) => server,
        Err(e) => {
            runner.reporter().report(ProgressEvent::Error {
                task: Some(Task::Serve.name().to_string()),
                message: e.to_string(),
            });
            return ExitCode::from(EXIT_ERROR);
        }
    };
    println!("Serving {} at {}", runner.context().build_dir().display(), server.url());
    println!("Press Ctrl+C to stop");

    let mut session = WatchSession::new(runner);
    let outcome = watch(&mut session);
    server.shutdown();

    match outcome {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            session.runner().reporter().report(ProgressEvent::Error { task: None, message: e.to_string() });
            ExitCode::from(EXIT_ERROR)
        }
    }
}
