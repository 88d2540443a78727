//! Named tasks.

use clap::ValueEnum;

use super::compile::CompileTarget;
use crate::aggregate::AggregatorKind;

/// A task addressable by name from `bsm task <NAME>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum Task {
    /// Regenerate `mixins.pug`
    #[value(name = "makePugMixinsFile")]
    MakePugMixinsFile,
    /// Regenerate `blocks.scss`
    #[value(name = "makeScssBlocksFile")]
    MakeScssBlocksFile,
    /// Regenerate `entry.js`
    #[value(name = "makeJsEntryFile")]
    MakeJsEntryFile,
    /// Compile pages to HTML
    #[value(name = "compilePug")]
    CompilePug,
    /// Compile and autoprefix the stylesheet
    #[value(name = "compileScss")]
    CompileScss,
    /// Bundle the script entry
    #[value(name = "compileJs")]
    CompileJs,
    /// Optimize images into the build directory
    #[value(name = "minifyImg")]
    MinifyImg,
    /// Empty the build directory
    #[value(name = "clearBuildDir")]
    ClearBuildDir,
    /// Publish the build directory to a git branch
    #[value(name = "deploy")]
    Deploy,
    /// Tell connected browsers to reload
    #[value(name = "reload")]
    Reload,
    /// Preview server plus watch loop
    #[value(name = "serve")]
    Serve,
    /// Full pipeline, then serve
    #[value(name = "default")]
    Default,
}

impl Task {
    /// Every task, in declaration order.
    pub const ALL: [Task; 12] = [
        Task::MakePugMixinsFile,
        Task::MakeScssBlocksFile,
        Task::MakeJsEntryFile,
        Task::CompilePug,
        Task::CompileScss,
        Task::CompileJs,
        Task::MinifyImg,
        Task::ClearBuildDir,
        Task::Deploy,
        Task::Reload,
        Task::Serve,
        Task::Default,
    ];

    /// Public task name.
    pub fn name(self) -> &'static str {
        match self {
            Task::MakePugMixinsFile => "makePugMixinsFile",
            Task::MakeScssBlocksFile => "makeScssBlocksFile",
            Task::MakeJsEntryFile => "makeJsEntryFile",
            Task::CompilePug => "compilePug",
            Task::CompileScss => "compileScss",
            Task::CompileJs => "compileJs",
            Task::MinifyImg => "minifyImg",
            Task::ClearBuildDir => "clearBuildDir",
            Task::Deploy => "deploy",
            Task::Reload => "reload",
            Task::Serve => "serve",
            Task::Default => "default",
        }
    }

    /// Look a task up by its public name.
    pub fn from_name(name: &str) -> Option<Task> {
        Task::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Task that regenerates the aggregator of `kind`.
    pub fn regenerate(kind: AggregatorKind) -> Task {
        match kind {
            AggregatorKind::PugMixins => Task::MakePugMixinsFile,
            AggregatorKind::ScssImports => Task::MakeScssBlocksFile,
            AggregatorKind::JsEntry => Task::MakeJsEntryFile,
        }
    }

    /// Task that compiles `target`.
    pub fn compile(target: CompileTarget) -> Task {
        match target {
            CompileTarget::Pug => Task::CompilePug,
            CompileTarget::Scss => Task::CompileScss,
            CompileTarget::Js => Task::CompileJs,
        }
    }

    /// Whether the task runs until interrupted.
    pub fn is_long_running(self) -> bool {
        matches!(self, Task::Serve | Task::Default)
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_lookup() {
        for task in Task::ALL {
            assert_eq!(Task::from_name(task.name()), Some(task));
        }
        assert_eq!(Task::from_name("compilejs"), None);
    }

    #[test]
    fn test_value_enum_uses_public_names() {
        let parsed = Task::from_str("makeScssBlocksFile", false).unwrap();
        assert_eq!(parsed, Task::MakeScssBlocksFile);
        assert!(Task::from_str("make-scss-blocks-file", false).is_err());
    }

    #[test]
    fn test_regenerate_and_compile_lookup() {
        assert_eq!(Task::regenerate(AggregatorKind::ScssImports), Task::MakeScssBlocksFile);
        assert_eq!(Task::compile(CompileTarget::Js), Task::CompileJs);
    }

    #[test]
    fn test_long_running() {
        assert!(Task::Serve.is_long_running());
        assert!(Task::Default.is_long_running());
        assert!(!Task::Reload.is_long_running());
    }
}
