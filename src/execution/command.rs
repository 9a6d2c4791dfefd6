//! Process task implementation.
//!
//! [`ProcessTask`] wraps external executables so they can be submitted to
//! the task runtime. The builder configures the program, arguments,
//! environment variables, and working directory; at launch the script path
//! is appended as the final argument (interpreter style, e.g.
//! `python script.py`), and the runtime redirects the child's standard
//! streams to the task's log file.
//!
//! # Quick Start
//!
//! ```rust
//! use foreman::ProcessTask;
//!
//! // Run the submitted script through an interpreter.
//! let task = ProcessTask::builder("bash").name("nightly_batch").build();
//!
//! // Inline command; the script path lands in $0.
//! let probe = ProcessTask::builder("sh")
//!     .args(["-c", "exit 0"])
//!     .name("probe")
//!     .build();
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;

use crate::core::environment::Environment;
use crate::core::task::{CompletionHook, ProcessFactory, TaskBody, TaskError, TaskRef, UnitTask};

/// The launch description shared with the supervisor.
///
/// Split out of [`ProcessTask`] so the task can hand the factory to the
/// runtime without giving it the hook or the name.
#[derive(Debug)]
struct ProcessLaunch {
    program: String,
    args: Vec<String>,
    environment: Environment,
    working_dir: Option<PathBuf>,
}

impl ProcessFactory for ProcessLaunch {
    fn command(&self, script: &Path, _log_file: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in self.environment.iter() {
            cmd.env(key, value);
        }

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.arg(script);
        cmd
    }
}

/// A task that executes an external command.
///
/// # Example
///
/// ```ignore
/// let task = ProcessTask::builder("python")
///     .name("extract_data")
///     .args(["-m", "etl.extract"])
///     .env("AWS_REGION", "us-east-1")
///     .working_dir("/app")
///     .build();
/// ```
#[derive(Clone)]
pub struct ProcessTask {
    /// Task name (used for identification and logging).
    name: String,
    /// Launch description handed to the supervisor.
    launch: Arc<ProcessLaunch>,
    /// Optional custom post-completion hook.
    hook: Option<CompletionHook>,
}

impl ProcessTask {
    /// Create a new builder for a process task.
    pub fn builder(program: impl Into<String>) -> ProcessTaskBuilder {
        ProcessTaskBuilder::new(program)
    }

    /// Get the program being executed.
    pub fn program(&self) -> &str {
        &self.launch.program
    }

    /// Get the configured arguments (script path not included).
    pub fn args(&self) -> &[String] {
        &self.launch.args
    }

    /// Get the working directory.
    pub fn working_dir(&self) -> Option<&PathBuf> {
        self.launch.working_dir.as_ref()
    }
}

impl UnitTask for ProcessTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn body(&self) -> TaskBody {
        TaskBody::Process(self.launch.clone())
    }

    fn on_complete(&self, exit_code: i32) -> Result<bool, TaskError> {
        match &self.hook {
            Some(hook) => hook(exit_code),
            None => Ok(exit_code == 0),
        }
    }
}

/// Builder for creating [`ProcessTask`] instances.
pub struct ProcessTaskBuilder {
    name: Option<String>,
    program: String,
    args: Vec<String>,
    environment: Environment,
    working_dir: Option<PathBuf>,
    hook: Option<CompletionHook>,
}

impl ProcessTaskBuilder {
    /// Create a new builder with the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            name: None,
            program: program.into(),
            args: Vec::new(),
            environment: Environment::default(),
            working_dir: None,
            hook: None,
        }
    }

    /// Set the task name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set environment variables.
    pub fn environment(mut self, env: Environment) -> Self {
        self.environment = env;
        self
    }

    /// Add a single environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.set(key, value);
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set a custom post-completion hook.
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(i32) -> Result<bool, TaskError> + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Build the [`ProcessTask`].
    pub fn build(self) -> ProcessTask {
        let name = self.name.unwrap_or_else(|| self.program.clone());
        ProcessTask {
            name,
            launch: Arc::new(ProcessLaunch {
                program: self.program,
                args: self.args,
                environment: self.environment,
                working_dir: self.working_dir,
            }),
            hook: self.hook,
        }
    }

    /// Build and return as a shared task handle.
    pub fn build_ref(self) -> TaskRef {
        Arc::new(self.build())
    }
}
