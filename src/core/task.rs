//! Unit task trait and error types.
//!
//! A [`UnitTask`] is the fundamental unit of work accepted by the runtime:
//! a named body (external process or in-runtime callable) plus a resource
//! application step and a post-completion hook. The scheduler above decides
//! *when* a task runs; the runtime only supervises *how*.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;

use super::resource::ResourceClaim;

/// Errors that can occur while executing a task body or its hook.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The child process could not be launched or waited on.
    #[error("failed to launch process: {0}")]
    Launch(#[from] std::io::Error),

    /// Task execution failed with a message.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The task rejected its resource claim.
    #[error("resource claim rejected: {0}")]
    ResourceRejected(String),

    /// The task was interrupted by an operator cancel before completion.
    #[error("interrupted before completion")]
    Interrupted,

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Shared handle to a unit task.
pub type TaskRef = Arc<dyn UnitTask>;

/// A task-authored post-completion hook: exit code in, overall success out.
pub type CompletionHook = Arc<dyn Fn(i32) -> Result<bool, TaskError> + Send + Sync>;

/// Builds the OS process launch description for a process task.
pub trait ProcessFactory: Send + Sync {
    /// Build the launch command for `script`, with standard streams
    /// destined for `log_file`. The runtime performs the redirection and
    /// owns the child's lifecycle; implementations only describe the
    /// program, arguments, environment, and working directory.
    fn command(&self, script: &Path, log_file: &Path) -> Command;
}

/// The callable body of an in-runtime task.
///
/// `script` and `log_file` are advisory arguments; the callable is free to
/// ignore them. The returned integer follows the process exit code
/// convention (0 = success).
#[async_trait]
pub trait RuntimeFn: Send + Sync {
    async fn call(&self, script: &Path, log_file: &Path) -> Result<i32, TaskError>;
}

/// How a unit task's body runs.
#[derive(Clone)]
pub enum TaskBody {
    /// External OS process, described by a factory.
    Process(Arc<dyn ProcessFactory>),
    /// Callable executed inside this process.
    InRuntime(Arc<dyn RuntimeFn>),
}

/// The core trait for work runnable by the task runtime.
///
/// Both flavors the runtime distinguishes (process and in-runtime) are
/// expressed through [`UnitTask::body`], so a submitted task is a runnable
/// task by construction.
///
/// # Example
///
/// ```ignore
/// use foreman::{ResourceClaim, TaskBody, TaskError, UnitTask};
///
/// struct Compile {
///     launch: std::sync::Arc<dyn foreman::ProcessFactory>,
/// }
///
/// impl UnitTask for Compile {
///     fn name(&self) -> &str {
///         "compile"
///     }
///
///     fn body(&self) -> TaskBody {
///         TaskBody::Process(self.launch.clone())
///     }
///
///     fn on_complete(&self, exit_code: i32) -> Result<bool, TaskError> {
///         // Treat "nothing to do" (exit 2) as success too.
///         Ok(exit_code == 0 || exit_code == 2)
///     }
/// }
/// ```
pub trait UnitTask: Send + Sync {
    /// Returns the stable, human-readable task name.
    fn name(&self) -> &str;

    /// Consume the pre-computed resource claim.
    ///
    /// Called exactly once, immediately before the task's supervisor is
    /// started. The default implementation accepts any claim.
    fn apply_resources(&self, claim: ResourceClaim) -> Result<(), TaskError> {
        let _ = claim;
        Ok(())
    }

    /// Returns how this task's body runs.
    fn body(&self) -> TaskBody;

    /// Post-completion hook mapping the observed exit code to overall
    /// success. Runs after the body has finished, on every path except
    /// simulation. A hook failure is reported downstream as a hook
    /// failure, not a command failure.
    fn on_complete(&self, exit_code: i32) -> Result<bool, TaskError> {
        Ok(exit_code == 0)
    }
}
