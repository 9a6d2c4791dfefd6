//! Function-backed in-runtime task implementation.
//!
//! [`FnTask`] wraps an async closure `(script, log_file) -> exit code` so
//! small units of work can run inside the runtime process without authoring
//! a full [`UnitTask`] implementation.

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::task::{CompletionHook, RuntimeFn, TaskBody, TaskError, TaskRef, UnitTask};

/// Adapter turning a closure into a [`RuntimeFn`].
struct FnBody<F> {
    func: F,
}

#[async_trait]
impl<F, Fut> RuntimeFn for FnBody<F>
where
    F: Fn(PathBuf, PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<i32, TaskError>> + Send + 'static,
{
    async fn call(&self, script: &Path, log_file: &Path) -> Result<i32, TaskError> {
        (self.func)(script.to_path_buf(), log_file.to_path_buf()).await
    }
}

/// An in-runtime task backed by an async closure.
///
/// # Example
///
/// ```rust
/// use foreman::{FnTask, TaskError, UnitTask};
///
/// let task = FnTask::arc("checksum", |script, _log| async move {
///     if script.as_os_str().is_empty() {
///         return Err(TaskError::ExecutionFailed("no script".into()));
///     }
///     Ok::<_, TaskError>(0)
/// });
///
/// assert_eq!(task.name(), "checksum");
/// ```
#[derive(Clone)]
pub struct FnTask {
    /// Stable task name.
    name: String,
    /// Underlying callable.
    func: Arc<dyn RuntimeFn>,
    /// Optional custom post-completion hook.
    hook: Option<CompletionHook>,
}

impl FnTask {
    /// Create a new function-backed task.
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(PathBuf, PathBuf) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<i32, TaskError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(FnBody { func }),
            hook: None,
        }
    }

    /// Create the task and return it as a shared handle.
    pub fn arc<F, Fut>(name: impl Into<String>, func: F) -> TaskRef
    where
        F: Fn(PathBuf, PathBuf) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<i32, TaskError>> + Send + 'static,
    {
        Arc::new(Self::new(name, func))
    }

    /// Set a custom post-completion hook.
    pub fn on_complete<H>(mut self, hook: H) -> Self
    where
        H: Fn(i32) -> Result<bool, TaskError> + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }
}

impl UnitTask for FnTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn body(&self) -> TaskBody {
        TaskBody::InRuntime(self.func.clone())
    }

    fn on_complete(&self, exit_code: i32) -> Result<bool, TaskError> {
        match &self.hook {
            Some(hook) => hook(exit_code),
            None => Ok(exit_code == 0),
        }
    }
}
