//! Per-task execution state shared between the scheduler and the runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use super::resource::ResourceClaim;
use super::task::TaskRef;
use super::types::TaskId;

/// Lifecycle status of a submitted task.
///
/// `Started` is the only non-terminal status the runtime sets; every other
/// transition is one-way into a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not yet submitted to the runtime.
    Pending,
    /// Supervisor started; body may be running.
    Started,
    /// Command exited 0 and the post-completion hook succeeded.
    Succeeded,
    /// Command exited non-zero, was interrupted, or failed unexpectedly.
    FailedCommand,
    /// Command exited 0 but the post-completion hook reported failure.
    FailedOnComplete,
    /// Submission failed before the supervisor started.
    FailedScheduling,
}

impl TaskStatus {
    /// Check whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded
                | TaskStatus::FailedCommand
                | TaskStatus::FailedOnComplete
                | TaskStatus::FailedScheduling
        )
    }
}

/// Shared handle to a task's execution info.
///
/// The scheduler keeps a clone to observe status and timestamps; only the
/// runtime's orchestrator writes through it.
pub type TaskInfoRef = Arc<RwLock<TaskExecutionInfo>>;

/// The mutable record the runtime maintains for one submitted task.
pub struct TaskExecutionInfo {
    /// Stable identifier, assigned by the scheduler.
    pub id: TaskId,
    /// The authored task.
    pub task: TaskRef,
    /// Pre-computed resource claim, consumed exactly once at submission.
    resources: Option<ResourceClaim>,
    /// Script path handed to the task body.
    pub script: PathBuf,
    /// Log file receiving the child's standard streams.
    pub log_file: PathBuf,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// When the supervisor was started.
    pub start_date: Option<DateTime<Utc>>,
    /// When a terminal status was recorded.
    pub end_date: Option<DateTime<Utc>>,
}

impl TaskExecutionInfo {
    /// Create a pending info record for a task about to be submitted.
    pub fn new(
        id: TaskId,
        task: TaskRef,
        resources: ResourceClaim,
        script: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            task,
            resources: Some(resources),
            script: script.into(),
            log_file: log_file.into(),
            status: TaskStatus::Pending,
            start_date: None,
            end_date: None,
        }
    }

    /// Wrap into the shared handle form the runtime operates on.
    pub fn into_shared(self) -> TaskInfoRef {
        Arc::new(RwLock::new(self))
    }

    /// Take the resource claim out of the record; `None` on every call
    /// after the first.
    pub(crate) fn take_resources(&mut self) -> Option<ResourceClaim> {
        self.resources.take()
    }
}
