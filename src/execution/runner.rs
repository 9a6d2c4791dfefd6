//! The task runner: registry, lifecycle, and join protocol over
//! supervisors.
//!
//! The runner owns one registry record per live task (worker handle,
//! supervisor record, shared info, cancellation handles) with single-owner
//! discipline: `submit`, `poll`, and `cancel` are called from one
//! orchestrator task, and workers never touch the registry. Completions
//! flow back over an event feed — each worker sends its id as its final
//! act — so a poll sweep costs one bounded wait plus a drain instead of a
//! bounded join per live task.
//!
//! ## Lifecycle
//! ```text
//! submit(info) ──► apply resources ──► pick supervisor body
//!                     │                   (simulate → NoOp)
//!                     ▼
//!              status = Started ──► spawn worker ──► register
//!
//! poll(timeout) ──► wait for first completion ──► drain feed
//!                     └─► per task: read record, derive terminal status,
//!                         stamp info, deregister, report outcome
//!
//! cancel(id) ──► 1 ms voluntary window ──► fire token ──► 100 ms wait
//!                     └─► status = FailedCommand (operator intent)
//! ```

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::core::info::{TaskInfoRef, TaskStatus};
use crate::core::task::{TaskBody, TaskError};
use crate::core::types::TaskId;

use super::supervisor::{RecordRef, SupervisorBody, SupervisorWorker};

/// Sweep timeout the scheduler uses when it has no reason to pick another.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Window granted for voluntary completion before a cancel interrupts.
const CANCEL_GRACE: Duration = Duration::from_millis(1);

/// How long a cancel waits for the worker to wind down after interruption.
const CANCEL_WAIT: Duration = Duration::from_millis(100);

/// Errors raised by the runner itself.
///
/// `MissingCompletionWitness` and `SupervisorPanicked` signal a bug in the
/// runtime or the scheduler above; they are not recovered.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A live task with the same id is already registered.
    #[error("task {id} is already registered with the runner")]
    AlreadyRegistered { id: TaskId },

    /// Submission failed before the supervisor started.
    #[error("task {id} could not be scheduled")]
    Scheduling {
        id: TaskId,
        #[source]
        source: TaskError,
    },

    /// A worker finished without its post-completion hook having run.
    #[error("task {id} finished without recording a completion result")]
    MissingCompletionWitness { id: TaskId },

    /// A worker panicked instead of recording its outcome.
    #[error("supervisor for task {id} panicked")]
    SupervisorPanicked { id: TaskId },
}

/// Outcome reported for one harvested task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Observed or synthesized exit code.
    pub exit_code: i32,
    /// What the post-completion hook returned.
    pub on_complete_successful: bool,
}

impl TaskOutcome {
    /// Command exited 0 and the hook agreed.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.on_complete_successful
    }
}

/// Registry record for one live task.
struct RunningTask {
    /// Handle to the spawned supervisor worker.
    join: JoinHandle<()>,
    /// Record the worker writes its outcome into.
    record: RecordRef,
    /// Execution info shared with the scheduler.
    info: TaskInfoRef,
    /// Cooperative interruption signal for the worker.
    cancel: CancellationToken,
    /// Latch the worker fires as its body and hook finish.
    done: CancellationToken,
}

/// Supervises the execution of resource-admitted tasks.
pub struct TaskRunner {
    /// One record per live task.
    tasks: HashMap<TaskId, RunningTask>,
    /// Sender handed to every worker.
    completion_tx: mpsc::UnboundedSender<TaskId>,
    /// Feed of finished worker ids consumed by `poll`.
    completion_rx: mpsc::UnboundedReceiver<TaskId>,
}

impl TaskRunner {
    /// Create an empty runner.
    pub fn new() -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            tasks: HashMap::new(),
            completion_tx,
            completion_rx,
        }
    }

    /// Submit a task for execution.
    ///
    /// Applies the info's resource claim to the task, starts the matching
    /// supervisor variant (the no-op variant when `simulate` is set,
    /// regardless of flavor), and registers the task. On success the info
    /// is `Started` with `start_date` stamped and `true` is returned.
    ///
    /// Any failure before the worker starts leaves the registry untouched,
    /// marks the info `FailedScheduling`, logs, and returns `false`.
    pub fn submit(&mut self, info: &TaskInfoRef, simulate: bool) -> bool {
        match self.try_submit(info, simulate) {
            Ok(()) => true,
            Err(err) => {
                let mut guard = info.write().expect("info lock poisoned");
                error!(task = %guard.task.name(), id = %guard.id, error = %err,
                    "task could not be scheduled");
                // A duplicate submission must not clobber the live task's
                // status; only a still-pending info takes the failure.
                if guard.status == TaskStatus::Pending {
                    guard.status = TaskStatus::FailedScheduling;
                }
                false
            }
        }
    }

    fn try_submit(&mut self, info: &TaskInfoRef, simulate: bool) -> Result<(), RunnerError> {
        let mut guard = info.write().expect("info lock poisoned");
        let id = guard.id;

        if self.tasks.contains_key(&id) {
            return Err(RunnerError::AlreadyRegistered { id });
        }

        // Resources are applied exactly once, before the worker starts.
        if let Some(claim) = guard.take_resources() {
            guard
                .task
                .apply_resources(claim)
                .map_err(|source| RunnerError::Scheduling { id, source })?;
        }

        let body = if simulate {
            SupervisorBody::NoOp
        } else {
            match guard.task.body() {
                TaskBody::Process(factory) => SupervisorBody::Process(factory),
                TaskBody::InRuntime(func) => SupervisorBody::InRuntime(func),
            }
        };
        let record = body.new_record();
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();

        // Stamped before the worker exists, so no body effect can be
        // observed ahead of the Started transition.
        guard.status = TaskStatus::Started;
        guard.start_date = Some(Utc::now());

        let worker = SupervisorWorker {
            id,
            task: guard.task.clone(),
            body,
            script: guard.script.clone(),
            log_file: guard.log_file.clone(),
            record: record.clone(),
            cancel: cancel.clone(),
            done: done.clone(),
            completions: self.completion_tx.clone(),
        };
        drop(guard);

        debug!(id = %id, simulate, "starting supervisor");
        let join = tokio::spawn(worker.run());
        self.tasks.insert(
            id,
            RunningTask {
                join,
                record,
                info: info.clone(),
                cancel,
                done,
            },
        );
        Ok(())
    }

    /// Harvest tasks that have finished since the last sweep.
    ///
    /// Waits up to `wait` for the first completion, then drains whatever
    /// else has already finished — tasks still live stay registered for a
    /// later sweep. For each harvested task the terminal status is derived
    /// as: `Succeeded` if the command exited 0 and the hook agreed (or
    /// `failed_are_completed` is set), otherwise `FailedCommand` for a
    /// non-zero exit, otherwise `FailedOnComplete`.
    pub async fn poll(
        &mut self,
        wait: Duration,
        failed_are_completed: bool,
    ) -> Result<HashMap<TaskId, TaskOutcome>, RunnerError> {
        let mut completed = HashMap::new();

        if self.tasks.is_empty() {
            return Ok(completed);
        }

        let mut finished = Vec::new();
        match timeout(wait, self.completion_rx.recv()).await {
            Ok(Some(id)) => finished.push(id),
            // Closed is unreachable (we hold a sender); Err is the
            // bounded wait elapsing with nothing to harvest.
            Ok(None) | Err(_) => return Ok(completed),
        }
        while let Ok(id) = self.completion_rx.try_recv() {
            finished.push(id);
        }

        for id in finished {
            let Some(entry) = self.tasks.remove(&id) else {
                continue;
            };
            let outcome = Self::harvest(id, entry, failed_are_completed).await?;
            completed.insert(id, outcome);
        }

        Ok(completed)
    }

    /// Complete the bookkeeping for one finished worker.
    async fn harvest(
        id: TaskId,
        entry: RunningTask,
        failed_are_completed: bool,
    ) -> Result<TaskOutcome, RunnerError> {
        // The completion event was the worker's final act; this join is
        // immediate.
        entry
            .join
            .await
            .map_err(|_| RunnerError::SupervisorPanicked { id })?;

        let (exit_code, witness, err) = {
            let mut record = entry.record.lock().expect("supervisor record poisoned");
            (
                record.exit_code,
                record.on_complete_successful,
                record.error.take(),
            )
        };
        let on_complete_successful =
            witness.ok_or(RunnerError::MissingCompletionWitness { id })?;

        let status = if (exit_code == 0 && on_complete_successful) || failed_are_completed {
            TaskStatus::Succeeded
        } else if exit_code != 0 {
            TaskStatus::FailedCommand
        } else {
            TaskStatus::FailedOnComplete
        };

        let mut guard = entry.info.write().expect("info lock poisoned");
        // A cancel may already have recorded the terminal state.
        if !guard.status.is_terminal() {
            guard.status = status;
            guard.end_date = Some(Utc::now());
        }
        if let Some(err) = err {
            error!(task = %guard.task.name(), id = %id, error = %err, "task failed");
        }
        debug!(id = %id, exit_code, on_complete_successful, status = ?guard.status,
            "harvested task");

        Ok(TaskOutcome {
            exit_code,
            on_complete_successful,
        })
    }

    /// Snapshot of currently registered task ids. No ordering guarantee.
    pub fn running_ids(&self) -> HashSet<TaskId> {
        self.tasks.keys().copied().collect()
    }

    /// Attempt to terminate a single live task.
    ///
    /// Grants a 1 ms window for voluntary completion, then fires the
    /// task's cancellation token and waits up to 100 ms for the worker to
    /// wind down. The info is marked `FailedCommand` either way — status
    /// reflects operator intent, not observed liveness. Returns `true` iff
    /// the worker is no longer alive; callers needing a stronger guarantee
    /// must poll for the terminal status instead of trusting the boolean.
    ///
    /// The task stays registered; the next `poll` harvests it through the
    /// single removal path.
    pub async fn cancel(&self, id: TaskId) -> bool {
        let Some(entry) = self.tasks.get(&id) else {
            return false;
        };

        if timeout(CANCEL_GRACE, entry.done.cancelled()).await.is_err() {
            entry.cancel.cancel();
            let _ = timeout(CANCEL_WAIT, entry.done.cancelled()).await;
        }

        {
            let mut guard = entry.info.write().expect("info lock poisoned");
            if !guard.status.is_terminal() {
                guard.status = TaskStatus::FailedCommand;
                guard.end_date = Some(Utc::now());
                debug!(task = %guard.task.name(), id = %id, "task cancelled");
            }
        }

        entry.done.is_cancelled()
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}
