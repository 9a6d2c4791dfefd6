//! Supervisor workers wrapping one task execution each.
//!
//! A supervisor is a short-lived spawned worker whose body runs to
//! completion and whose record is read by the runner only after the worker
//! has signalled completion. Three bodies share the record shape:
//!
//! - **Process**: spawns the task's launch command with standard streams
//!   redirected to the log file, waits for exit, kills the child on
//!   cancellation.
//! - **InRuntime**: awaits the task's callable; cancellation drops the
//!   pending call.
//! - **NoOp**: empty body for simulation; its record is preset so the task
//!   appears complete and successful even if observed immediately.
//!
//! On every path except simulation the worker runs the task's
//! post-completion hook after the body finishes and stores the boolean in
//! `on_complete_successful`; the presence of that value is the completion
//! witness the runner relies on. The worker's final acts are firing the
//! done-latch and sending its id on the completion feed.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::task::{ProcessFactory, RuntimeFn, TaskError, TaskRef};
use crate::core::types::TaskId;

/// Sentinel exit code meaning "not yet observed".
pub(crate) const EXIT_CODE_UNSET: i32 = -1;

/// Exit code recorded when the runtime must synthesize a failure
/// (interruption, unexpected worker error).
pub(crate) const SYNTHETIC_FAILURE_EXIT: i32 = 1;

/// Per-task record written by the worker, read by the runner after the
/// worker is observed dead.
pub(crate) struct SupervisorRecord {
    /// Observed or synthesized exit code.
    pub exit_code: i32,
    /// Result of the post-completion hook; present iff the body has
    /// returned and the hook has run.
    pub on_complete_successful: Option<bool>,
    /// Captured body or hook failure, if any.
    pub error: Option<TaskError>,
}

impl SupervisorRecord {
    fn unset() -> Self {
        Self {
            exit_code: EXIT_CODE_UNSET,
            on_complete_successful: None,
            error: None,
        }
    }

    fn simulated() -> Self {
        Self {
            exit_code: 0,
            on_complete_successful: Some(true),
            error: None,
        }
    }
}

/// Shared handle to a supervisor record.
pub(crate) type RecordRef = Arc<Mutex<SupervisorRecord>>;

/// The body variant a supervisor runs.
pub(crate) enum SupervisorBody {
    /// External OS process described by the task's factory.
    Process(Arc<dyn ProcessFactory>),
    /// Callable executed inside this process.
    InRuntime(Arc<dyn RuntimeFn>),
    /// Empty body for simulation/dry-run.
    NoOp,
}

impl SupervisorBody {
    /// Create the record this body starts from. The no-op body presets a
    /// successful completion so it appears finished from the first
    /// observation.
    pub(crate) fn new_record(&self) -> RecordRef {
        let record = match self {
            SupervisorBody::NoOp => SupervisorRecord::simulated(),
            _ => SupervisorRecord::unset(),
        };
        Arc::new(Mutex::new(record))
    }
}

/// One task's supervisor: the worker state moved into the spawned body.
pub(crate) struct SupervisorWorker {
    pub id: TaskId,
    pub task: TaskRef,
    pub body: SupervisorBody,
    pub script: PathBuf,
    pub log_file: PathBuf,
    pub record: RecordRef,
    pub cancel: CancellationToken,
    pub done: CancellationToken,
    pub completions: mpsc::UnboundedSender<TaskId>,
}

impl SupervisorWorker {
    /// Run the body to completion, record its outcome, run the hook, and
    /// signal completion. Never panics on task failure; every failure path
    /// lands in the record.
    pub(crate) async fn run(self) {
        let outcome = match &self.body {
            SupervisorBody::NoOp => None,
            SupervisorBody::Process(factory) => Some(
                run_process(factory.as_ref(), &self.script, &self.log_file, &self.cancel).await,
            ),
            SupervisorBody::InRuntime(func) => Some(
                run_in_runtime(func.as_ref(), &self.script, &self.log_file, &self.cancel).await,
            ),
        };

        if let Some(outcome) = outcome {
            let exit_code = {
                let mut record = self.record.lock().expect("supervisor record poisoned");
                match outcome {
                    Ok(code) => record.exit_code = code,
                    Err(err) => {
                        record.exit_code = SYNTHETIC_FAILURE_EXIT;
                        record.error = Some(err);
                    }
                }
                record.exit_code
            };

            // The hook is the task's own computation; its failure counts
            // against the hook, not the command.
            let hook_result = self.task.on_complete(exit_code);
            let mut record = self.record.lock().expect("supervisor record poisoned");
            match hook_result {
                Ok(succeeded) => record.on_complete_successful = Some(succeeded),
                Err(err) => {
                    record.on_complete_successful = Some(false);
                    record.error.get_or_insert(err);
                }
            }
        }

        self.done.cancel();
        let _ = self.completions.send(self.id);
    }
}

/// Spawn the task's command with streams redirected to the log file and
/// wait for it to exit.
async fn run_process(
    factory: &dyn ProcessFactory,
    script: &Path,
    log_file: &Path,
    cancel: &CancellationToken,
) -> Result<i32, TaskError> {
    let mut command = factory.command(script, log_file);

    // The log file is caller-supplied and already exists; append both
    // streams to it.
    let log = OpenOptions::new().append(true).open(log_file)?;
    let log_err = log.try_clone()?;
    command.stdout(Stdio::from(log)).stderr(Stdio::from(log_err));
    command.kill_on_drop(true);

    let mut child = command.spawn()?;

    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };

    match waited {
        // A child killed by a signal carries no exit code.
        Some(status) => Ok(status?.code().unwrap_or(EXIT_CODE_UNSET)),
        None => {
            // Kill escalation: SIGKILL, then reap. kill_on_drop backstops
            // an aborted worker.
            let _ = child.start_kill();
            let _ = child.wait().await;
            Err(TaskError::Interrupted)
        }
    }
}

/// Await the task's callable; cancellation drops the pending call.
async fn run_in_runtime(
    func: &dyn RuntimeFn,
    script: &Path,
    log_file: &Path,
    cancel: &CancellationToken,
) -> Result<i32, TaskError> {
    tokio::select! {
        result = func.call(script, log_file) => result,
        _ = cancel.cancelled() => Err(TaskError::Interrupted),
    }
}
