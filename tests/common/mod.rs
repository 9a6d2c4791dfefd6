//! Common test utilities shared across integration tests.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

use foreman::{
    ResourceClaim, TaskExecutionInfo, TaskId, TaskInfoRef, TaskOutcome, TaskRef, TaskRunner,
};

/// A submitted task plus the scratch directory backing its script and log
/// files. Keep it alive for the duration of the test; the contract says
/// both paths exist before submission.
pub struct TaskFixture {
    _dir: TempDir,
    pub info: TaskInfoRef,
    pub log_file: PathBuf,
}

impl TaskFixture {
    /// Create script and log files and wrap `task` into a shared info.
    pub fn new(id: u64, task: TaskRef, script_body: &str) -> Self {
        let dir = TempDir::new().expect("failed to create scratch dir");
        let script = dir.path().join("script.sh");
        let log_file = dir.path().join("task.log");
        fs::write(&script, script_body).expect("failed to write script");
        fs::write(&log_file, "").expect("failed to create log file");

        let info = TaskExecutionInfo::new(
            TaskId::new(id),
            task,
            ResourceClaim::none(),
            &script,
            &log_file,
        )
        .into_shared();

        Self {
            _dir: dir,
            info,
            log_file,
        }
    }

    pub fn status(&self) -> foreman::TaskStatus {
        self.info.read().unwrap().status
    }

    pub fn log_contents(&self) -> String {
        fs::read_to_string(&self.log_file).expect("failed to read log file")
    }
}

/// Drive `poll` until `expected` tasks have been harvested or ~40 seconds
/// elapse. More reliable than fixed sleeps since execution time can vary.
pub async fn poll_all(
    runner: &mut TaskRunner,
    expected: usize,
    failed_are_completed: bool,
) -> HashMap<TaskId, TaskOutcome> {
    let mut completed = HashMap::new();
    for _ in 0..20 {
        let batch = runner
            .poll(Duration::from_secs(2), failed_are_completed)
            .await
            .expect("poll failed");
        completed.extend(batch);
        if completed.len() >= expected {
            break;
        }
    }
    completed
}
