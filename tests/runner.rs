//! End-to-end tests for the task runner.
//!
//! These drive real `sh` child processes through the full
//! submit → poll → harvest path, plus cancellation and simulation.

mod common;

use common::{poll_all, TaskFixture};
use foreman::{FnTask, ProcessTask, TaskError, TaskId, TaskOutcome, TaskRunner, TaskStatus};

#[tokio::test]
async fn happy_process_succeeds() {
    let mut runner = TaskRunner::new();
    let task = ProcessTask::builder("sh")
        .name("happy")
        .args(["-c", "exit 0"])
        .build_ref();
    let fixture = TaskFixture::new(1, task, "");

    assert!(runner.submit(&fixture.info, false));
    let completed = poll_all(&mut runner, 1, false).await;

    assert_eq!(
        completed.get(&TaskId::new(1)),
        Some(&TaskOutcome {
            exit_code: 0,
            on_complete_successful: true
        })
    );
    assert_eq!(fixture.status(), TaskStatus::Succeeded);
    assert!(runner.running_ids().is_empty());

    let guard = fixture.info.read().unwrap();
    assert!(guard.end_date.unwrap() >= guard.start_date.unwrap());
}

#[tokio::test]
async fn failing_command_is_reported_with_its_exit_code() {
    let mut runner = TaskRunner::new();
    let task = ProcessTask::builder("sh")
        .name("exit7")
        .args(["-c", "exit 7"])
        .build_ref();
    let fixture = TaskFixture::new(1, task, "");

    runner.submit(&fixture.info, false);
    let completed = poll_all(&mut runner, 1, false).await;

    assert_eq!(
        completed.get(&TaskId::new(1)),
        Some(&TaskOutcome {
            exit_code: 7,
            on_complete_successful: false
        })
    );
    assert_eq!(fixture.status(), TaskStatus::FailedCommand);
}

#[tokio::test]
async fn hook_failure_on_clean_exit() {
    let mut runner = TaskRunner::new();
    let task = ProcessTask::builder("sh")
        .name("unhappy_hook")
        .args(["-c", "exit 0"])
        .on_complete(|_| Ok(false))
        .build_ref();
    let fixture = TaskFixture::new(1, task, "");

    runner.submit(&fixture.info, false);
    let completed = poll_all(&mut runner, 1, false).await;

    assert_eq!(
        completed.get(&TaskId::new(1)),
        Some(&TaskOutcome {
            exit_code: 0,
            on_complete_successful: false
        })
    );
    assert_eq!(fixture.status(), TaskStatus::FailedOnComplete);
}

#[tokio::test]
async fn in_runtime_failure_synthesizes_exit_one() {
    let mut runner = TaskRunner::new();
    // The custom hook accepts the synthesized code, so the command failure
    // is still what decides the status.
    let task = FnTask::new("flaky", |_script, _log| async {
        Err(TaskError::ExecutionFailed("upstream unavailable".into()))
    })
    .on_complete(|code| Ok(code == 1));
    let fixture = TaskFixture::new(1, std::sync::Arc::new(task), "");

    runner.submit(&fixture.info, false);
    let completed = poll_all(&mut runner, 1, false).await;

    assert_eq!(
        completed.get(&TaskId::new(1)),
        Some(&TaskOutcome {
            exit_code: 1,
            on_complete_successful: true
        })
    );
    assert_eq!(fixture.status(), TaskStatus::FailedCommand);
}

#[tokio::test]
async fn simulate_substitutes_a_noop_run() {
    let mut runner = TaskRunner::new();
    // Would sleep for a minute if the body were actually launched.
    let task = ProcessTask::builder("sh")
        .name("dry_run")
        .args(["-c", "sleep 60"])
        .build_ref();
    let fixture = TaskFixture::new(1, task, "");

    assert!(runner.submit(&fixture.info, true));
    let completed = poll_all(&mut runner, 1, false).await;

    assert_eq!(
        completed.get(&TaskId::new(1)),
        Some(&TaskOutcome {
            exit_code: 0,
            on_complete_successful: true
        })
    );
    assert_eq!(fixture.status(), TaskStatus::Succeeded);
    assert_eq!(fixture.log_contents(), "");
}

#[tokio::test]
async fn cancel_kills_a_running_process() {
    let mut runner = TaskRunner::new();
    let task = ProcessTask::builder("sh")
        .name("long_sleep")
        .args(["-c", "sleep 60"])
        .build_ref();
    let fixture = TaskFixture::new(1, task, "");

    runner.submit(&fixture.info, false);
    assert!(runner.cancel(TaskId::new(1)).await);
    assert_eq!(fixture.status(), TaskStatus::FailedCommand);

    // The entry survives until the normal sweep harvests it.
    assert!(runner.running_ids().contains(&TaskId::new(1)));
    let completed = poll_all(&mut runner, 1, false).await;

    assert_eq!(
        completed.get(&TaskId::new(1)),
        Some(&TaskOutcome {
            exit_code: 1,
            on_complete_successful: false
        })
    );
    assert_eq!(fixture.status(), TaskStatus::FailedCommand);
    assert!(runner.running_ids().is_empty());
    assert!(!runner.cancel(TaskId::new(1)).await);
}

#[tokio::test]
async fn failed_are_completed_flips_status_but_not_outcome() {
    let mut runner = TaskRunner::new();
    let task = ProcessTask::builder("sh")
        .name("exit7_forgiven")
        .args(["-c", "exit 7"])
        .build_ref();
    let fixture = TaskFixture::new(1, task, "");

    runner.submit(&fixture.info, false);
    let completed = poll_all(&mut runner, 1, true).await;

    assert_eq!(
        completed.get(&TaskId::new(1)),
        Some(&TaskOutcome {
            exit_code: 7,
            on_complete_successful: false
        })
    );
    assert_eq!(fixture.status(), TaskStatus::Succeeded);
}

#[tokio::test]
async fn child_output_is_redirected_to_the_log_file() {
    let mut runner = TaskRunner::new();
    let task = ProcessTask::builder("sh")
        .name("chatty")
        .args(["-c", "echo out_line; echo err_line >&2"])
        .build_ref();
    let fixture = TaskFixture::new(1, task, "");

    runner.submit(&fixture.info, false);
    poll_all(&mut runner, 1, false).await;

    let log = fixture.log_contents();
    assert!(log.contains("out_line"));
    assert!(log.contains("err_line"));
}

#[tokio::test]
async fn script_path_is_handed_to_the_program() {
    let mut runner = TaskRunner::new();
    // No args: the command becomes `sh <script>`.
    let task = ProcessTask::builder("sh").name("scripted").build_ref();
    let fixture = TaskFixture::new(1, task, "echo from_script\nexit 5\n");

    runner.submit(&fixture.info, false);
    let completed = poll_all(&mut runner, 1, false).await;

    assert_eq!(
        completed.get(&TaskId::new(1)),
        Some(&TaskOutcome {
            exit_code: 5,
            on_complete_successful: false
        })
    );
    assert!(fixture.log_contents().contains("from_script"));
}

#[tokio::test]
async fn environment_variables_reach_the_child() {
    let mut runner = TaskRunner::new();
    let task = ProcessTask::builder("sh")
        .name("env_probe")
        .args(["-c", "exit $PROBE_CODE"])
        .env("PROBE_CODE", "3")
        .build_ref();
    let fixture = TaskFixture::new(1, task, "");

    runner.submit(&fixture.info, false);
    let completed = poll_all(&mut runner, 1, false).await;

    assert_eq!(
        completed.get(&TaskId::new(1)),
        Some(&TaskOutcome {
            exit_code: 3,
            on_complete_successful: false
        })
    );
}

#[tokio::test]
async fn mixed_batch_harvests_everything() {
    let mut runner = TaskRunner::new();
    let ok = ProcessTask::builder("sh")
        .name("ok")
        .args(["-c", "exit 0"])
        .build_ref();
    let bad = ProcessTask::builder("sh")
        .name("bad")
        .args(["-c", "exit 2"])
        .build_ref();
    let fn_ok = FnTask::arc("fn_ok", |_s, _l| async { Ok(0) });

    let fixtures = [
        TaskFixture::new(1, ok, ""),
        TaskFixture::new(2, bad, ""),
        TaskFixture::new(3, fn_ok, ""),
    ];
    for fixture in &fixtures {
        assert!(runner.submit(&fixture.info, false));
    }

    let completed = poll_all(&mut runner, 3, false).await;

    assert_eq!(completed.len(), 3);
    assert_eq!(fixtures[0].status(), TaskStatus::Succeeded);
    assert_eq!(fixtures[1].status(), TaskStatus::FailedCommand);
    assert_eq!(fixtures[2].status(), TaskStatus::Succeeded);
    assert!(runner.running_ids().is_empty());
}
