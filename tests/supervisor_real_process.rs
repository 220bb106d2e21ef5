#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use scriptrun::engine::{RunState, SupervisorEvent, spawn_process_supervisor};
use scriptrun::task::{LaunchRequest, TaskDescriptor};
use scriptrun_test_utils::builders::{FieldBuilder, TaskBuilder};
use scriptrun_test_utils::{collect_until_terminal, init_tracing, output_lines, progress_values, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn sh(script: &str) -> LaunchRequest {
    LaunchRequest::new("sh", "/bin/sh", vec!["-c".into(), script.into()])
}

#[tokio::test]
async fn merges_stdout_and_stderr_and_reports_exit_code() -> TestResult {
    init_tracing();
    let (handle, mut events) = spawn_process_supervisor();

    handle
        .start(sh("printf 'PROGRESS 10\\nhello\\n'; echo oops >&2; exit 3"))
        .await?;
    let seen = with_timeout(collect_until_terminal(&mut events)).await;

    let lines = output_lines(&seen);
    assert!(lines.contains(&"hello".to_string()), "{lines:?}");
    assert!(lines.contains(&"oops".to_string()), "{lines:?}");
    assert_eq!(progress_values(&seen), vec![10, 100]);
    assert_eq!(
        seen.last(),
        Some(&SupervisorEvent::StateChanged(RunState::Finished(3)))
    );

    let snapshot = handle.snapshot().await?;
    assert!(snapshot.pid.is_some());
    assert!(snapshot.output_text().contains("hello\n"));
    Ok(())
}

#[tokio::test]
async fn cancel_hard_kills_a_sleeping_process() -> TestResult {
    init_tracing();
    let (handle, mut events) = spawn_process_supervisor();

    handle.start(sh("echo started; sleep 30; echo never")).await?;
    with_timeout(async {
        while let Some(event) = events.recv().await {
            if event == SupervisorEvent::OutputLine("started".into()) {
                break;
            }
        }
    })
    .await;

    assert!(handle.cancel().await?);
    assert_eq!(with_timeout(handle.wait_terminal()).await?, RunState::Cancelled);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let mut rest = Vec::new();
    while let Ok(event) = events.try_recv() {
        rest.push(event);
    }
    assert_eq!(rest, vec![SupervisorEvent::StateChanged(RunState::Cancelled)]);
    Ok(())
}

#[tokio::test]
async fn missing_program_is_errored_with_os_cause() -> TestResult {
    init_tracing();
    let (handle, mut events) = spawn_process_supervisor();

    handle
        .start(LaunchRequest::new("missing", "/nonexistent/scriptrun-missing", vec![]))
        .await?;
    let seen = with_timeout(collect_until_terminal(&mut events)).await;

    match seen.last() {
        Some(SupervisorEvent::StateChanged(RunState::Errored(reason))) => {
            assert!(reason.contains("failed to launch"), "{reason}");
            assert!(reason.contains("scriptrun-missing"), "{reason}");
        }
        other => panic!("expected Errored, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn signal_termination_is_errored() -> TestResult {
    init_tracing();
    let (handle, mut events) = spawn_process_supervisor();

    handle.start(sh("kill -9 $$")).await?;
    let seen = with_timeout(collect_until_terminal(&mut events)).await;

    match seen.last() {
        Some(SupervisorEvent::StateChanged(RunState::Errored(reason))) => {
            assert!(reason.contains("signal 9"), "{reason}");
        }
        other => panic!("expected Errored, got {other:?}"),
    }
    Ok(())
}

const ADDER: &str = r#"
log=""; a=""; b=""
while [ $# -gt 0 ]; do
  case "$1" in
    --log) log="$2"; shift 2 ;;
    --a) a="$2"; shift 2 ;;
    --b) b="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "PROGRESS 50"
echo "$((a + b))" >> "$log"
echo "sum $((a + b))"
"#;

#[tokio::test]
async fn task_descriptor_drives_a_real_script() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let script = dir.path().join("add.sh");
    fs::write(&script, ADDER)?;
    let log = dir.path().join("out.log");

    let task = TaskBuilder::new("Add numbers", script.to_str().ok_or("utf-8 path")?)
        .interpreter("/bin/sh")
        .field(FieldBuilder::int("--a").label("a").required())
        .field(FieldBuilder::int("--b").label("b").required())
        .extra_arg("--mode")
        .extra_arg("gui")
        .build();
    let mut form = task.form();
    form.set_value("--a", "3")?;
    form.set_value("b", "4.9")?;

    let request = task.launch_request(log.to_str().ok_or("utf-8 path")?, &form)?;
    let (handle, mut events) = spawn_process_supervisor();
    handle.start(request).await?;
    let seen = with_timeout(collect_until_terminal(&mut events)).await;

    assert_eq!(output_lines(&seen), vec!["PROGRESS 50", "sum 7"]);
    assert_eq!(progress_values(&seen), vec![50, 100]);
    assert_eq!(
        seen.last(),
        Some(&SupervisorEvent::StateChanged(RunState::Finished(0)))
    );
    assert_eq!(fs::read_to_string(&log)?.trim(), "7");
    Ok(())
}

#[tokio::test]
async fn working_dir_is_honoured() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let task = TaskDescriptor::new("pwd", "/bin/sh")
        .with_input_style(scriptrun::types::InputArgStyle::Flag("-c".into()))
        .with_working_dir(Some(dir.path().to_path_buf()));
    let request = task.launch_request("pwd", &task.form())?;
    assert_eq!(request.args, vec!["-c", "pwd"]);

    let (handle, mut events) = spawn_process_supervisor();
    handle.start(request).await?;
    let seen = with_timeout(collect_until_terminal(&mut events)).await;

    let lines = output_lines(&seen);
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert_eq!(
        fs::canonicalize(&lines[0])?,
        fs::canonicalize(dir.path())?
    );
    Ok(())
}
