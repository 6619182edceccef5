#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout, write_script, TestResult};

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use bigzip_controller::engine::{Controller, CoreController, RunOutcome};
use bigzip_controller::errors::BigzipError;
use bigzip_controller::exec::{
    parse_output_path, ProcessRunner, ProgressSample, ProgressSettings, RealProcessRunner,
    RunnerSettings,
};
use bigzip_controller::fs::RealFileSystem;
use bigzip_controller::routing::PathRouter;
use bigzip_controller::types::{FillPattern, Mode, RunRequest, SizeFactor};
use bigzip_controller::ui::Collaborators;
use bigzip_controller_test_utils::recording::RecordingResults;

fn fast_progress() -> ProgressSettings {
    ProgressSettings {
        tick_interval: Duration::from_millis(10),
        ..ProgressSettings::default()
    }
}

fn runner_in(dir: &Path) -> RealProcessRunner {
    RealProcessRunner::new(RunnerSettings {
        executable_name: "bz".to_string(),
        executable_dir: Some(dir.to_path_buf()),
        progress: fast_progress(),
    })
}

fn compress_request(input: &str, output: Option<&str>) -> RunRequest {
    RunRequest {
        input_path: input.to_string(),
        output_path: output.map(str::to_string),
        mode: Mode::Compress,
        factor: SizeFactor::X64,
        fill_pattern: FillPattern::Repeat,
        force_overwrite: true,
    }
}

fn drain(mut rx: mpsc::UnboundedReceiver<ProgressSample>) -> Vec<f64> {
    let mut out = Vec::new();
    while let Ok(sample) = rx.try_recv() {
        out.push(sample.fraction());
    }
    out
}

fn assert_non_decreasing(samples: &[f64]) {
    for pair in samples.windows(2) {
        assert!(pair[0] <= pair[1], "progress went backwards: {samples:?}");
    }
}

#[tokio::test]
async fn successful_run_captures_summary_and_args() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_script(
        dir.path(),
        "bz",
        r#"echo "$@" >&2
sleep 0.1
echo "Wrote $2.bigzip (size: 10 bytes)""#,
    )?;

    let runner = runner_in(dir.path());
    let (tx, rx) = mpsc::unbounded_channel();
    let result = with_timeout(runner.run(
        compress_request("/data/in.txt", Some("/data/out.bigzip")),
        CancellationToken::new(),
        Arc::new(tx),
    ))
    .await?;

    assert!(result.success());
    assert_eq!(
        result.stderr.trim(),
        "-i /data/in.txt -f 64 -mode repeat -o /data/out.bigzip -force"
    );
    assert_eq!(
        parse_output_path(&result.stdout, Mode::Compress),
        "/data/in.txt.bigzip"
    );

    let samples = drain(rx);
    assert_eq!(&samples[..3], &[0.1, 0.2, 0.3]);
    assert_eq!(samples.last().copied(), Some(1.0));
    assert_eq!(samples.iter().filter(|f| **f == 1.0).count(), 1);
    assert!(samples.iter().all(|f| *f <= 0.95 || *f == 1.0));
    assert_non_decreasing(&samples);
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_returns_stderr() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_script(dir.path(), "bz", "echo 'input is not a bigzip archive' >&2\nexit 3")?;

    let runner = runner_in(dir.path());
    let result = with_timeout(runner.run(
        compress_request("/data/in.txt", None),
        CancellationToken::new(),
        Arc::new(bigzip_controller::exec::NoProgress),
    ))
    .await?;

    assert_eq!(result.exit_code, 3);
    assert!(!result.success());
    assert_eq!(result.stderr.trim(), "input is not a bigzip archive");
    assert!(result.stdout.is_empty());
    Ok(())
}

#[tokio::test]
async fn large_outputs_are_drained_concurrently() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    // Well past a pipe buffer on both streams.
    write_script(
        dir.path(),
        "bz",
        "head -c 1000000 /dev/zero | tr '\\0' 'e' >&2\nhead -c 1000000 /dev/zero | tr '\\0' 'o'",
    )?;

    let runner = runner_in(dir.path());
    let result = with_timeout(runner.run(
        compress_request("/data/in.txt", None),
        CancellationToken::new(),
        Arc::new(bigzip_controller::exec::NoProgress),
    ))
    .await?;

    assert!(result.success());
    assert_eq!(result.stdout.len(), 1_000_000);
    assert_eq!(result.stderr.len(), 1_000_000);
    Ok(())
}

#[tokio::test]
async fn spawn_failure_is_a_result_not_an_error() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    // Present but not executable.
    std::fs::write(dir.path().join("bz"), "#!/bin/sh\nexit 0\n")?;

    let runner = runner_in(dir.path());
    let result = with_timeout(runner.run(
        compress_request("/data/in.txt", None),
        CancellationToken::new(),
        Arc::new(bigzip_controller::exec::NoProgress),
    ))
    .await?;

    assert_eq!(result.exit_code, -1);
    assert!(result.stderr.starts_with("Failed to start process: "));
    Ok(())
}

#[tokio::test]
async fn cancel_kills_and_reaps_child() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let pid_file = dir.path().join("pid");
    // The input argument doubles as the pid file location.
    write_script(dir.path(), "bz", "echo $$ > \"$2\"\nexec sleep 30")?;

    let runner = runner_in(dir.path());
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let started = Instant::now();
    let run = runner.run(
        compress_request(&pid_file.to_string_lossy(), None),
        cancel.clone(),
        Arc::new(tx),
    );
    let canceller = {
        let pid_file = pid_file.clone();
        let cancel = cancel.clone();
        async move {
            while !pid_file.exists() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        }
    };

    let (result, ()) = with_timeout(async { tokio::join!(run, canceller) }).await;
    assert!(matches!(result, Err(BigzipError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));

    let samples = drain(rx);
    assert!(!samples.contains(&1.0), "no completion sample after cancel: {samples:?}");
    assert_non_decreasing(&samples);

    #[cfg(target_os = "linux")]
    {
        let pid = std::fs::read_to_string(&pid_file)?.trim().to_string();
        assert!(
            !Path::new(&format!("/proc/{pid}")).exists(),
            "child {pid} still present after cancellation"
        );
    }
    Ok(())
}

#[tokio::test]
async fn cancel_while_output_pipe_is_held_open() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    // The background sleep inherits stdout/stderr and keeps them open after
    // the script itself has exited.
    write_script(
        dir.path(),
        "bz",
        "sleep 8 &\necho 'Wrote x (size: 1 bytes)'\nexit 0",
    )?;

    let runner = runner_in(dir.path());
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let started = Instant::now();
    let run = runner.run(compress_request("/data/in.txt", None), cancel.clone(), Arc::new(tx));
    let canceller = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        }
    };

    let (result, ()) = with_timeout(async { tokio::join!(run, canceller) }).await;
    assert!(matches!(result, Err(BigzipError::Cancelled)));
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "cancel took {:?}",
        started.elapsed()
    );

    let samples = drain(rx);
    assert!(!samples.contains(&1.0), "no completion sample after cancel: {samples:?}");
    Ok(())
}

#[tokio::test]
async fn controller_drives_real_process_end_to_end() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    write_script(
        dir.path(),
        "bz",
        r#"cp "$2" "$8"
echo "Wrote $8 (size: 5 bytes)""#,
    )?;
    let input = dir.path().join("in.txt");
    std::fs::write(&input, "hello")?;
    let input = input.to_string_lossy().into_owned();

    let results = RecordingResults::new();
    let core = CoreController::new(PathRouter::default(), fast_progress());
    let (handle, task) = Controller::spawn(
        core,
        Arc::new(runner_in(dir.path())),
        Arc::new(RealFileSystem),
        Collaborators::new().with_results(results.clone()),
    );

    handle.set_input_path(input.clone())?;
    let outcome = with_timeout(handle.run_to_completion()).await?;

    let expected_output = format!("{input}.bigzip");
    assert_eq!(
        outcome,
        RunOutcome::Succeeded {
            summary: format!("Wrote {expected_output} (size: 5 bytes)"),
            output_path: expected_output.clone(),
        }
    );
    assert_eq!(std::fs::read_to_string(&expected_output)?, "hello");
    assert_eq!(results.presented(), vec![(true, expected_output)]);

    handle.shutdown()?;
    drop(handle);
    with_timeout(task).await??;
    Ok(())
}
