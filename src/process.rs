use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{VvError, VvResult};

#[must_use]
pub fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Read a millisecond timeout override from the environment, falling back to
/// the built-in default when the variable is unset or unparseable.
#[must_use]
pub(crate) fn duration_from_env(key: &str, fallback: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map_or(fallback, Duration::from_millis)
}

pub fn run_command(program: &str, args: &[String], cwd: Option<&Path>) -> VvResult<Output> {
    run_command_with_timeout(program, args, cwd, None)
}

/// Run a subprocess and treat any nonzero exit as an error. This is the path
/// for the filter/probe tools, where a failure is always fatal for the call.
pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Option<Duration>,
) -> VvResult<Output> {
    if !command_exists(program) {
        return Err(VvError::CommandMissing {
            command: program.to_owned(),
        });
    }

    let rendered = format!("{} {}", program, args.join(" "));
    let mut command = Command::new(program);
    command.args(args);
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    if let Some(limit) = timeout {
        let mut child = command.spawn()?;
        let started_at = Instant::now();

        let (stdout_rx, stderr_rx) = spawn_pipe_readers(&mut child);

        loop {
            if let Some(status) = child.try_wait()? {
                let stdout = stdout_rx
                    .recv_timeout(Duration::from_millis(100))
                    .unwrap_or_default();
                let stderr = stderr_rx
                    .recv_timeout(Duration::from_millis(100))
                    .unwrap_or_default();
                return validate_command_output(
                    &rendered,
                    Output {
                        status,
                        stdout,
                        stderr,
                    },
                );
            }

            if started_at.elapsed() >= limit {
                let _ = child.kill();
                let _ = child.wait();
                let stderr = stderr_rx
                    .recv_timeout(Duration::from_millis(100))
                    .unwrap_or_default();
                let stderr_str = String::from_utf8_lossy(&stderr).into_owned();
                return Err(VvError::from_command_timeout(
                    rendered,
                    saturating_duration_ms(limit),
                    stderr_str,
                ));
            }

            thread::sleep(Duration::from_millis(20));
        }
    }

    let output = command.output()?;
    validate_command_output(&rendered, output)
}

/// Raw outcome of a captured run. `exit_code` falls back to -1 for
/// signal-terminated or killed children.
#[derive(Debug, Clone)]
pub struct Capture {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub wall_clock: Duration,
}

/// Run a subprocess and report its exit code, output, and timeout state as
/// data. This is the path for the scoring engines: a nonzero exit carries
/// diagnostic text the caller must still parse, so it is never an `Err` here.
/// Only spawn and pipe failures are errors.
///
/// On timeout expiry the child is killed and whatever output was captured is
/// returned with `timed_out == true`.
pub fn run_captured(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    envs: &[(String, String)],
    timeout: Duration,
) -> VvResult<Capture> {
    if !command_exists(program) {
        return Err(VvError::CommandMissing {
            command: program.to_owned(),
        });
    }

    let mut command = Command::new(program);
    command.args(args);
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    for (key, value) in envs {
        command.env(key, value);
    }

    let mut child = command.spawn()?;
    let started_at = Instant::now();

    let (stdout_rx, stderr_rx) = spawn_pipe_readers(&mut child);

    loop {
        if let Some(status) = child.try_wait()? {
            let stdout = stdout_rx
                .recv_timeout(Duration::from_millis(100))
                .unwrap_or_default();
            let stderr = stderr_rx
                .recv_timeout(Duration::from_millis(100))
                .unwrap_or_default();
            return Ok(Capture {
                exit_code: status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                timed_out: false,
                wall_clock: started_at.elapsed(),
            });
        }

        if started_at.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            let stdout = stdout_rx
                .recv_timeout(Duration::from_millis(100))
                .unwrap_or_default();
            let stderr = stderr_rx
                .recv_timeout(Duration::from_millis(100))
                .unwrap_or_default();
            return Ok(Capture {
                exit_code: -1,
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                timed_out: true,
                wall_clock: started_at.elapsed(),
            });
        }

        thread::sleep(Duration::from_millis(20));
    }
}

type PipeReceiver = std::sync::mpsc::Receiver<Vec<u8>>;

fn spawn_pipe_readers(child: &mut std::process::Child) -> (PipeReceiver, PipeReceiver) {
    let mut stdout_pipe = child.stdout.take().expect("stdout piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr piped");

    let (stdout_tx, stdout_rx) = std::sync::mpsc::channel();
    let (stderr_tx, stderr_rx) = std::sync::mpsc::channel();

    thread::spawn(move || {
        use std::io::Read;
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf);
        let _ = stdout_tx.send(buf);
    });

    thread::spawn(move || {
        use std::io::Read;
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf);
        let _ = stderr_tx.send(buf);
    });

    (stdout_rx, stderr_rx)
}

fn validate_command_output(rendered: &str, output: Output) -> VvResult<Output> {
    if output.status.success() {
        return Ok(output);
    }

    let status = output.status.code().unwrap_or(-1);
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    Err(VvError::from_command_failure(
        rendered.to_owned(),
        status,
        stderr,
    ))
}

pub(crate) fn saturating_duration_ms(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{
        Capture, command_exists, duration_from_env, run_captured, run_command,
        run_command_with_timeout, saturating_duration_ms, validate_command_output,
    };

    #[test]
    fn run_command_succeeds_for_true() {
        let output = run_command("true", &[], None).expect("true should succeed");
        assert!(output.status.success());
    }

    #[test]
    fn run_command_missing_program_returns_command_missing() {
        let err = run_command("nonexistent_binary_xyz_12345", &[], None)
            .expect_err("nonexistent binary should fail");
        assert!(
            matches!(err, crate::error::VvError::CommandMissing { .. }),
            "expected CommandMissing, got: {err:?}"
        );
    }

    #[test]
    fn run_command_nonzero_exit_returns_command_failed() {
        let err = run_command("false", &[], None).expect_err("false should fail");
        let text = err.to_string();
        assert!(
            text.contains("command failed") || text.contains("status"),
            "expected command failure message, got: {text}"
        );
    }

    #[test]
    fn run_command_with_timeout_succeeds_when_fast() {
        let output = run_command_with_timeout("true", &[], None, Some(Duration::from_secs(5)))
            .expect("true should succeed within timeout");
        assert!(output.status.success());
    }

    #[test]
    fn run_command_with_timeout_kills_slow_command() {
        let err = run_command_with_timeout(
            "sleep",
            &["60".to_owned()],
            None,
            Some(Duration::from_millis(100)),
        )
        .expect_err("should timeout");
        let text = err.to_string();
        assert!(
            text.contains("timed out") || text.contains("timeout"),
            "expected timeout message, got: {text}"
        );
    }

    #[test]
    fn run_command_captures_stderr() {
        // `ls` on a nonexistent path writes to stderr and exits non-zero.
        let err = run_command("ls", &["/nonexistent_path_xyz_99999".to_owned()], None)
            .expect_err("ls on nonexistent should fail");
        let text = err.to_string();
        assert!(
            text.contains("nonexistent_path") || text.contains("No such file"),
            "expected stderr content, got: {text}"
        );
    }

    #[test]
    fn run_command_with_cwd() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = run_command("pwd", &[], Some(dir.path())).expect("pwd should succeed");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains(dir.path().to_str().unwrap()),
            "expected cwd in stdout, got: {stdout}"
        );
    }

    #[test]
    fn run_command_with_args() {
        let output = run_command("echo", &["hello".to_owned(), "world".to_owned()], None)
            .expect("echo should succeed");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains("hello world"),
            "expected 'hello world', got: {stdout}"
        );
    }

    #[test]
    fn run_command_with_timeout_none_behaves_like_run_command() {
        let output = run_command_with_timeout("true", &[], None, None).expect("should succeed");
        assert!(output.status.success());
    }

    // -----------------------------------------------------------------------
    // run_captured tests
    // -----------------------------------------------------------------------

    #[test]
    fn run_captured_nonzero_exit_is_data_not_error() {
        let capture = run_captured(
            "sh",
            &["-c".to_owned(), "echo out; echo err 1>&2; exit 3".to_owned()],
            None,
            &[],
            Duration::from_secs(5),
        )
        .expect("nonzero exit must not be an Err");
        assert_eq!(capture.exit_code, 3);
        assert!(capture.stdout.contains("out"), "stdout: {}", capture.stdout);
        assert!(capture.stderr.contains("err"), "stderr: {}", capture.stderr);
        assert!(!capture.timed_out);
    }

    #[test]
    fn run_captured_keeps_streams_separate() {
        let capture = run_captured(
            "sh",
            &[
                "-c".to_owned(),
                "echo only-stdout; echo only-stderr 1>&2".to_owned(),
            ],
            None,
            &[],
            Duration::from_secs(5),
        )
        .expect("should run");
        assert!(capture.stdout.contains("only-stdout"));
        assert!(!capture.stdout.contains("only-stderr"));
        assert!(capture.stderr.contains("only-stderr"));
        assert!(!capture.stderr.contains("only-stdout"));
    }

    #[test]
    fn run_captured_timeout_kills_and_flags() {
        let started = std::time::Instant::now();
        let capture = run_captured(
            "sleep",
            &["60".to_owned()],
            None,
            &[],
            Duration::from_millis(100),
        )
        .expect("timeout must not be an Err");
        assert!(capture.timed_out);
        assert_eq!(capture.exit_code, -1);
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "child must be killed promptly"
        );
        assert!(capture.wall_clock >= Duration::from_millis(100));
    }

    #[test]
    fn run_captured_missing_program_is_an_error() {
        let err = run_captured(
            "nonexistent_binary_xyz_12345",
            &[],
            None,
            &[],
            Duration::from_secs(1),
        )
        .expect_err("missing binary is a real error");
        assert!(matches!(err, crate::error::VvError::CommandMissing { .. }));
    }

    #[test]
    fn run_captured_passes_extra_env() {
        let capture = run_captured(
            "sh",
            &["-c".to_owned(), "printf %s \"$VV_TEST_MARKER\"".to_owned()],
            None,
            &[("VV_TEST_MARKER".to_owned(), "marker-value".to_owned())],
            Duration::from_secs(5),
        )
        .expect("should run");
        assert_eq!(capture.stdout, "marker-value");
    }

    #[test]
    fn run_captured_respects_cwd() {
        let dir = tempfile::tempdir().expect("tempdir");
        let capture = run_captured("pwd", &[], Some(dir.path()), &[], Duration::from_secs(5))
            .expect("pwd should run");
        assert!(
            capture.stdout.contains(dir.path().to_str().unwrap()),
            "expected cwd in stdout, got: {}",
            capture.stdout
        );
    }

    #[test]
    fn run_captured_records_wall_clock() {
        let capture = run_captured("true", &[], None, &[], Duration::from_secs(5))
            .expect("true should run");
        assert!(capture.wall_clock <= Duration::from_secs(5));
        assert!(!capture.timed_out);
        assert_eq!(capture.exit_code, 0);
    }

    #[test]
    fn capture_is_cloneable_for_result_assembly() {
        let capture = Capture {
            exit_code: 0,
            stdout: "s".to_owned(),
            stderr: String::new(),
            timed_out: false,
            wall_clock: Duration::from_millis(10),
        };
        let cloned = capture.clone();
        assert_eq!(cloned.exit_code, 0);
        assert_eq!(cloned.stdout, "s");
    }

    // -----------------------------------------------------------------------
    // command_exists / helpers
    // -----------------------------------------------------------------------

    #[test]
    fn command_exists_true_for_known_binary() {
        assert!(command_exists("ls"), "ls should exist");
        assert!(command_exists("true"), "true should exist");
    }

    #[test]
    fn command_exists_false_for_absent_binary() {
        assert!(
            !command_exists("definitely_not_a_real_binary_abc_xyz_99999"),
            "absent binary should not exist"
        );
    }

    #[test]
    fn command_exists_accepts_absolute_paths() {
        // `which` resolves absolute candidates directly; /bin/sh is universal.
        assert!(command_exists("/bin/sh"));
        assert!(!command_exists("/bin/definitely_not_here_xyz"));
    }

    #[test]
    fn duration_from_env_falls_back_on_missing_var() {
        assert_eq!(
            duration_from_env("VERIVOICE_TEST_NONEXISTENT_VAR_39285", Duration::from_secs(3)),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn duration_from_env_distinct_fallbacks_for_distinct_keys() {
        let short = duration_from_env(
            "VERIVOICE_TEST_DUR_NONEXIST_SHORT",
            Duration::from_millis(10),
        );
        let long = duration_from_env("VERIVOICE_TEST_DUR_NONEXIST_LONG", Duration::from_secs(60));
        assert!(short < long);
    }

    #[test]
    fn duration_from_env_zero_fallback_returns_zero() {
        assert_eq!(
            duration_from_env("VERIVOICE_TEST_DUR_NONEXIST_ZERO", Duration::ZERO),
            Duration::ZERO
        );
    }

    #[test]
    fn saturating_duration_ms_normal_case() {
        assert_eq!(saturating_duration_ms(Duration::from_secs(5)), 5000);
        assert_eq!(saturating_duration_ms(Duration::from_millis(1234)), 1234);
    }

    #[test]
    fn saturating_duration_ms_max_does_not_panic() {
        let result = saturating_duration_ms(Duration::from_secs(u64::MAX));
        assert_eq!(result, u64::MAX);
    }

    #[test]
    fn saturating_duration_ms_zero() {
        assert_eq!(saturating_duration_ms(Duration::ZERO), 0);
    }

    // -----------------------------------------------------------------------
    // validate_command_output tests
    // -----------------------------------------------------------------------

    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn fake_output(code: i32, stderr: &str) -> std::process::Output {
        std::process::Output {
            status: ExitStatus::from_raw(code << 8), // raw wait status: exit code in upper byte
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn validate_command_output_success_returns_ok() {
        let output = fake_output(0, "");
        let result = validate_command_output("test-cmd", output);
        assert!(result.is_ok());
    }

    #[test]
    fn validate_command_output_nonzero_exit_returns_error() {
        let output = fake_output(1, "something went wrong");
        let result = validate_command_output("test-cmd", output);
        assert!(result.is_err());
        let text = result.unwrap_err().to_string();
        assert!(
            text.contains("something went wrong"),
            "error should contain stderr, got: {text}"
        );
    }

    #[test]
    fn validate_command_output_preserves_exit_code_in_error() {
        let output = fake_output(42, "exit code 42");
        let err = validate_command_output("my-tool --flag", output).unwrap_err();
        let text = err.to_string();
        assert!(
            text.contains("42"),
            "error should mention exit code 42, got: {text}"
        );
    }

    #[test]
    fn validate_command_output_empty_stderr_still_fails_on_nonzero() {
        let output = fake_output(2, "");
        let result = validate_command_output("cmd", output);
        assert!(
            result.is_err(),
            "non-zero exit with empty stderr should still fail"
        );
    }

    #[test]
    fn validate_command_output_signal_terminated_uses_negative_one() {
        // When a process dies to a signal, no exit code is available; the
        // raw wait status 9 encodes SIGKILL.
        let output = std::process::Output {
            status: ExitStatus::from_raw(9),
            stdout: Vec::new(),
            stderr: b"killed".to_vec(),
        };
        let result = validate_command_output("signaled-cmd", output);
        assert!(result.is_err(), "signal-killed process should fail");
        let text = result.unwrap_err().to_string();
        assert!(
            text.contains("-1") || text.contains("killed"),
            "should mention -1 or killed: {text}"
        );
    }

    #[test]
    fn validate_command_output_includes_command_name_in_error() {
        let output = fake_output(1, "boom");
        let err = validate_command_output("my-special-cmd --flag", output).unwrap_err();
        let text = err.to_string();
        assert!(
            text.contains("my-special-cmd"),
            "error should mention command: {text}"
        );
    }
}
