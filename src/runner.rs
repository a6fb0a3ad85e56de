//! One-shot child process execution with full output capture.
//!
//! Every short-lived collaborator (format converters, OCR, retrieval tools,
//! transcription) goes through here: run a command, capture everything it
//! prints, hand back decoded text. No state machine, no timeout — callers are
//! user-initiated and bounded in practice.

use std::ffi::OsStr;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// Result of one captured run. `text` holds decoded stdout followed by
/// stderr; `exit_observed` is false only when the process never spawned, in
/// which case `text` is empty and the caller falls back to degraded output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub text: String,
    pub exit_observed: bool,
}

impl CaptureOutcome {
    fn spawn_failed() -> Self {
        Self {
            text: String::new(),
            exit_observed: false,
        }
    }
}

/// Runs `program` with a structured argument vector and waits for exit,
/// capturing stdout and stderr. Arguments are never assembled into a shell
/// string, so paths with spaces need no quoting.
pub fn capture<S: AsRef<OsStr>>(program: &str, args: &[S]) -> CaptureOutcome {
    capture_with_env(program, args, &[])
}

/// Like [`capture`], with extra environment variables scoped to the child
/// only. Locale-sensitive tools get their UTF-8 switches here instead of
/// through mutations of the host environment.
pub fn capture_with_env<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    envs: &[(&str, &str)],
) -> CaptureOutcome {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in envs {
        cmd.env(key, value);
    }

    // Command::output reads both pipes to end-of-stream and then waits for
    // exit, unbounded.
    let output = match cmd.output() {
        Ok(output) => output,
        Err(err) => {
            warn!(program, error = %err, "one-shot spawn failed");
            return CaptureOutcome::spawn_failed();
        }
    };

    debug!(program, status = %output.status, "one-shot run complete");

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.stderr.is_empty() {
        text.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    CaptureOutcome {
        text,
        exit_observed: true,
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let outcome = capture("echo", &["hello"]);
        assert!(outcome.exit_observed);
        assert_eq!(outcome.text, "hello\n");
    }

    #[test]
    fn captures_stderr_after_stdout() {
        let outcome = capture("sh", &["-c", "echo out; echo err >&2"]);
        assert!(outcome.exit_observed);
        assert!(outcome.text.contains("out\n"));
        assert!(outcome.text.contains("err\n"));
    }

    #[test]
    fn missing_executable_yields_sentinel() {
        let args: &[&str] = &[];
        let outcome = capture("/nonexistent/llamadesk-no-such-tool", args);
        assert!(!outcome.exit_observed);
        assert!(outcome.text.is_empty());
    }

    #[test]
    fn env_is_scoped_to_the_child() {
        let envs = [("LLAMADESK_TEST", "scoped")];
        let outcome = capture_with_env("sh", &["-c", "printf '%s' \"$LLAMADESK_TEST\""], &envs);
        assert_eq!(outcome.text, "scoped");
        assert!(std::env::var("LLAMADESK_TEST").is_err());
    }

    #[test]
    fn arguments_with_spaces_survive() {
        let outcome = capture("echo", &["two words"]);
        assert_eq!(outcome.text, "two words\n");
    }
}
