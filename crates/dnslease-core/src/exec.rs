//! Bounded-wait subprocess execution
//!
//! The script backend, the RFC2136 adapter and the worker controllers
//! all shell out to external tools. Every invocation goes through this
//! helper: output fully captured, a hard wall-time deadline, and the
//! child killed when the deadline fires.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Hard deadline applied to operator-supplied script programs
pub const SCRIPT_DEADLINE: Duration = Duration::from_secs(30);

/// Captured result of a finished subprocess
#[derive(Debug)]
pub struct ExecOutput {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ExecOutput {
    /// Whether the process exited with status zero
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Best error description available: stderr, then stdout, then the code
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Run a program to completion with a wall-time deadline
///
/// `input`, when given, is written to the child's stdin and stdin is
/// closed afterwards. The deadline covers the whole run; on expiry the
/// child is killed and [`Error::Network`] is returned so callers treat
/// it like any other transient failure.
///
/// [`Error::Network`]: crate::Error::Network
pub async fn run_with_deadline(
    program: &str,
    args: &[String],
    envs: &[(&str, String)],
    input: Option<&str>,
    deadline: Duration,
) -> Result<ExecOutput> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in envs {
        command.env(key, value);
    }

    let mut child = command
        .spawn()
        .map_err(|e| Error::Other(format!("failed to spawn {program:?}: {e}")))?;

    if let Some(input) = input {
        // Taking stdin drops (and closes) it once the write finishes.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Other(format!("no stdin handle for {program:?}")))?;
        stdin.write_all(input.as_bytes()).await?;
        stdin.shutdown().await?;
    }

    let output = tokio::time::timeout(deadline, child.wait_with_output())
        .await
        .map_err(|_| {
            Error::network(format!(
                "{program:?} exceeded its {}s deadline",
                deadline.as_secs()
            ))
        })??;

    Ok(ExecOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let out = run_with_deadline(
            "sh",
            &["-c".to_string(), "echo hello".to_string()],
            &[],
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn passes_environment_and_stdin() {
        let out = run_with_deadline(
            "sh",
            &["-c".to_string(), "cat; echo $GREETING".to_string()],
            &[("GREETING", "world".to_string())],
            Some("hello "),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(out.success());
        assert_eq!(out.stdout, "hello world\n");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_errored() {
        let out = run_with_deadline(
            "sh",
            &["-c".to_string(), "echo oops >&2; exit 3".to_string()],
            &[],
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(!out.success());
        assert_eq!(out.code, Some(3));
        assert_eq!(out.failure_message(), "oops");
    }

    #[tokio::test]
    async fn deadline_kills_the_child() {
        let err = run_with_deadline(
            "sh",
            &["-c".to_string(), "sleep 30".to_string()],
            &[],
            None,
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Network(_)), "got {err:?}");
    }
}
