//! Argument-vector process execution with a wall-clock bound.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::sanitizer::Host;
use crate::Verified;

/// Default bound for a ping run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const PING_PROGRAM: &str = "ping";

/// Why an external program did not produce usable output.
///
/// The variants carry detail for server logs; callers only ever see
/// `ExecutionFailed`.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program name.
        program: &'static str,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// The program ran longer than its timeout and was killed.
    #[error("{program} timed out after {timeout:?}")]
    TimedOut {
        /// Program name.
        program: &'static str,
        /// The bound that was exceeded.
        timeout: Duration,
    },
    /// The program exited unsuccessfully. Its standard error is logged by
    /// [`run`] and never carried here.
    #[error("{program} exited with {status}")]
    Failed {
        /// Program name.
        program: &'static str,
        /// Exit status as reported by the OS.
        status: std::process::ExitStatus,
    },
}

/// A fixed program, its argument vector, and a timeout.
///
/// There is no constructor taking a command string: each argument is a
/// separate element handed to `execve`, so nothing is ever interpreted by
/// a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: &'static str,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSpec {
    /// One echo request to a validated host: `ping -c 1 <host>`.
    pub fn ping(host: &Verified<Host>, timeout: Duration) -> Self {
        Self {
            program: PING_PROGRAM,
            args: vec!["-c".to_string(), "1".to_string(), host.as_ref().as_str()],
            timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(program: &'static str, args: &[&str], timeout: Duration) -> Self {
        Self {
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout,
        }
    }

    /// Program name.
    pub fn program(&self) -> &'static str {
        self.program
    }

    /// Argument vector, excluding the program name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Wall-clock bound for the run.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Runs a [`CommandSpec`] and returns its standard output.
///
/// The child is spawned with `kill_on_drop`, so when the timeout fires and
/// the pending future is dropped, the child is killed rather than orphaned.
///
/// # Errors
///
/// Returns [`ExecError`] on spawn failure, timeout, or non-zero exit.
pub async fn run(spec: &CommandSpec) -> Result<String, ExecError> {
    let child = Command::new(spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExecError::Spawn {
            program: spec.program,
            source,
        })?;

    let output = match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| ExecError::Spawn {
            program: spec.program,
            source,
        })?,
        Err(_) => {
            return Err(ExecError::TimedOut {
                program: spec.program,
                timeout: spec.timeout,
            })
        }
    };

    if !output.status.success() {
        tracing::warn!(
            program = spec.program,
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
            "program failed"
        );
        return Err(ExecError::Failed {
            program: spec.program,
            status: output.status,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitizer::HostSanitizer;
    use crate::{Sanitizer, Tainted};

    #[test]
    fn ping_spec_keeps_host_as_single_argument() {
        let host = HostSanitizer
            .sanitize(Tainted::new("example.com".to_string()))
            .unwrap();
        let spec = CommandSpec::ping(&host, DEFAULT_TIMEOUT);

        assert_eq!(spec.program(), "ping");
        assert_eq!(spec.args(), ["-c", "1", "example.com"]);
        assert_eq!(spec.timeout(), Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout() {
        let spec = CommandSpec::from_parts("echo", &["hello", "; id"], DEFAULT_TIMEOUT);
        let out = run(&spec).await.unwrap();
        // The metacharacters arrive as literal argument text.
        assert_eq!(out.trim(), "hello ; id");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let spec = CommandSpec::from_parts("false", &[], DEFAULT_TIMEOUT);
        assert!(matches!(run(&spec).await, Err(ExecError::Failed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failure_message_omits_stderr() {
        let spec = CommandSpec::from_parts("ls", &["/definitely-missing-dir-xyz"], DEFAULT_TIMEOUT);
        let err = run(&spec).await.unwrap_err();

        assert!(matches!(err, ExecError::Failed { program: "ls", .. }));
        let message = err.to_string();
        assert!(message.starts_with("ls exited with"));
        assert!(!message.contains("definitely-missing-dir-xyz"));
        assert!(!message.contains("No such file"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_child() {
        let spec = CommandSpec::from_parts("sleep", &["5"], Duration::from_millis(100));
        let started = std::time::Instant::now();

        assert!(matches!(run(&spec).await, Err(ExecError::TimedOut { .. })));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let spec = CommandSpec::from_parts("definitely-not-a-real-binary-xyz", &[], DEFAULT_TIMEOUT);
        assert!(matches!(run(&spec).await, Err(ExecError::Spawn { .. })));
    }
}
