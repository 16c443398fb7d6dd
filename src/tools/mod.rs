pub mod deps;
pub mod msfconsole;
pub mod nmap;
pub mod nslookup;
pub mod sublist3r;

use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ToolError;

/// Runs external commands and hands back their captured output.
///
/// Implementations never panic and never let a failing process escape as
/// anything other than a `ToolError`.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(
        &self,
        command: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<String, ToolError>;
}

/// Record of one external call, kept only long enough to be logged.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub command: String,
    pub args: Vec<String>,
    pub output: String,
    pub success: bool,
}

impl ToolInvocation {
    fn new(command: &str, args: &[String]) -> Self {
        Self {
            command: command.to_string(),
            args: args.to_vec(),
            output: String::new(),
            success: false,
        }
    }
}

/// `Invoker` backed by real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInvoker;

impl SystemInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Invoker for SystemInvoker {
    async fn invoke(
        &self,
        command: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<String, ToolError> {
        let mut record = ToolInvocation::new(command, args);
        let started = Instant::now();

        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(command, e))?;

        let output = match timeout {
            Some(after) => tokio::time::timeout(after, child.wait_with_output())
                .await
                .map_err(|_| ToolError::Timeout {
                    command: command.to_string(),
                    after,
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|source| ToolError::Io {
            command: command.to_string(),
            source,
        })?;

        record.output = merge_streams(&output.stdout, &output.stderr);
        record.success = output.status.success();

        debug!(
            command = %record.command,
            args = ?record.args,
            success = record.success,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool finished"
        );

        if record.success {
            Ok(record.output)
        } else {
            Err(ToolError::ExecutionFailed {
                command: record.command,
                status: output.status.to_string(),
                output: record.output,
            })
        }
    }
}

fn spawn_error(command: &str, err: io::Error) -> ToolError {
    if err.kind() == io::ErrorKind::NotFound {
        ToolError::NotFound {
            command: command.to_string(),
        }
    } else {
        ToolError::Io {
            command: command.to_string(),
            source: err,
        }
    }
}

fn merge_streams(stdout: &[u8], stderr: &[u8]) -> String {
    let mut merged = String::from_utf8_lossy(stdout).into_owned();
    let err = String::from_utf8_lossy(stderr);
    if !err.is_empty() {
        if !merged.is_empty() && !merged.ends_with('\n') {
            merged.push('\n');
        }
        merged.push_str(&err);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_streams() {
        assert_eq!(merge_streams(b"out", b"err\n"), "out\nerr\n");
        assert_eq!(merge_streams(b"out\n", b""), "out\n");
        assert_eq!(merge_streams(b"", b"err"), "err");
    }

    #[tokio::test]
    async fn test_missing_command_is_not_found() {
        let result = SystemInvoker::new()
            .invoke("edgefinder-no-such-binary", &[], None)
            .await;
        assert!(matches!(result, Err(ToolError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_both_streams() {
        let output = SystemInvoker::new()
            .invoke("sh", &args(&["-c", "echo hello; echo oops >&2"]), None)
            .await
            .unwrap();
        assert!(output.contains("hello"));
        assert!(output.contains("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_keeps_output() {
        let err = SystemInvoker::new()
            .invoke("sh", &args(&["-c", "echo broken; exit 3"]), None)
            .await
            .unwrap_err();
        match err {
            ToolError::ExecutionFailed { output, .. } => assert!(output.contains("broken")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_expires() {
        let err = SystemInvoker::new()
            .invoke("sleep", &args(&["5"]), Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }
}
