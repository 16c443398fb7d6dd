use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::batch::TargetKind;

pub type Result<T> = std::result::Result<T, EdgeError>;

/// Failures raised by a single external tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{command}: command not found")]
    NotFound { command: String },

    #[error("{command} timed out after {}s", after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("{command} exited with {status}")]
    ExecutionFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("{command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub fn command(&self) -> &str {
        match self {
            ToolError::NotFound { command }
            | ToolError::Timeout { command, .. }
            | ToolError::ExecutionFailed { command, .. }
            | ToolError::Io { command, .. } => command,
        }
    }

    /// Captured text worth showing the user, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            ToolError::ExecutionFailed { output, .. } if !output.trim().is_empty() => {
                Some(output.trim())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("cannot tell whether the batch holds domains or addresses (offending line: {line:?})")]
    Ambiguous { line: String },

    #[error("{line:?} does not match the declared type {declared}")]
    Mismatch { line: String, declared: TargetKind },
}

#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error("required tool {command:?} is not installed or not on PATH")]
    ToolNotFound { command: String },

    #[error(transparent)]
    Tool(ToolError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl From<ToolError> for EdgeError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound { command } => EdgeError::ToolNotFound { command },
            other => EdgeError::Tool(other),
        }
    }
}

impl EdgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EdgeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            EdgeError::InvalidInput(_) | EdgeError::Classification(_) | EdgeError::Config { .. } => 1,
            EdgeError::ToolNotFound { .. } | EdgeError::Tool(_) | EdgeError::Io { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_dedicated_variant() {
        let err: EdgeError = ToolError::NotFound { command: "nmap".into() }.into();
        assert!(matches!(err, EdgeError::ToolNotFound { ref command } if command == "nmap"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_input_errors_exit_with_one() {
        assert_eq!(EdgeError::InvalidInput("no file".into()).exit_code(), 1);
        let err: EdgeError = ClassificationError::Ambiguous { line: "x".into() }.into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_diagnostic_skips_blank_output() {
        let err = ToolError::ExecutionFailed {
            command: "nmap".into(),
            status: "exit status: 1".into(),
            output: "  \n".into(),
        };
        assert_eq!(err.diagnostic(), None);
    }
}
