use std::io;
use std::time::Duration;

/// Why a run did not produce a [`RunResult`](crate::RunResult).
///
/// A non-zero exit code is not an error: it resolves normally with
/// `success == false`. Only [`ProcessEngine::run_json`](crate::ProcessEngine::run_json)
/// turns it into [`RunError::CommandFailed`].
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("command `{command}` is not in the allowlist")]
    CommandNotAllowed { command: String },

    #[error("command cannot be empty")]
    EmptyCommand,

    #[error("invalid command `{command}`: {reason}")]
    InvalidCommand { command: String, reason: String },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` timed out after {}ms", timeout.as_millis())]
    TimedOut { command: String, timeout: Duration },

    #[error("`{command}` was cancelled")]
    Cancelled { command: String },

    #[error("`{command}` exited with code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("`{command}` returned malformed JSON: {source}")]
    MalformedJson {
        command: String,
        stdout: String,
        #[source]
        source: serde_json::Error,
    },

    /// The engine refused to start the run.
    #[error("process engine has been disposed")]
    Disposed,

    /// The run was already spawned when the engine was disposed.
    #[error("`{command}` was stopped because the process engine was disposed")]
    Interrupted { command: String },
}

impl RunError {
    /// True when the process was never started.
    pub fn is_rejected_before_spawn(&self) -> bool {
        matches!(
            self,
            Self::CommandNotAllowed { .. }
                | Self::EmptyCommand
                | Self::InvalidCommand { .. }
                | Self::Disposed
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_includes_duration() {
        let error = RunError::TimedOut {
            command: "webforge doctor".to_string(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(error.to_string(), "`webforge doctor` timed out after 250ms");
        assert!(error.is_timeout());
        assert!(!error.is_rejected_before_spawn());
    }

    #[test]
    fn rejection_kinds() {
        assert!(
            RunError::CommandNotAllowed {
                command: "bash".to_string()
            }
            .is_rejected_before_spawn()
        );
        assert!(RunError::Disposed.is_rejected_before_spawn());
        assert!(
            !RunError::Interrupted {
                command: "sleep 5".to_string()
            }
            .is_rejected_before_spawn()
        );
    }
}
