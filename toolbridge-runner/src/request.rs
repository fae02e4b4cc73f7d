use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use toolbridge_commons::OutputSink;

use crate::invocation::Invocation;

/// Everything needed to run one command.
///
/// `args` are the caller's arguments; they are appended after the
/// invocation's leading arguments and sanitized together with them.
#[derive(Clone)]
pub struct RunRequest {
    pub command: Invocation,
    pub args: Vec<String>,
    /// Defaults to the engine's workspace root.
    pub cwd: Option<PathBuf>,
    /// Overlaid on top of the whitelisted parent environment.
    pub env: HashMap<String, String>,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub cancellation: Option<CancellationToken>,
    pub on_stdout: Option<Arc<dyn OutputSink>>,
    pub on_stderr: Option<Arc<dyn OutputSink>>,
}

impl RunRequest {
    pub fn new(command: Invocation) -> Self {
        Self {
            command,
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            timeout: None,
            cancellation: None,
            on_stdout: None,
            on_stderr: None,
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn on_stdout(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.on_stdout = Some(sink);
        self
    }

    pub fn on_stderr(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.on_stderr = Some(sink);
        self
    }

    /// Command line as it will be logged, before sanitization.
    pub fn display(&self) -> String {
        let mut display = self.command.display();
        for arg in &self.args {
            display.push(' ');
            display.push_str(&shell_words::quote(arg));
        }
        display
    }
}

impl fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRequest")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .field("env_keys", &self.env.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .field("cancellable", &self.cancellation.is_some())
            .field("on_stdout", &self.on_stdout.is_some())
            .field("on_stderr", &self.on_stderr.is_some())
            .finish()
    }
}

/// Outcome of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    stdout: String,
    stderr: String,
    exit_code: i32,
    success: bool,
}

impl RunResult {
    /// A missing exit code (the child was ended by a signal) is reported as
    /// `0`, and `success` is derived from the reported code.
    pub fn new(stdout: String, stderr: String, exit_code: Option<i32>) -> Self {
        let exit_code = exit_code.unwrap_or(0);
        Self {
            stdout,
            stderr,
            exit_code,
            success: exit_code == 0,
        }
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Stdout when the tool printed anything there, otherwise stderr.
    pub fn output(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }

    pub fn into_stdout(self) -> String {
        self.stdout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_prefers_stdout() {
        let result = RunResult::new("done\n".into(), "warn\n".into(), Some(0));
        assert_eq!(result.output(), "done\n");
        assert!(result.success());

        let result = RunResult::new("  \n".into(), "boom\n".into(), Some(2));
        assert_eq!(result.output(), "boom\n");
        assert_eq!(result.exit_code(), 2);
        assert!(!result.success());
    }

    #[test]
    fn missing_exit_code_reads_as_zero() {
        let result = RunResult::new(String::new(), String::new(), None);
        assert_eq!(result.exit_code(), 0);
        assert!(result.success());
    }

    #[test]
    fn display_appends_quoted_args() {
        let request = RunRequest::new(Invocation::with_leading_args("npx", ["--yes", "webforge"]))
            .args(["generate", "component", "My Button"]);
        assert_eq!(
            request.display(),
            "npx --yes webforge generate component 'My Button'"
        );
    }
}
