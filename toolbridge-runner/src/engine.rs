use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::process::Child;
use tokio_util::sync::CancellationToken;
use toolbridge_commons::{OutputSink, WorkspacePaths};
use toolbridge_config::BridgeConfig;
use tracing::{debug, info, warn};

use crate::error::RunError;
use crate::policy::{SecurityPolicy, validate_args};
use crate::registry::{ProcessRegistry, RunEntry, RunId, RunSnapshot};
use crate::request::{RunRequest, RunResult};
use crate::spawner::{ProcessSpawner, SpawnSpec, TokioSpawner};
use crate::stream::CapturedStream;
use crate::termination::TerminationPolicy;

/// How long to keep reading pipes after the child exited. Grandchildren
/// that inherited the pipes can otherwise hold a run open indefinitely.
const OUTPUT_DRAIN_LIMIT: Duration = Duration::from_millis(500);

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    TimedOut(Duration),
}

/// Spawns allowlisted commands and owns every child it started.
///
/// Each call to [`run`](Self::run) validates the command, spawns it with a
/// whitelisted environment, registers it, and settles exactly once: normal
/// exit, timeout, cancellation, or error. The registry entry is gone before
/// the returned future resolves. [`dispose`](Self::dispose) terminates every
/// child still tracked and makes the engine reject further runs.
pub struct ProcessEngine {
    policy: SecurityPolicy,
    spawner: Arc<dyn ProcessSpawner>,
    registry: Arc<ProcessRegistry>,
    termination: TerminationPolicy,
    workspace: Option<Arc<dyn WorkspacePaths>>,
    json_flag: String,
    disposed: AtomicBool,
}

impl ProcessEngine {
    pub fn new(policy: SecurityPolicy) -> Self {
        Self {
            policy,
            spawner: Arc::new(TokioSpawner),
            registry: Arc::new(ProcessRegistry::new()),
            termination: TerminationPolicy::default(),
            workspace: None,
            json_flag: toolbridge_config::constants::defaults::JSON_FLAG.to_string(),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(SecurityPolicy::from_config(&config.tool, &config.security))
            .with_termination(TerminationPolicy::from_config(&config.runner))
            .with_json_flag(config.tool.json_flag.clone())
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn ProcessSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn with_termination(mut self, termination: TerminationPolicy) -> Self {
        self.termination = termination;
        self
    }

    /// Root used as the working directory when a request names none.
    pub fn with_workspace(mut self, workspace: Arc<dyn WorkspacePaths>) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn with_json_flag(mut self, json_flag: impl Into<String>) -> Self {
        self.json_flag = json_flag.into();
        self
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    pub fn workspace_root(&self) -> Option<std::path::PathBuf> {
        self.workspace
            .as_ref()
            .and_then(|workspace| workspace.workspace_root())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Run to completion. A non-zero exit resolves with `success == false`.
    pub async fn run(&self, request: RunRequest) -> Result<RunResult, RunError> {
        self.execute(request).await
    }

    /// Like [`run`](Self::run), additionally teeing stdout and stderr into
    /// `sink` as chunks arrive.
    pub async fn run_with_output(
        &self,
        mut request: RunRequest,
        sink: Arc<dyn OutputSink>,
    ) -> Result<RunResult, RunError> {
        request.on_stdout = Some(tee(request.on_stdout.take(), Arc::clone(&sink)));
        request.on_stderr = Some(tee(request.on_stderr.take(), sink));
        self.execute(request).await
    }

    /// Run with the JSON flag appended and parse stdout.
    ///
    /// Unlike [`run`](Self::run), a non-zero exit is an error here
    /// ([`RunError::CommandFailed`]); unparsable stdout is
    /// [`RunError::MalformedJson`].
    pub async fn run_json<T: DeserializeOwned>(
        &self,
        mut request: RunRequest,
    ) -> Result<T, RunError> {
        if !self.json_flag.is_empty() && !request.args.iter().any(|arg| arg == &self.json_flag) {
            request.args.push(self.json_flag.clone());
        }
        let command = request.display();
        let result = self.execute(request).await?;
        if !result.success() {
            return Err(RunError::CommandFailed {
                command,
                exit_code: result.exit_code(),
                stderr: result.stderr().trim().to_string(),
            });
        }
        serde_json::from_str(result.stdout().trim()).map_err(|source| RunError::MalformedJson {
            command,
            stdout: result.into_stdout(),
            source,
        })
    }

    /// Ask a live run to stop. Returns `false` when `id` is not tracked.
    pub fn cancel(&self, id: RunId) -> bool {
        match self.registry.cancel_token(id) {
            Some(token) => {
                debug!(run = %id, "cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every live run. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let tokens = self.registry.cancel_tokens();
        for token in &tokens {
            token.cancel();
        }
        tokens.len()
    }

    pub fn active_runs(&self) -> Vec<RunSnapshot> {
        self.registry.snapshot()
    }

    /// Terminate every tracked child and reject later runs.
    ///
    /// Children get the polite signal immediately and a forced kill after
    /// the grace period if still alive. Safe to call repeatedly.
    pub fn dispose(&self) {
        let first = !self.disposed.swap(true, Ordering::AcqRel);
        let entries = self.registry.drain();
        if first || !entries.is_empty() {
            info!(tracked = entries.len(), "disposing process engine");
        }
        for (id, entry) in entries {
            entry.cancel.cancel();
            let Some(pid) = entry.pid else {
                continue;
            };
            if let Err(err) = self.termination.terminate(pid, entry.exited) {
                warn!(run = %id, pid, error = %err, "failed to terminate process during dispose");
            }
        }
    }

    async fn execute(&self, request: RunRequest) -> Result<RunResult, RunError> {
        if self.is_disposed() {
            return Err(RunError::Disposed);
        }

        let executable = request.command.executable();
        if executable.trim().is_empty() {
            return Err(RunError::EmptyCommand);
        }
        if !self.policy.is_allowed_command(executable) {
            warn!(command = %executable, "rejected command outside the allowlist");
            return Err(RunError::CommandNotAllowed {
                command: executable.to_string(),
            });
        }

        let raw_args: Vec<&str> = request
            .command
            .leading_args()
            .iter()
            .chain(request.args.iter())
            .map(String::as_str)
            .collect();
        let args = validate_args(&raw_args);
        let command_line = std::iter::once(executable.to_string())
            .chain(args.iter().map(|arg| shell_words::quote(arg).into_owned()))
            .collect::<Vec<_>>()
            .join(" ");

        let spec = SpawnSpec {
            program: executable.to_string(),
            args,
            cwd: request.cwd.clone().or_else(|| self.workspace_root()),
            env: self.policy.safe_environment(&request.env),
        };

        debug!(command = %command_line, cwd = ?spec.cwd, timeout = ?request.timeout, "spawning process");
        let mut child = self.spawner.spawn(&spec).map_err(|source| RunError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let id = self.registry.next_id();
        let pid = child.id();
        let cancel = CancellationToken::new();
        let exited = CancellationToken::new();
        self.registry.insert(
            id,
            RunEntry {
                pid,
                command: command_line.clone(),
                started_at: Instant::now(),
                cancel: cancel.clone(),
                exited: exited.clone(),
            },
        );
        let _registration = Registration {
            registry: Arc::clone(&self.registry),
            termination: self.termination,
            id,
        };

        // dispose() may have drained the registry between the check above
        // and the insert; the guard terminates the child.
        if self.is_disposed() {
            return Err(RunError::Interrupted {
                command: command_line,
            });
        }

        let stdout = child
            .stdout
            .take()
            .map(|pipe| CapturedStream::spawn(pipe, request.on_stdout.clone()));
        let stderr = child
            .stderr
            .take()
            .map(|pipe| CapturedStream::spawn(pipe, request.on_stderr.clone()));

        let outcome = tokio::select! {
            biased;
            status = child.wait() => Outcome::Exited(status),
            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = wait_for_token(request.cancellation.clone()) => Outcome::Cancelled,
            elapsed = wait_for_timeout(request.timeout) => Outcome::TimedOut(elapsed),
        };

        match outcome {
            Outcome::Exited(Ok(status)) => {
                self.registry.remove(id);
                exited.cancel();
                let stdout = finish_stream(stdout).await;
                let stderr = finish_stream(stderr).await;
                let result = RunResult::new(stdout, stderr, status.code());
                debug!(
                    run = %id,
                    command = %command_line,
                    exit_code = result.exit_code(),
                    success = result.success(),
                    "process exited"
                );
                Ok(result)
            }
            Outcome::Exited(Err(source)) => {
                self.stop(id, child, exited, stdout, stderr);
                Err(RunError::Wait {
                    command: command_line,
                    source,
                })
            }
            Outcome::Cancelled => {
                self.stop(id, child, exited, stdout, stderr);
                if self.is_disposed() {
                    debug!(run = %id, command = %command_line, "run interrupted by dispose");
                    return Err(RunError::Interrupted {
                        command: command_line,
                    });
                }
                debug!(run = %id, command = %command_line, "run cancelled");
                Err(RunError::Cancelled { command: command_line })
            }
            Outcome::TimedOut(timeout) => {
                self.stop(id, child, exited, stdout, stderr);
                warn!(
                    run = %id,
                    command = %command_line,
                    timeout_ms = timeout.as_millis() as u64,
                    "run timed out"
                );
                Err(RunError::TimedOut {
                    command: command_line,
                    timeout,
                })
            }
        }
    }

    /// Deregister, terminate if nobody else has, and hand the child to a
    /// background reaper so the caller does not wait for it to die.
    fn stop(
        &self,
        id: RunId,
        mut child: Child,
        exited: CancellationToken,
        stdout: Option<CapturedStream>,
        stderr: Option<CapturedStream>,
    ) {
        if let Some(entry) = self.registry.remove(id)
            && let Some(pid) = entry.pid
            && let Err(err) = self.termination.terminate(pid, entry.exited)
        {
            warn!(run = %id, pid, error = %err, "failed to send termination signal");
        }
        for stream in [stdout, stderr].into_iter().flatten() {
            stream.abort();
        }
        tokio::spawn(async move {
            let _ = child.wait().await;
            exited.cancel();
        });
    }
}

impl Drop for ProcessEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for ProcessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEngine")
            .field("policy", &self.policy)
            .field("termination", &self.termination)
            .field("active_runs", &self.registry.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Removes the registry entry if the run future is dropped mid-flight.
struct Registration {
    registry: Arc<ProcessRegistry>,
    termination: TerminationPolicy,
    id: RunId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(entry) = self.registry.remove(self.id)
            && let Some(pid) = entry.pid
            && let Err(err) = self.termination.terminate(pid, entry.exited)
        {
            warn!(run = %self.id, pid, error = %err, "failed to terminate abandoned process");
        }
    }
}

async fn wait_for_token(token: Option<CancellationToken>) {
    match token {
        Some(token) => token.cancelled_owned().await,
        None => std::future::pending().await,
    }
}

async fn wait_for_timeout(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(duration) => {
            tokio::time::sleep(duration).await;
            duration
        }
        None => std::future::pending().await,
    }
}

async fn finish_stream(stream: Option<CapturedStream>) -> String {
    match stream {
        Some(stream) => stream.finish(OUTPUT_DRAIN_LIMIT).await,
        None => String::new(),
    }
}

fn tee(existing: Option<Arc<dyn OutputSink>>, sink: Arc<dyn OutputSink>) -> Arc<dyn OutputSink> {
    match existing {
        Some(existing) => Arc::new(move |chunk: &str| {
            existing.write(chunk);
            sink.write(chunk);
        }) as Arc<dyn OutputSink>,
        None => sink,
    }
}
