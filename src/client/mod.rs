//! Task-level operations on the detected tool.

mod operation;

pub use operation::{
    CommandOptions, GeneratorKind, OperationCommand, OperationKind, OptionValueKind,
};

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use toolbridge_commons::{OutputSink, WorkspacePaths, secure_path};
use toolbridge_config::{BridgeConfig, RunnerConfig};
use toolbridge_runner::{CancellationToken, ProcessEngine, RunRequest, RunResult};
use tracing::{debug, info};

use crate::detector::{ToolDetector, ToolInfo};
use crate::error::{ToolError, ToolResult};

/// Per-call settings for [`ToolClient::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    /// Must resolve inside the workspace root when one is open.
    pub cwd: Option<PathBuf>,
    pub env: HashMap<String, String>,
    /// Falls back to `runner.default_timeout_seconds` when unset.
    pub timeout: Option<Duration>,
    pub cancellation: Option<CancellationToken>,
}

/// Facade over detection and execution.
///
/// Every operation validates its input first, then resolves the tool
/// through the detector (cached when fresh), then runs it through the
/// engine. Invalid input never starts a process, probes included.
pub struct ToolClient {
    detector: Arc<ToolDetector>,
    engine: Arc<ProcessEngine>,
    runner: RunnerConfig,
    output: Option<Arc<dyn OutputSink>>,
}

impl ToolClient {
    /// Runs commands through the same engine the detector probes with.
    pub fn new(detector: Arc<ToolDetector>, runner: RunnerConfig) -> Self {
        let engine = Arc::clone(detector.engine());
        Self {
            detector,
            engine,
            runner,
            output: None,
        }
    }

    pub fn from_config(config: &BridgeConfig, workspace: Arc<dyn WorkspacePaths>) -> Self {
        let engine =
            Arc::new(ProcessEngine::from_config(config).with_workspace(Arc::clone(&workspace)));
        let detector = Arc::new(ToolDetector::new(engine, workspace, config));
        Self::new(detector, config.runner.clone())
    }

    /// Tee the output of every command into `sink`, e.g. an output panel.
    pub fn with_output(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.output = Some(sink);
        self
    }

    pub fn detector(&self) -> &Arc<ToolDetector> {
        &self.detector
    }

    pub fn engine(&self) -> &Arc<ProcessEngine> {
        &self.engine
    }

    pub async fn version(&self) -> ToolResult<String> {
        let info = self.require_tool().await?;
        Ok(info.version().to_string())
    }

    /// `<tool> generate <kind> <name> [flags]`.
    pub async fn generate(
        &self,
        kind: &str,
        name: &str,
        options: &CommandOptions,
    ) -> ToolResult<RunResult> {
        let command = OperationCommand::generate(kind, name, options)?;
        self.execute(command).await
    }

    /// `<tool> add <feature> [flags]`.
    pub async fn add_feature(
        &self,
        feature: &str,
        options: &CommandOptions,
    ) -> ToolResult<RunResult> {
        let command = OperationCommand::add_feature(feature, options)?;
        self.execute(command).await
    }

    /// `<tool> analyze [flags] --json`, parsed into `T`.
    pub async fn analyze<T: DeserializeOwned>(&self, options: &CommandOptions) -> ToolResult<T> {
        let command = OperationCommand::analyze(options)?;
        let request = self.prepare(command).await?;
        let report = self.engine.run_json(request).await?;
        Ok(report)
    }

    pub async fn doctor(&self) -> ToolResult<RunResult> {
        self.doctor_with(&CommandOptions::new()).await
    }

    pub async fn doctor_with(&self, options: &CommandOptions) -> ToolResult<RunResult> {
        let command = OperationCommand::doctor(options)?;
        self.execute(command).await
    }

    /// Run the tool with arbitrary arguments, as task providers do.
    ///
    /// Arguments are not checked against a table, but the engine still
    /// sanitizes them and applies the allowlist.
    pub async fn run<I, S>(&self, args: I, overrides: RunOverrides) -> ToolResult<RunResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let cwd = match (overrides.cwd, self.engine.workspace_root()) {
            (Some(cwd), Some(root)) => Some(
                secure_path(&root, &cwd)
                    .map_err(|err| ToolError::invalid("cwd", format!("{err:#}")))?,
            ),
            (cwd, _) => cwd,
        };
        let info = self.require_tool().await?;

        let mut request = RunRequest::new(info.invocation().clone())
            .args(args)
            .timeout(overrides.timeout.or_else(|| self.runner.default_timeout()));
        if let Some(cwd) = cwd {
            request = request.cwd(cwd);
        }
        for (key, value) in overrides.env {
            request = request.env(key, value);
        }
        if let Some(token) = overrides.cancellation {
            request = request.cancellation(token);
        }
        self.dispatch(request).await
    }

    /// Terminate everything the engine still runs and forget the detection.
    pub fn dispose(&self) {
        self.engine.dispose();
        self.detector.clear_cache();
    }

    async fn require_tool(&self) -> ToolResult<Arc<ToolInfo>> {
        self.detector.detect(false).await.ok_or_else(|| {
            let tool = self.detector.tool();
            ToolError::NotDetected {
                binary: tool.binary.clone(),
                runner: tool.runner.clone(),
            }
        })
    }

    async fn prepare(&self, command: OperationCommand) -> ToolResult<RunRequest> {
        let info = self.require_tool().await?;
        let kind = command.kind();
        let subcommand = kind.subcommand();
        if !info.supports(subcommand) {
            return Err(ToolError::UnsupportedFeature {
                feature: subcommand.to_string(),
            });
        }
        Ok(RunRequest::new(info.invocation().clone())
            .args(command.into_args())
            .timeout(kind.timeout(&self.runner)))
    }

    async fn execute(&self, command: OperationCommand) -> ToolResult<RunResult> {
        let request = self.prepare(command).await?;
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: RunRequest) -> ToolResult<RunResult> {
        let command_line = request.display();
        debug!(command = %command_line, "running tool command");
        let result = match &self.output {
            Some(sink) => {
                self.engine
                    .run_with_output(request, Arc::clone(sink))
                    .await?
            }
            None => self.engine.run(request).await?,
        };
        info!(
            command = %command_line,
            exit_code = result.exit_code(),
            success = result.success(),
            "tool command finished"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for ToolClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolClient")
            .field("detector", &self.detector)
            .field("runner", &self.runner)
            .field("output", &self.output.is_some())
            .finish()
    }
}
