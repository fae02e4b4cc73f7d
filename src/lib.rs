//! # toolbridge
//!
//! Finds a framework CLI and runs it safely on behalf of an editor
//! integration.
//!
//! The crate is layered like this:
//!
//! - [`ToolDetector`] locates the tool: a workspace-local install first, then
//!   a global one on `PATH`, then an on-demand package runner. The result
//!   ([`ToolInfo`]) carries the version and the subcommands found in
//!   `--help`, and is cached for a configurable TTL.
//! - [`ProcessEngine`] (from `toolbridge-runner`) spawns allowlisted commands
//!   with sanitized arguments and a whitelisted environment, streams output,
//!   and enforces timeouts and cancellation. It tracks every live child so that
//!   [`ProcessEngine::dispose`] can terminate all of them.
//! - [`ToolClient`] ties the two together into task-level operations such as
//!   `generate`, `analyze` and `doctor`. Input is validated before any process
//!   starts.
//!
//! ```no_run
//! use std::sync::Arc;
//! use toolbridge::{CommandOptions, ConfigManager, StaticWorkspacePaths, ToolClient};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let manager = ConfigManager::load_from_workspace("/path/to/project")?;
//! let workspace = Arc::new(StaticWorkspacePaths::new("/path/to/project"));
//! let client = ToolClient::from_config(manager.config(), workspace);
//!
//! let result = client
//!     .generate("component", "UserCard", &CommandOptions::new())
//!     .await?;
//! println!("{}", result.output());
//! client.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! Configuration lives in an optional `toolbridge.toml` at the workspace
//! root; see [`BridgeConfig`].

pub mod client;
pub mod detector;
pub mod error;
pub mod logging;

pub use client::{
    CommandOptions, GeneratorKind, OperationCommand, OperationKind, OptionValueKind, RunOverrides,
    ToolClient,
};
pub use detector::{DetectionCache, InstallKind, ToolDetector, ToolInfo};
pub use error::{ToolError, ToolResult};
pub use logging::init_tracing;

pub use toolbridge_commons::{
    MemoryOutputSink, NoopOutputSink, OutputSink, StaticWorkspacePaths, TracingOutputSink,
    WorkspacePaths,
};
pub use toolbridge_config::{BridgeConfig, ConfigManager};
pub use toolbridge_runner::{
    CancellationToken, Invocation, ProcessEngine, RunError, RunId, RunRequest, RunResult,
    RunSnapshot, SecurityPolicy,
};
