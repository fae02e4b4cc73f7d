//! Configuration for the toolbridge engine.
//!
//! Every section is optional in `toolbridge.toml`; missing keys fall back to
//! the defaults in [`constants`]. The loader validates the merged result so a
//! bad file is reported once at startup instead of failing a run later.

pub mod constants;
pub mod debug;
pub mod detection;
pub mod loader;
pub mod runner;
pub mod security;
pub mod tool;

pub use debug::{LoggingConfig, TraceLevel};
pub use detection::DetectionConfig;
pub use loader::{BridgeConfig, ConfigManager};
pub use runner::RunnerConfig;
pub use security::SecurityConfig;
pub use tool::ToolConfig;
