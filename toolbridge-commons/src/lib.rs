//! Shared traits and helper types reused across the toolbridge crates.
//! The detector, runner and facade only talk to their host through these
//! contracts, so an editor integration can supply its own workspace root and
//! output panel without the core depending on any editor API.

pub mod paths;
pub mod reference;
pub mod sink;

pub use paths::{WorkspacePaths, is_safe_relative_path, normalize_path, secure_path};
pub use reference::{MemoryOutputSink, StaticWorkspacePaths};
pub use sink::{NoopOutputSink, OutputSink, TracingOutputSink};
