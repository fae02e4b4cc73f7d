//! Child process execution behind an explicit trust boundary.
//!
//! Every command goes through [`SecurityPolicy`] before the OS sees it:
//! executables must be on the allowlist, arguments are stripped of shell
//! metacharacters, and children get a whitelisted environment instead of the
//! parent's. [`ProcessEngine`] then spawns, streams output to caller sinks,
//! enforces timeouts and cancellation, and keeps a registry of live children
//! so that disposal can terminate all of them.

pub mod engine;
pub mod error;
pub mod invocation;
pub mod policy;
pub mod process_group;
pub mod registry;
pub mod request;
pub mod spawner;
pub mod stream;
pub mod termination;

pub use engine::ProcessEngine;
pub use error::RunError;
pub use invocation::Invocation;
pub use policy::{SecurityPolicy, is_valid_executable_path, sanitize_argument, validate_args};
pub use registry::{ProcessRegistry, RunId, RunSnapshot};
pub use request::{RunRequest, RunResult};
pub use spawner::{ProcessSpawner, SpawnSpec, TokioSpawner};
pub use termination::TerminationPolicy;
pub use tokio_util::sync::CancellationToken;
