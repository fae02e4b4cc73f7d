use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};

/// Fully validated description of a child to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Complete environment of the child. Nothing else is inherited.
    pub env: HashMap<String, String>,
}

/// Starts OS processes. Swappable so tests can observe or refuse spawns.
pub trait ProcessSpawner: Send + Sync {
    /// Start the child with piped stdout/stderr and a closed stdin.
    fn spawn(&self, spec: &SpawnSpec) -> io::Result<Child>;
}

/// Spawns through `tokio::process` without a shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSpawner;

impl ProcessSpawner for TokioSpawner {
    fn spawn(&self, spec: &SpawnSpec) -> io::Result<Child> {
        if spec.program.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "missing program for spawn",
            ));
        }

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .env_clear()
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        // Own process group so termination reaches grandchildren.
        #[cfg(unix)]
        command.process_group(0);

        command.spawn()
    }
}
