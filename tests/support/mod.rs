#![allow(dead_code)]

use assert_fs::TempDir;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::process::Child;
use toolbridge::{BridgeConfig, ProcessEngine, StaticWorkspacePaths, ToolDetector};
use toolbridge_runner::{ProcessSpawner, SpawnSpec, TokioSpawner};

pub const FULL_HELP: &[&str] = &["generate", "analyze", "doctor", "add"];

#[derive(Default)]
pub struct CountingSpawner {
    calls: AtomicUsize,
}

impl CountingSpawner {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProcessSpawner for CountingSpawner {
    fn spawn(&self, spec: &SpawnSpec) -> io::Result<Child> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        TokioSpawner.spawn(spec)
    }
}

/// Writes a fake `webforge` at `path`. Every invocation appends its first
/// argument to `<dir>/calls.log`.
pub fn write_tool(path: &Path, help_commands: &[&str]) -> io::Result<PathBuf> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::other("tool path has no parent"))?;
    fs::create_dir_all(dir)?;
    let log = dir.join("calls.log");
    let help: String = help_commands
        .iter()
        .map(|name| format!("    echo \"  {name}   Run {name}\"\n"))
        .collect();
    let body = format!(
        r#"#!/bin/sh
echo "$1" >> "{log}"
case "$1" in
  --version) echo "2.4.1" ;;
  --help)
    echo "Usage: webforge <command>"
    echo ""
{help}    ;;
  analyze)
    for arg in "$@"; do last="$arg"; done
    printf '{{"files":3,"last":"%s"}}\n' "$last"
    ;;
  env-check) echo "mode=$WEBFORGE_MODE" ;;
  fail) echo "boom" >&2; exit 4 ;;
  *) echo "ran $*" ;;
esac
"#,
        log = log.display(),
    );
    fs::write(path, body)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(log)
}

/// Installs the fake tool under `<root>/node_modules/.bin`.
pub fn install_local(root: &Path, help_commands: &[&str]) -> io::Result<PathBuf> {
    write_tool(&root.join("node_modules/.bin/webforge"), help_commands)
}

/// How many times the tool was invoked with `first_arg`.
pub fn invocations(log: &Path, first_arg: &str) -> usize {
    fs::read_to_string(log)
        .map(|text| text.lines().filter(|line| *line == first_arg).count())
        .unwrap_or(0)
}

pub struct Fixture {
    pub temp: TempDir,
    pub root: PathBuf,
    pub empty_path: PathBuf,
}

impl Fixture {
    pub fn new() -> io::Result<Self> {
        let temp = TempDir::new().map_err(io::Error::other)?;
        let base = temp.path().canonicalize()?;
        let root = base.join("project");
        let empty_path = base.join("empty-path");
        fs::create_dir_all(&root)?;
        fs::create_dir_all(&empty_path)?;
        Ok(Self {
            temp,
            root,
            empty_path,
        })
    }

    pub fn engine(&self, config: &BridgeConfig) -> ProcessEngine {
        ProcessEngine::from_config(config)
            .with_workspace(Arc::new(StaticWorkspacePaths::new(self.root.clone())))
    }

    /// Detector that never looks at the real `PATH`.
    pub fn detector(&self, engine: ProcessEngine, config: &BridgeConfig) -> ToolDetector {
        ToolDetector::new(
            Arc::new(engine),
            Arc::new(StaticWorkspacePaths::new(self.root.clone())),
            config,
        )
        .with_search_path(self.empty_path.clone())
    }
}
