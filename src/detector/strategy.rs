//! Where to look for the tool, in order of preference.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use toolbridge_commons::normalize_path;
use toolbridge_config::ToolConfig;
use toolbridge_runner::{Invocation, is_valid_executable_path};
use tracing::{debug, warn};

use super::InstallKind;

/// A candidate invocation produced by one strategy, not yet probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub(crate) invocation: Invocation,
    pub(crate) install_kind: InstallKind,
}

/// `<root>/<local_bin_dir>/<binary>` if it exists and is executable.
pub(crate) fn local(workspace_root: Option<&Path>, tool: &ToolConfig) -> Option<Candidate> {
    let root = workspace_root?;
    let bin_dir = normalize_path(&root.join(&tool.local_bin_dir));
    local_file_names(&tool.binary)
        .into_iter()
        .map(|name| bin_dir.join(name))
        .find(|path| is_executable(path))
        .and_then(|path| {
            let path = path.to_str()?.to_string();
            debug!(path = %path, "found workspace-local install");
            Some(Candidate {
                invocation: Invocation::new(path),
                install_kind: InstallKind::Local,
            })
        })
}

/// The binary as resolved from `PATH`, provided the resolved path passes
/// validation.
pub(crate) fn global(tool: &ToolConfig, search_path: Option<&OsString>) -> Option<Candidate> {
    let path = resolve_validated(&tool.binary, search_path)?;
    debug!(path = %path, "found global install");
    Some(Candidate {
        invocation: Invocation::new(path),
        install_kind: InstallKind::Global,
    })
}

/// `<runner> --yes <package>`; the caller must still confirm it works.
pub(crate) fn on_demand(tool: &ToolConfig, search_path: Option<&OsString>) -> Option<Candidate> {
    let runner = resolve_validated(&tool.runner, search_path)?;
    debug!(runner = %runner, package = %tool.package, "trying on-demand runner");
    Some(Candidate {
        invocation: Invocation::with_leading_args(runner, ["--yes", tool.package.as_str()]),
        install_kind: InstallKind::OnDemand,
    })
}

fn resolve_validated(name: &str, search_path: Option<&OsString>) -> Option<String> {
    let resolved = resolve(name, search_path)?;
    let Some(path) = resolved.to_str() else {
        warn!(command = name, "resolved path is not valid UTF-8; ignoring it");
        return None;
    };
    if !is_valid_executable_path(path) {
        warn!(command = name, path, "resolved path failed validation; ignoring it");
        return None;
    }
    Some(path.to_string())
}

fn resolve(name: &str, search_path: Option<&OsString>) -> Option<PathBuf> {
    let resolved = match search_path {
        Some(paths) => {
            let cwd = std::env::current_dir().ok()?;
            which::which_in(name, Some(paths), cwd)
        }
        None => which::which(name),
    };
    resolved.ok()
}

#[cfg(windows)]
fn local_file_names(binary: &str) -> Vec<String> {
    vec![format!("{binary}.cmd"), format!("{binary}.exe"), binary.to_string()]
}

#[cfg(not(windows))]
fn local_file_names(binary: &str) -> Vec<String> {
    vec![binary.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn write_file(path: &Path, mode: u32) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, "#!/bin/sh\n")?;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[test]
    fn local_requires_executable_bit() -> std::io::Result<()> {
        let temp = TempDir::new().map_err(std::io::Error::other)?;
        let tool = ToolConfig::default();
        let bin = temp.path().join("node_modules/.bin/webforge");

        assert!(local(Some(temp.path()), &tool).is_none());

        write_file(&bin, 0o644)?;
        assert!(local(Some(temp.path()), &tool).is_none());

        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755))?;
        let candidate = local(Some(temp.path()), &tool);
        assert_eq!(
            candidate.map(|candidate| candidate.install_kind),
            Some(InstallKind::Local)
        );
        Ok(())
    }

    #[test]
    fn local_needs_a_workspace() {
        assert!(local(None, &ToolConfig::default()).is_none());
    }

    #[test]
    fn global_resolves_on_the_search_path() -> std::io::Result<()> {
        let temp = TempDir::new().map_err(std::io::Error::other)?;
        let root = temp.path().canonicalize()?;
        write_file(&root.join("webforge"), 0o755)?;

        let search = OsString::from(&root);
        let candidate = global(&ToolConfig::default(), Some(&search));
        let expected = root.join("webforge");
        assert_eq!(
            candidate.map(|candidate| candidate.invocation.executable().to_string()),
            expected.to_str().map(ToString::to_string)
        );
        Ok(())
    }

    #[test]
    fn global_rejects_paths_that_fail_validation() -> std::io::Result<()> {
        let temp = TempDir::new().map_err(std::io::Error::other)?;
        let dir = temp.path().canonicalize()?.join("with space");
        write_file(&dir.join("webforge"), 0o755)?;

        let search = OsString::from(&dir);
        assert!(global(&ToolConfig::default(), Some(&search)).is_none());
        Ok(())
    }

    #[test]
    fn on_demand_builds_runner_invocation() -> std::io::Result<()> {
        let temp = TempDir::new().map_err(std::io::Error::other)?;
        let root = temp.path().canonicalize()?;
        write_file(&root.join("npx"), 0o755)?;

        let search = OsString::from(&root);
        let candidate = on_demand(&ToolConfig::default(), Some(&search));
        let leading = candidate
            .as_ref()
            .map(|candidate| candidate.invocation.leading_args().to_vec());
        assert_eq!(
            leading,
            Some(vec!["--yes".to_string(), "@webforge/cli".to_string()])
        );
        Ok(())
    }
}
