use anyhow::{Context, Result, anyhow};
use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// Normalize a path by resolving `.` and `..` components lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.to_path_buf().clean()
}

/// Return a canonicalised absolute path that is guaranteed to reside inside the
/// provided `workspace_root`. If the path is outside the workspace an error is
/// returned.
///
/// Callers use this to confine the working directory of a run before handing
/// it to the engine; the engine itself does not second-guess the directory.
pub fn secure_path(workspace_root: &Path, user_path: &Path) -> Result<PathBuf> {
    let joined = if user_path.is_absolute() {
        user_path.to_path_buf()
    } else {
        workspace_root.join(user_path)
    };

    let canonical = std::fs::canonicalize(&joined)
        .with_context(|| format!("Failed to canonicalize path {}", joined.display()))?;

    let workspace_canonical = std::fs::canonicalize(workspace_root).with_context(|| {
        format!(
            "Failed to canonicalize workspace root {}",
            workspace_root.display()
        )
    })?;
    if !canonical.starts_with(&workspace_canonical) {
        return Err(anyhow!(
            "Path {} escapes workspace root {}",
            canonical.display(),
            workspace_canonical.display()
        ));
    }
    Ok(canonical)
}

/// Check if a path string is a safe relative path (no traversal, no absolute).
pub fn is_safe_relative_path(path: &str) -> bool {
    let path = path.trim();
    if path.is_empty() {
        return false;
    }

    if path.contains("..") {
        return false;
    }

    if path.starts_with('/') || path.starts_with('\\') || path.contains(':') {
        return false;
    }

    true
}

/// Supplies the workspace the wrapped tool operates on.
///
/// Editors may have no folder open, so the root is optional. Local-install
/// detection and the default working directory both depend on it.
pub trait WorkspacePaths: Send + Sync {
    /// Absolute path to the workspace root, if one is open.
    fn workspace_root(&self) -> Option<PathBuf>;

    /// Resolve a path relative to the workspace root.
    fn resolve(&self, relative: &Path) -> Option<PathBuf> {
        self.workspace_root().map(|root| root.join(relative))
    }
}
