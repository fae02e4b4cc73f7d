//! Trust boundary checks applied before anything reaches the OS.
//!
//! Everything here is pure: a rejected command or path is reported through
//! the return value so callers can branch before doing any I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use toolbridge_config::constants::defaults;
use toolbridge_config::{SecurityConfig, ToolConfig};

/// Characters a shell would interpret. Removed from every argument even
/// though the engine never goes through a shell, because the spawned tool
/// may itself hand argv to one.
pub const SHELL_METACHARACTERS: &[char] = &[
    '!', '#', '$', '&', '\'', '"', '(', ')', '*', ';', '<', '>', '?', '[', ']', '\\', '`', '{',
    '|', '}', '~', '\n', '\r', '\0',
];

/// Suffixes under which the same executable may appear on different hosts.
const EXECUTABLE_SUFFIXES: &[&str] = &[".exe", ".cmd", ".bat", ".ps1"];

/// Parent environment variables children may inherit.
pub const ENV_PASSTHROUGH: &[&str] = &[
    "PATH", "HOME", "USER", "USERPROFILE", "LANG", "LC_ALL", "TMPDIR", "TEMP", "TMP", "NODE_ENV",
];

#[cfg(windows)]
const PLATFORM_ENV_PASSTHROUGH: &[&str] = &["SYSTEMROOT", "PATHEXT", "APPDATA", "LOCALAPPDATA"];
#[cfg(not(windows))]
const PLATFORM_ENV_PASSTHROUGH: &[&str] = &[];

const FORCE_COLOR_VAR: &str = "FORCE_COLOR";

#[cfg(not(windows))]
static EXECUTABLE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| compile_regex(r"^[\w./-]+$"));

#[cfg(windows)]
static EXECUTABLE_PATH_PATTERN: Lazy<Regex> =
    Lazy::new(|| compile_regex(r"^(?:[A-Za-z]:)?[\w .\\/-]+$"));

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // Only static patterns reach here; covered by the path tests.
        Err(err) => panic!("invalid regex pattern `{pattern}`: {err}"),
    }
}

/// Remove shell metacharacters from a single argument.
pub fn sanitize_argument(arg: &str) -> String {
    arg.chars()
        .filter(|ch| !SHELL_METACHARACTERS.contains(ch))
        .collect()
}

/// Sanitize every argument of a command line.
pub fn validate_args<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter()
        .map(|arg| sanitize_argument(arg.as_ref()))
        .collect()
}

/// True only for absolute, traversal-free paths made of conservative
/// characters. Used on anything `which` hands back before it is trusted.
pub fn is_valid_executable_path(path: &str) -> bool {
    if path.is_empty() || path.contains("..") {
        return false;
    }
    if !Path::new(path).is_absolute() {
        return false;
    }
    #[cfg(not(windows))]
    if path.chars().any(|ch| SHELL_METACHARACTERS.contains(&ch)) {
        return false;
    }
    #[cfg(windows)]
    if path
        .chars()
        .any(|ch| ch != '\\' && SHELL_METACHARACTERS.contains(&ch))
    {
        return false;
    }
    EXECUTABLE_PATH_PATTERN.is_match(path)
}

/// Lowercased final path component, accepting both separator styles.
pub fn command_basename(command: &str) -> String {
    command
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(command)
        .to_ascii_lowercase()
}

/// Allowlist and environment rules for spawned processes.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    allowed_commands: BTreeSet<String>,
    env_passthrough: Vec<String>,
    force_color: bool,
}

impl SecurityPolicy {
    /// Policy allowing exactly `commands`, with the default environment rules.
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_commands: commands
                .into_iter()
                .map(|command| command.as_ref().to_ascii_lowercase())
                .collect(),
            env_passthrough: ENV_PASSTHROUGH
                .iter()
                .chain(PLATFORM_ENV_PASSTHROUGH)
                .map(|name| (*name).to_string())
                .collect(),
            force_color: true,
        }
    }

    /// The tool itself, its on-demand runner, the host package managers and
    /// runtime, plus whatever the configuration adds.
    pub fn from_config(tool: &ToolConfig, security: &SecurityConfig) -> Self {
        let commands = std::iter::once(tool.binary.as_str())
            .chain(std::iter::once(tool.runner.as_str()))
            .chain(defaults::SUPPORT_COMMANDS.iter().copied())
            .chain(security.extra_allowed_commands.iter().map(String::as_str));
        let mut policy = Self::new(commands);
        policy
            .env_passthrough
            .extend(security.extra_env_passthrough.iter().cloned());
        policy.force_color = security.force_color;
        policy
    }

    pub fn with_force_color(mut self, force_color: bool) -> Self {
        self.force_color = force_color;
        self
    }

    pub fn allowed_commands(&self) -> impl Iterator<Item = &str> {
        self.allowed_commands.iter().map(String::as_str)
    }

    /// Basename allowlist check.
    ///
    /// `/usr/local/bin/npx`, `npx`, `NPX.CMD` and `npx.exe` all match an
    /// `npx` entry; `npx-evil` and `/tmp/sh` do not.
    pub fn is_allowed_command(&self, command: &str) -> bool {
        if command.trim().is_empty() || command.contains('\0') {
            return false;
        }
        let basename = command_basename(command.trim());
        if basename.is_empty() {
            return false;
        }
        if self.allowed_commands.contains(&basename) {
            return true;
        }
        let without_suffix = EXECUTABLE_SUFFIXES
            .iter()
            .find_map(|suffix| basename.strip_suffix(suffix));
        if let Some(stem) = without_suffix
            && self.allowed_commands.contains(stem)
        {
            return true;
        }
        match basename.split_once('.') {
            Some((name, extension)) if !name.is_empty() && !extension.is_empty() => {
                self.allowed_commands.contains(name)
            }
            _ => false,
        }
    }

    /// Whitelisted slice of the parent environment, overlaid with the
    /// caller's variables and the color flag.
    pub fn safe_environment(&self, overlay: &HashMap<String, String>) -> HashMap<String, String> {
        self.safe_environment_from(|name| std::env::var(name).ok(), overlay)
    }

    pub(crate) fn safe_environment_from<F>(
        &self,
        parent: F,
        overlay: &HashMap<String, String>,
    ) -> HashMap<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env: HashMap<String, String> = self
            .env_passthrough
            .iter()
            .filter_map(|name| parent(name).map(|value| (name.clone(), value)))
            .collect();
        env.extend(
            overlay
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        if self.force_color {
            env.insert(FORCE_COLOR_VAR.to_string(), "1".to_string());
        }
        env
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::from_config(&ToolConfig::default(), &SecurityConfig::default())
    }
}
