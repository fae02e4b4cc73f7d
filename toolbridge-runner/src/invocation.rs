use serde::Serialize;
use std::fmt;

use crate::error::RunError;

/// An executable plus the arguments that always precede the caller's own.
///
/// The on-demand strategy produces `npx --yes @scope/cli`; recording that as
/// `{ executable: "npx", leading_args: ["--yes", "@scope/cli"] }` means the
/// engine never has to re-split a string to find what it is about to spawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Invocation {
    executable: String,
    leading_args: Vec<String>,
}

impl Invocation {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args(
        executable: impl Into<String>,
        leading_args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            executable: executable.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a command string such as `"pnpm exec webforge"` into executable
    /// and leading arguments using shell word rules. No shell is involved;
    /// quotes only group words.
    pub fn parse(command: &str) -> Result<Self, RunError> {
        let mut words = shell_words::split(command).map_err(|error| RunError::InvalidCommand {
            command: command.to_string(),
            reason: error.to_string(),
        })?;
        if words.is_empty() {
            return Err(RunError::EmptyCommand);
        }
        let executable = words.remove(0);
        Ok(Self {
            executable,
            leading_args: words,
        })
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn leading_args(&self) -> &[String] {
        &self.leading_args
    }

    /// Human readable form, quoted where needed.
    pub fn display(&self) -> String {
        std::iter::once(self.executable.as_str())
            .chain(self.leading_args.iter().map(String::as_str))
            .map(|word| shell_words::quote(word).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}
