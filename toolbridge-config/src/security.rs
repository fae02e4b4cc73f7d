use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::tool::is_plain_command_name;

/// Knobs on top of the built-in trust boundary. These can only widen the
/// allowlists by explicit names; the built-in entries cannot be removed.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Extra executable basenames the engine may spawn.
    #[serde(default)]
    pub extra_allowed_commands: Vec<String>,
    /// Extra parent environment variables passed to children.
    #[serde(default)]
    pub extra_env_passthrough: Vec<String>,
    /// Force colorized output from the tool.
    #[serde(default = "SecurityConfig::default_force_color")]
    pub force_color: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            extra_allowed_commands: Vec::new(),
            extra_env_passthrough: Vec::new(),
            force_color: Self::default_force_color(),
        }
    }
}

impl SecurityConfig {
    const fn default_force_color() -> bool {
        true
    }

    pub fn validate(&self) -> Result<()> {
        for command in &self.extra_allowed_commands {
            ensure!(
                is_plain_command_name(command),
                "security.extra_allowed_commands entry `{command}` must be a bare executable name"
            );
        }
        for name in &self.extra_env_passthrough {
            ensure!(
                !name.is_empty()
                    && name
                        .chars()
                        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_'),
                "security.extra_env_passthrough entry `{name}` is not a valid variable name"
            );
        }
        Ok(())
    }
}
