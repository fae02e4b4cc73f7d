use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Identity of the wrapped CLI and how to reach it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ToolConfig {
    /// Executable name, without extension.
    #[serde(default = "ToolConfig::default_binary")]
    pub binary: String,
    /// Package spec passed to the on-demand runner.
    #[serde(default = "ToolConfig::default_package")]
    pub package: String,
    /// On-demand runner executable name.
    #[serde(default = "ToolConfig::default_runner")]
    pub runner: String,
    /// Dependency bin directory, relative to the workspace root.
    #[serde(default = "ToolConfig::default_local_bin_dir")]
    pub local_bin_dir: String,
    #[serde(default = "ToolConfig::default_json_flag")]
    pub json_flag: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: Self::default_binary(),
            package: Self::default_package(),
            runner: Self::default_runner(),
            local_bin_dir: Self::default_local_bin_dir(),
            json_flag: Self::default_json_flag(),
        }
    }
}

impl ToolConfig {
    fn default_binary() -> String {
        defaults::TOOL_BINARY.to_string()
    }

    fn default_package() -> String {
        defaults::TOOL_PACKAGE.to_string()
    }

    fn default_runner() -> String {
        defaults::RUNNER.to_string()
    }

    fn default_local_bin_dir() -> String {
        defaults::LOCAL_BIN_DIR.to_string()
    }

    fn default_json_flag() -> String {
        defaults::JSON_FLAG.to_string()
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            is_plain_command_name(&self.binary),
            "tool.binary must be a bare executable name, got `{}`",
            self.binary
        );
        ensure!(
            is_plain_command_name(&self.runner),
            "tool.runner must be a bare executable name, got `{}`",
            self.runner
        );
        ensure!(!self.package.trim().is_empty(), "tool.package cannot be empty");
        ensure!(
            !self.local_bin_dir.contains(".."),
            "tool.local_bin_dir must stay inside the workspace"
        );
        ensure!(
            self.json_flag.starts_with("--"),
            "tool.json_flag must be a long flag"
        );
        Ok(())
    }
}

/// True for names that carry no path separators or shell syntax.
pub(crate) fn is_plain_command_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        && !name.starts_with('.')
}
