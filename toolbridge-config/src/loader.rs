use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{defaults, env};
use crate::debug::LoggingConfig;
use crate::detection::DetectionConfig;
use crate::runner::RunnerConfig;
use crate::security::SecurityConfig;
use crate::tool::ToolConfig;

/// Root of `toolbridge.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse toolbridge config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tool.validate()?;
        self.detection.validate()?;
        self.runner.validate()?;
        self.security.validate()?;
        Ok(())
    }
}

/// Configuration manager for loading and validating configurations
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: BridgeConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration for a workspace.
    ///
    /// `TOOLBRIDGE_CONFIG_PATH` wins when set; otherwise `toolbridge.toml` in
    /// the workspace root is used if present, and defaults if not.
    pub fn load(workspace_root: Option<&Path>) -> Result<Self> {
        if let Ok(config_path) = std::env::var(env::CONFIG_PATH) {
            let trimmed = config_path.trim();
            if !trimmed.is_empty() {
                return Self::load_from_file(trimmed).with_context(|| {
                    format!(
                        "Failed to load configuration from {}={}",
                        env::CONFIG_PATH,
                        trimmed
                    )
                });
            }
        }

        match workspace_root {
            Some(root) => Self::load_from_workspace(root),
            None => Ok(Self::defaults()),
        }
    }

    /// Load configuration from a specific workspace
    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self> {
        let candidate = workspace.as_ref().join(defaults::CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load_from_file(candidate)
        } else {
            debug!(
                workspace = %workspace.as_ref().display(),
                "no toolbridge.toml found; using defaults"
            );
            Ok(Self::defaults())
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = BridgeConfig::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded toolbridge config");
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    pub fn defaults() -> Self {
        Self {
            config: BridgeConfig::default(),
            config_path: None,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn into_config(self) -> BridgeConfig {
        self.config
    }

    /// Path of the file the configuration came from, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() -> Result<()> {
        let config = BridgeConfig::from_toml_str("")?;
        assert_eq!(config, BridgeConfig::default());
        Ok(())
    }

    #[test]
    fn partial_sections_keep_other_defaults() -> Result<()> {
        let config = BridgeConfig::from_toml_str(
            "[tool]\nbinary = \"forge\"\n\n[runner]\nanalyze_timeout_seconds = 30\n",
        )?;
        assert_eq!(config.tool.binary, "forge");
        assert_eq!(config.tool.runner, "npx");
        assert_eq!(config.runner.analyze_timeout_seconds, 30);
        assert_eq!(config.runner.kill_grace_period_ms, 5_000);
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = BridgeConfig::from_toml_str("[detection]\ncache_ttl_seconds = 0\n")
            .expect_err("zero ttl must fail validation");
        assert!(format!("{err:#}").contains("cache_ttl_seconds"));
    }
}
