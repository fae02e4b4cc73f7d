use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DetectionConfig {
    /// How long a successful detection is reused, in seconds.
    #[serde(default = "DetectionConfig::default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    /// Upper bound for each `--version` / `--help` probe, in seconds.
    #[serde(default = "DetectionConfig::default_probe_timeout_seconds")]
    pub probe_timeout_seconds: u64,
    /// Subcommand names looked for in `--help` output.
    #[serde(default = "DetectionConfig::default_known_features")]
    pub known_features: Vec<String>,
    /// Features assumed when nothing could be parsed.
    #[serde(default = "DetectionConfig::default_fallback_features")]
    pub fallback_features: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: Self::default_cache_ttl_seconds(),
            probe_timeout_seconds: Self::default_probe_timeout_seconds(),
            known_features: Self::default_known_features(),
            fallback_features: Self::default_fallback_features(),
        }
    }
}

impl DetectionConfig {
    const fn default_cache_ttl_seconds() -> u64 {
        defaults::CACHE_TTL_SECONDS
    }

    const fn default_probe_timeout_seconds() -> u64 {
        defaults::PROBE_TIMEOUT_SECONDS
    }

    fn default_known_features() -> Vec<String> {
        defaults::KNOWN_FEATURES
            .iter()
            .map(|feature| (*feature).to_string())
            .collect()
    }

    fn default_fallback_features() -> Vec<String> {
        defaults::FALLBACK_FEATURES
            .iter()
            .map(|feature| (*feature).to_string())
            .collect()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.cache_ttl_seconds > 0,
            "detection.cache_ttl_seconds must be at least 1"
        );
        ensure!(
            self.probe_timeout_seconds > 0,
            "detection.probe_timeout_seconds must be at least 1"
        );
        ensure!(
            !self.fallback_features.is_empty(),
            "detection.fallback_features cannot be empty"
        );
        for feature in self.known_features.iter().chain(&self.fallback_features) {
            ensure!(
                !feature.is_empty()
                    && feature
                        .chars()
                        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == ':'),
                "detection feature `{feature}` is not a valid subcommand name"
            );
        }
        Ok(())
    }
}
