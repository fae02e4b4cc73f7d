use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Timeout (in seconds) applied to raw runs. 0 disables it.
    #[serde(default)]
    pub default_timeout_seconds: u64,
    #[serde(default = "RunnerConfig::default_generate_timeout_seconds")]
    pub generate_timeout_seconds: u64,
    #[serde(default = "RunnerConfig::default_analyze_timeout_seconds")]
    pub analyze_timeout_seconds: u64,
    #[serde(default = "RunnerConfig::default_doctor_timeout_seconds")]
    pub doctor_timeout_seconds: u64,
    /// Delay between the graceful and the forced termination signal.
    #[serde(default = "RunnerConfig::default_kill_grace_period_ms")]
    pub kill_grace_period_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: 0,
            generate_timeout_seconds: Self::default_generate_timeout_seconds(),
            analyze_timeout_seconds: Self::default_analyze_timeout_seconds(),
            doctor_timeout_seconds: Self::default_doctor_timeout_seconds(),
            kill_grace_period_ms: Self::default_kill_grace_period_ms(),
        }
    }
}

impl RunnerConfig {
    const MIN_GRACE_PERIOD_MS: u64 = 100;

    const fn default_generate_timeout_seconds() -> u64 {
        defaults::GENERATE_TIMEOUT_SECONDS
    }

    const fn default_analyze_timeout_seconds() -> u64 {
        defaults::ANALYZE_TIMEOUT_SECONDS
    }

    const fn default_doctor_timeout_seconds() -> u64 {
        defaults::DOCTOR_TIMEOUT_SECONDS
    }

    const fn default_kill_grace_period_ms() -> u64 {
        defaults::KILL_GRACE_PERIOD_MS
    }

    /// Normalize a timeout value into an optional duration.
    pub fn timeout_duration(seconds: u64) -> Option<Duration> {
        if seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(seconds))
        }
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        Self::timeout_duration(self.default_timeout_seconds)
    }

    pub fn generate_timeout(&self) -> Option<Duration> {
        Self::timeout_duration(self.generate_timeout_seconds)
    }

    pub fn analyze_timeout(&self) -> Option<Duration> {
        Self::timeout_duration(self.analyze_timeout_seconds)
    }

    pub fn doctor_timeout(&self) -> Option<Duration> {
        Self::timeout_duration(self.doctor_timeout_seconds)
    }

    pub fn kill_grace_period(&self) -> Duration {
        Duration::from_millis(self.kill_grace_period_ms)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.kill_grace_period_ms >= Self::MIN_GRACE_PERIOD_MS,
            "runner.kill_grace_period_ms must be at least {}ms",
            Self::MIN_GRACE_PERIOD_MS
        );
        Ok(())
    }
}
