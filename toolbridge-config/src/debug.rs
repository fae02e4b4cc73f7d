//! Logging configuration

use serde::{Deserialize, Serialize};

/// Trace level for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl TraceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

impl std::fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TraceLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: TraceLevel,

    /// Tracing targets the level applies to. Empty means the toolbridge crates.
    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default)]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: TraceLevel::Warn,
            targets: Vec::new(),
            ansi: false,
        }
    }
}

impl LoggingConfig {
    const DEFAULT_TARGETS: &'static [&'static str] = &[
        "toolbridge",
        "toolbridge_runner",
        "toolbridge_config",
        "toolbridge_commons",
    ];

    /// Filter directive string, e.g. `toolbridge=debug,toolbridge_runner=debug`.
    pub fn filter_directive(&self) -> String {
        let level = self.level.as_str();
        if self.targets.is_empty() {
            Self::DEFAULT_TARGETS
                .iter()
                .map(|target| format!("{target}={level}"))
                .collect::<Vec<_>>()
                .join(",")
        } else {
            self.targets
                .iter()
                .map(|target| format!("{target}={level}"))
                .collect::<Vec<_>>()
                .join(",")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_level_parsing() {
        assert_eq!(TraceLevel::parse("DEBUG"), Some(TraceLevel::Debug));
        assert_eq!(TraceLevel::parse(" warn "), Some(TraceLevel::Warn));
        assert_eq!(TraceLevel::parse("verbose"), None);
    }

    #[test]
    fn filter_directive_uses_targets() {
        let config = LoggingConfig {
            level: TraceLevel::Debug,
            targets: vec!["toolbridge_runner".to_string()],
            ansi: false,
        };
        assert_eq!(config.filter_directive(), "toolbridge_runner=debug");

        let default = LoggingConfig::default();
        assert!(default.filter_directive().starts_with("toolbridge=warn,"));
    }
}
