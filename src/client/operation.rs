//! Command construction for the facade operations.
//!
//! Each operation has a fixed table of accepted option keys and value
//! kinds. Everything here is synchronous and runs before detection, so bad
//! input never causes a process to start.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use toolbridge_commons::is_safe_relative_path;
use toolbridge_config::RunnerConfig;

use crate::error::{ToolError, ToolResult};

/// Options passed to a facade operation, keyed by flag name without dashes.
pub type CommandOptions = BTreeMap<String, Value>;

static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| compile_regex(r"^[A-Za-z0-9_-]+$"));
static OPTION_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| compile_regex(r"^[A-Za-z][A-Za-z0-9-]*$"));

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // Only static patterns reach here; covered by the validation tests.
        Err(err) => panic!("invalid regex pattern `{pattern}`: {err}"),
    }
}

/// What `generate` can scaffold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Component,
    Page,
    Hook,
    Service,
    Feature,
    Slice,
    Api,
    Store,
    Route,
}

impl GeneratorKind {
    pub const ALL: [Self; 9] = [
        Self::Component,
        Self::Page,
        Self::Hook,
        Self::Service,
        Self::Feature,
        Self::Slice,
        Self::Api,
        Self::Store,
        Self::Route,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Page => "page",
            Self::Hook => "hook",
            Self::Service => "service",
            Self::Feature => "feature",
            Self::Slice => "slice",
            Self::Api => "api",
            Self::Store => "store",
            Self::Route => "route",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorKind {
    type Err = ToolError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| {
                let expected = Self::ALL.map(Self::as_str).join(", ");
                ToolError::invalid("type", format!("`{value}` is not one of {expected}"))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionValueKind {
    Bool,
    String,
    Number,
}

impl OptionValueKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) => Some(Self::Bool),
            Value::String(_) => Some(Self::String),
            Value::Number(_) => Some(Self::Number),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn describe(kinds: &[Self]) -> String {
        kinds
            .iter()
            .map(|kind| match kind {
                Self::Bool => "boolean",
                Self::String => "string",
                Self::Number => "number",
            })
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

type OptionTable = &'static [(&'static str, &'static [OptionValueKind])];

const BOOL: &[OptionValueKind] = &[OptionValueKind::Bool];
const STRING: &[OptionValueKind] = &[OptionValueKind::String];
const NUMBER: &[OptionValueKind] = &[OptionValueKind::Number];
const STRING_OR_NUMBER: &[OptionValueKind] = &[OptionValueKind::String, OptionValueKind::Number];

const GENERATE_OPTIONS: OptionTable = &[
    ("path", STRING),
    ("template", STRING),
    ("style", STRING),
    ("flat", BOOL),
    ("dry-run", BOOL),
    ("skip-tests", BOOL),
    ("force", BOOL),
    ("export", BOOL),
];

const ADD_FEATURE_OPTIONS: OptionTable = &[
    ("path", STRING),
    ("version", STRING_OR_NUMBER),
    ("dry-run", BOOL),
    ("skip-install", BOOL),
    ("force", BOOL),
];

const ANALYZE_OPTIONS: OptionTable = &[
    ("path", STRING),
    ("depth", NUMBER),
    ("include-tests", BOOL),
    ("strict", BOOL),
];

const DOCTOR_OPTIONS: OptionTable = &[("fix", BOOL), ("verbose", BOOL)];

/// Facade operations and the subcommand each one maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Generate(GeneratorKind),
    AddFeature,
    Analyze,
    Doctor,
}

impl OperationKind {
    pub fn subcommand(self) -> &'static str {
        match self {
            Self::Generate(_) => "generate",
            Self::AddFeature => "add",
            Self::Analyze => "analyze",
            Self::Doctor => "doctor",
        }
    }

    pub fn allowed_options(self) -> OptionTable {
        match self {
            Self::Generate(_) => GENERATE_OPTIONS,
            Self::AddFeature => ADD_FEATURE_OPTIONS,
            Self::Analyze => ANALYZE_OPTIONS,
            Self::Doctor => DOCTOR_OPTIONS,
        }
    }

    /// Configured default timeout. `add` shares the generate budget.
    pub fn timeout(self, runner: &RunnerConfig) -> Option<Duration> {
        match self {
            Self::Generate(_) | Self::AddFeature => runner.generate_timeout(),
            Self::Analyze => runner.analyze_timeout(),
            Self::Doctor => runner.doctor_timeout(),
        }
    }
}

/// Validated argument list for one operation, ready to hand to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationCommand {
    kind: OperationKind,
    args: Vec<String>,
}

impl OperationCommand {
    pub fn generate(kind: &str, name: &str, options: &CommandOptions) -> ToolResult<Self> {
        let generator = kind.parse::<GeneratorKind>()?;
        validate_identifier("name", name)?;
        Self::build(
            OperationKind::Generate(generator),
            vec![generator.as_str().to_string(), name.to_string()],
            options,
        )
    }

    pub fn add_feature(feature: &str, options: &CommandOptions) -> ToolResult<Self> {
        validate_identifier("feature", feature)?;
        Self::build(OperationKind::AddFeature, vec![feature.to_string()], options)
    }

    pub fn analyze(options: &CommandOptions) -> ToolResult<Self> {
        Self::build(OperationKind::Analyze, Vec::new(), options)
    }

    pub fn doctor(options: &CommandOptions) -> ToolResult<Self> {
        Self::build(OperationKind::Doctor, Vec::new(), options)
    }

    fn build(
        kind: OperationKind,
        positional: Vec<String>,
        options: &CommandOptions,
    ) -> ToolResult<Self> {
        let mut args = Vec::with_capacity(1 + positional.len() + options.len() * 2);
        args.push(kind.subcommand().to_string());
        args.extend(positional);
        args.extend(option_flags(kind, options)?);
        Ok(Self { kind, args })
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}

fn validate_identifier(field: &'static str, value: &str) -> ToolResult<()> {
    if IDENTIFIER_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(ToolError::invalid(
            field,
            format!("`{value}` must match ^[A-Za-z0-9_-]+$"),
        ))
    }
}

/// `true` becomes `--key`, `false` is omitted, strings and numbers become
/// `--key value`.
fn option_flags(kind: OperationKind, options: &CommandOptions) -> ToolResult<Vec<String>> {
    let table = kind.allowed_options();
    let mut flags = Vec::new();
    for (key, value) in options {
        if !OPTION_KEY_PATTERN.is_match(key) {
            return Err(ToolError::invalid(
                "option",
                format!("key `{key}` must match ^[A-Za-z][A-Za-z0-9-]*$"),
            ));
        }
        let Some((_, accepted)) = table.iter().find(|(name, _)| *name == key.as_str()) else {
            return Err(ToolError::invalid(
                "option",
                format!("`{key}` is not supported by `{}`", kind.subcommand()),
            ));
        };
        let Some(actual) = OptionValueKind::of(value) else {
            return Err(ToolError::invalid(
                "option",
                format!("`{key}` must be a boolean, string or number"),
            ));
        };
        if !accepted.contains(&actual) {
            return Err(ToolError::invalid(
                "option",
                format!("`{key}` expects {}", OptionValueKind::describe(accepted)),
            ));
        }
        if key == "path"
            && let Value::String(path) = value
            && !is_safe_relative_path(path)
        {
            return Err(ToolError::invalid(
                "option",
                format!("`path` must stay inside the workspace, got `{path}`"),
            ));
        }

        match value {
            Value::Bool(true) => flags.push(format!("--{key}")),
            Value::Bool(false) => {}
            Value::String(text) => {
                flags.push(format!("--{key}"));
                flags.push(text.clone());
            }
            Value::Number(number) => {
                flags.push(format!("--{key}"));
                flags.push(number.to_string());
            }
            Value::Null | Value::Array(_) | Value::Object(_) => {}
        }
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn options(value: Value) -> CommandOptions {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => CommandOptions::new(),
        }
    }

    #[test]
    fn generate_builds_flags_in_key_order() -> ToolResult<()> {
        let command = OperationCommand::generate(
            "component",
            "UserCard",
            &options(json!({ "style": "scss", "skip-tests": true, "dry-run": false })),
        )?;
        assert_eq!(
            command.args(),
            ["generate", "component", "UserCard", "--skip-tests", "--style", "scss"]
        );
        assert_eq!(
            command.kind(),
            OperationKind::Generate(GeneratorKind::Component)
        );
        Ok(())
    }

    #[test]
    fn unknown_generator_kind_is_rejected() {
        let err = OperationCommand::generate("bogus-type", "Name", &CommandOptions::new());
        assert!(matches!(
            err,
            Err(ToolError::InvalidInput { field: "type", .. })
        ));
    }

    #[test]
    fn names_must_be_identifiers() {
        for name in ["Bad Name!", "", "../escape", "a;b"] {
            let err = OperationCommand::generate("component", name, &CommandOptions::new());
            assert!(
                matches!(err, Err(ToolError::InvalidInput { field: "name", .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn option_keys_are_validated_against_pattern_and_table() {
        let bad_pattern = OperationCommand::analyze(&options(json!({ "1depth": 2 })));
        assert!(matches!(bad_pattern, Err(ToolError::InvalidInput { .. })));

        let not_in_table = OperationCommand::doctor(&options(json!({ "style": "scss" })));
        assert!(matches!(not_in_table, Err(ToolError::InvalidInput { .. })));
    }

    #[test]
    fn option_value_types_are_enforced() {
        for value in [json!(null), json!(["a"]), json!({ "nested": true })] {
            let err = OperationCommand::generate(
                "page",
                "Home",
                &options(json!({ "path": value })),
            );
            assert!(matches!(err, Err(ToolError::InvalidInput { .. })));
        }

        let wrong_kind = OperationCommand::analyze(&options(json!({ "depth": "deep" })));
        assert!(matches!(wrong_kind, Err(ToolError::InvalidInput { .. })));
    }

    #[test]
    fn path_option_must_be_workspace_relative() -> ToolResult<()> {
        for path in ["../outside", "/etc", "C:\\Windows"] {
            let err = OperationCommand::generate("page", "Home", &options(json!({ "path": path })));
            assert!(matches!(err, Err(ToolError::InvalidInput { field: "option", .. })));
        }
        let ok = OperationCommand::generate(
            "page",
            "Home",
            &options(json!({ "path": "src/pages" })),
        )?;
        assert_eq!(ok.args(), ["generate", "page", "Home", "--path", "src/pages"]);
        Ok(())
    }

    #[test]
    fn numbers_and_strings_become_flag_values() -> ToolResult<()> {
        let analyze = OperationCommand::analyze(&options(json!({ "depth": 3, "strict": true })))?;
        assert_eq!(analyze.args(), ["analyze", "--depth", "3", "--strict"]);

        let add = OperationCommand::add_feature("auth", &options(json!({ "version": 2 })))?;
        assert_eq!(add.into_args(), vec!["add", "auth", "--version", "2"]);
        Ok(())
    }

    #[test]
    fn every_generator_kind_round_trips_through_its_name() {
        for kind in GeneratorKind::ALL {
            assert_eq!(kind.as_str().parse::<GeneratorKind>().ok(), Some(kind));
        }
    }

    #[test]
    fn operation_timeouts_come_from_config() {
        let runner = RunnerConfig::default();
        assert_eq!(
            OperationKind::Analyze.timeout(&runner),
            Some(Duration::from_secs(120))
        );
        assert_eq!(
            OperationKind::AddFeature.timeout(&runner),
            Some(Duration::from_secs(60))
        );
    }
}
