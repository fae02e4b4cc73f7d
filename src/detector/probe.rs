//! `--version` and `--help` probes run through the process engine.

use regex::Regex;
use std::collections::BTreeSet;
use std::time::Duration;

use toolbridge_runner::{Invocation, ProcessEngine, RunRequest, RunResult};
use tracing::debug;

pub(crate) const UNKNOWN_VERSION: &str = "0.0.0";

/// Run `<invocation> <flag>` with the probe timeout. Any failure to run is
/// `None`; a non-zero exit still returns the result.
pub(crate) async fn run_probe(
    engine: &ProcessEngine,
    invocation: &Invocation,
    flag: &str,
    timeout: Duration,
) -> Option<RunResult> {
    let request = RunRequest::new(invocation.clone())
        .arg(flag)
        .timeout(Some(timeout));
    match engine.run(request).await {
        Ok(result) => Some(result),
        Err(err) => {
            debug!(command = %invocation, flag, error = %err, "probe failed");
            None
        }
    }
}

/// Trimmed stdout of a successful `--version` run.
pub(crate) fn version_from(result: Option<&RunResult>) -> String {
    result
        .filter(|result| result.success())
        .map(|result| result.stdout().trim())
        .filter(|version| !version.is_empty())
        .unwrap_or(UNKNOWN_VERSION)
        .to_string()
}

/// Recognises subcommand names listed at the start of `--help` lines.
#[derive(Debug, Clone)]
pub(crate) struct FeatureMatcher {
    pattern: Option<Regex>,
    fallback: BTreeSet<String>,
}

impl FeatureMatcher {
    pub(crate) fn new(known: &[String], fallback: &[String]) -> Self {
        let alternatives = known
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| regex::escape(name.trim()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = if alternatives.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?m)^\s+({alternatives})(?:\s|$)")).ok()
        };
        Self {
            pattern,
            fallback: fallback.iter().cloned().collect(),
        }
    }

    /// Feature names found in `help`, or the fallback set when none are.
    pub(crate) fn features(&self, help: Option<&RunResult>) -> BTreeSet<String> {
        let text = help.map(RunResult::output).unwrap_or_default();
        let found: BTreeSet<String> = self
            .pattern
            .as_ref()
            .map(|pattern| {
                pattern
                    .captures_iter(text)
                    .filter_map(|captures| captures.get(1))
                    .map(|name| name.as_str().to_string())
                    .collect()
            })
            .unwrap_or_default();

        if found.is_empty() {
            self.fallback.clone()
        } else {
            found
        }
    }
}
