//! Locating the tool: workspace-local install, global install, then the
//! on-demand package runner, with the last success cached for a TTL.

mod cache;
mod probe;
mod strategy;

pub use cache::DetectionCache;

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::sync::Arc;
use std::time::{Duration, Instant};

use toolbridge_commons::WorkspacePaths;
use toolbridge_config::{BridgeConfig, DetectionConfig, ToolConfig};
use toolbridge_runner::{Invocation, ProcessEngine, RunResult};
use tracing::{debug, info};

use self::probe::FeatureMatcher;
use self::strategy::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallKind {
    Local,
    Global,
    OnDemand,
}

/// A successful detection. Never mutated; a refresh builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    path: String,
    invocation: Invocation,
    version: String,
    install_kind: InstallKind,
    features: BTreeSet<String>,
}

impl ToolInfo {
    pub fn new(
        invocation: Invocation,
        version: String,
        install_kind: InstallKind,
        features: BTreeSet<String>,
    ) -> Self {
        Self {
            path: invocation.display(),
            invocation,
            version,
            install_kind,
            features,
        }
    }

    /// Display form of the invocation, e.g. `/usr/bin/npx --yes @webforge/cli`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn install_kind(&self) -> InstallKind {
        self.install_kind
    }

    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    pub fn supports(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

/// Finds the tool and answers questions about it.
///
/// Owns its [`DetectionCache`]; construct one per host and share it.
pub struct ToolDetector {
    engine: Arc<ProcessEngine>,
    workspace: Arc<dyn WorkspacePaths>,
    tool: ToolConfig,
    probe_timeout: Duration,
    features: FeatureMatcher,
    search_path: Option<OsString>,
    cache: RwLock<DetectionCache>,
}

impl ToolDetector {
    pub fn new(
        engine: Arc<ProcessEngine>,
        workspace: Arc<dyn WorkspacePaths>,
        config: &BridgeConfig,
    ) -> Self {
        Self::with_parts(engine, workspace, &config.tool, &config.detection)
    }

    pub fn with_parts(
        engine: Arc<ProcessEngine>,
        workspace: Arc<dyn WorkspacePaths>,
        tool: &ToolConfig,
        detection: &DetectionConfig,
    ) -> Self {
        Self {
            engine,
            workspace,
            tool: tool.clone(),
            probe_timeout: detection.probe_timeout(),
            features: FeatureMatcher::new(&detection.known_features, &detection.fallback_features),
            search_path: None,
            cache: RwLock::new(DetectionCache::new(detection.cache_ttl())),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        *self.cache.get_mut() = DetectionCache::new(ttl);
        self
    }

    /// Search these directories instead of `PATH` for the global and
    /// on-demand strategies.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn tool(&self) -> &ToolConfig {
        &self.tool
    }

    /// Engine the probes run through.
    pub fn engine(&self) -> &Arc<ProcessEngine> {
        &self.engine
    }

    /// Cached result when fresh, otherwise probe every strategy in order.
    ///
    /// Never fails: when nothing is found the cache is cleared and `None`
    /// returned.
    pub async fn detect(&self, force_refresh: bool) -> Option<Arc<ToolInfo>> {
        if !force_refresh {
            let fresh = self.cache.read().fresh(Instant::now());
            if let Some(info) = fresh {
                debug!(path = %info.path(), "detection cache hit");
                return Some(info);
            }
        }

        match self.probe().await {
            Some(info) if self.engine.is_disposed() => {
                // Every probe was refused; the version and features are placeholders.
                debug!(path = %info.path(), "engine disposed; not caching detection");
                Some(Arc::new(info))
            }
            Some(info) => {
                let info = Arc::new(info);
                info!(
                    path = %info.path(),
                    version = %info.version(),
                    install_kind = ?info.install_kind(),
                    "detected tool"
                );
                self.cache.write().store(Arc::clone(&info), Instant::now());
                Some(info)
            }
            None => {
                info!(binary = %self.tool.binary, "tool not found by any strategy");
                self.cache.write().clear();
                None
            }
        }
    }

    pub async fn executable_path(&self) -> Option<String> {
        self.detect(false)
            .await
            .map(|info| info.path().to_string())
    }

    pub async fn version(&self) -> Option<String> {
        self.detect(false)
            .await
            .map(|info| info.version().to_string())
    }

    pub async fn supports_feature(&self, feature: &str) -> bool {
        self.detect(false)
            .await
            .is_some_and(|info| info.supports(feature))
    }

    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Last detection result without probing, even if stale.
    pub fn cached(&self) -> Option<Arc<ToolInfo>> {
        self.cache.read().peek()
    }

    async fn probe(&self) -> Option<ToolInfo> {
        let root = self.workspace.workspace_root();
        if let Some(candidate) = strategy::local(root.as_deref(), &self.tool) {
            return Some(self.describe(candidate).await);
        }
        if let Some(candidate) = strategy::global(&self.tool, self.search_path.as_ref()) {
            return Some(self.describe(candidate).await);
        }
        let candidate = strategy::on_demand(&self.tool, self.search_path.as_ref())?;
        // The runner exists, but the package may not be fetchable.
        let version = probe::run_probe(
            &self.engine,
            &candidate.invocation,
            "--version",
            self.probe_timeout,
        )
        .await
        .filter(|result| result.success())?;
        let help = self.help(&candidate.invocation).await;
        Some(ToolInfo::new(
            candidate.invocation,
            probe::version_from(Some(&version)),
            candidate.install_kind,
            self.features.features(help.as_ref()),
        ))
    }

    async fn describe(&self, candidate: Candidate) -> ToolInfo {
        let version = probe::run_probe(
            &self.engine,
            &candidate.invocation,
            "--version",
            self.probe_timeout,
        )
        .await;
        let help = self.help(&candidate.invocation).await;
        ToolInfo::new(
            candidate.invocation,
            probe::version_from(version.as_ref()),
            candidate.install_kind,
            self.features.features(help.as_ref()),
        )
    }

    async fn help(&self, invocation: &Invocation) -> Option<RunResult> {
        probe::run_probe(&self.engine, invocation, "--help", self.probe_timeout).await
    }
}

impl std::fmt::Debug for ToolDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDetector")
            .field("tool", &self.tool)
            .field("probe_timeout", &self.probe_timeout)
            .field("search_path", &self.search_path)
            .field("cached", &self.cached().map(|info| info.path().to_string()))
            .finish()
    }
}
