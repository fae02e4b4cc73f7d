use std::sync::Arc;
use std::time::{Duration, Instant};

use super::ToolInfo;

/// Most recent successful detection and when it was made.
///
/// Written only by [`ToolDetector`](super::ToolDetector), always by
/// replacing the whole entry.
#[derive(Debug, Clone)]
pub struct DetectionCache {
    entry: Option<(Arc<ToolInfo>, Instant)>,
    ttl: Duration,
}

impl DetectionCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entry: None, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value if it is younger than the TTL at `now`.
    pub fn fresh(&self, now: Instant) -> Option<Arc<ToolInfo>> {
        self.entry
            .as_ref()
            .filter(|(_, stored_at)| now.saturating_duration_since(*stored_at) < self.ttl)
            .map(|(info, _)| Arc::clone(info))
    }

    /// The cached value regardless of age.
    pub fn peek(&self) -> Option<Arc<ToolInfo>> {
        self.entry.as_ref().map(|(info, _)| Arc::clone(info))
    }

    pub fn store(&mut self, info: Arc<ToolInfo>, now: Instant) {
        self.entry = Some((info, now));
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
