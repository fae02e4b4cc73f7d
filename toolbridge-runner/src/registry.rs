use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Identifier of a live run, unique within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RunId(u64);

impl RunId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Bookkeeping for a spawned child that has not been reaped yet.
#[derive(Debug)]
pub(crate) struct RunEntry {
    pub(crate) pid: Option<u32>,
    pub(crate) command: String,
    pub(crate) started_at: Instant,
    /// Fired to ask the run loop to stop waiting and terminate.
    pub(crate) cancel: CancellationToken,
    /// Fired once the child has been reaped.
    pub(crate) exited: CancellationToken,
}

/// Point-in-time view of a live run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSnapshot {
    pub id: RunId,
    pub pid: Option<u32>,
    pub command: String,
    pub elapsed: Duration,
}

/// Live children keyed by [`RunId`].
///
/// Removing an entry transfers the duty to terminate it: only the caller
/// whose `remove` returned `Some` sends signals, so a child is never
/// signalled twice.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<RunId, RunEntry>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_id(&self) -> RunId {
        RunId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub(crate) fn insert(&self, id: RunId, entry: RunEntry) {
        self.entries.lock().insert(id, entry);
    }

    pub(crate) fn remove(&self, id: RunId) -> Option<RunEntry> {
        self.entries.lock().remove(&id)
    }

    pub(crate) fn drain(&self) -> Vec<(RunId, RunEntry)> {
        self.entries.lock().drain().collect()
    }

    pub(crate) fn cancel_token(&self, id: RunId) -> Option<CancellationToken> {
        self.entries.lock().get(&id).map(|entry| entry.cancel.clone())
    }

    pub(crate) fn cancel_tokens(&self) -> Vec<CancellationToken> {
        self.entries
            .lock()
            .values()
            .map(|entry| entry.cancel.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn contains(&self, id: RunId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    /// Live runs ordered by id.
    pub fn snapshot(&self) -> Vec<RunSnapshot> {
        let mut runs: Vec<RunSnapshot> = self
            .entries
            .lock()
            .iter()
            .map(|(id, entry)| RunSnapshot {
                id: *id,
                pid: entry.pid,
                command: entry.command.clone(),
                elapsed: entry.started_at.elapsed(),
            })
            .collect();
        runs.sort_by_key(|run| run.id);
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(command: &str) -> RunEntry {
        RunEntry {
            pid: Some(42),
            command: command.to_string(),
            started_at: Instant::now(),
            cancel: CancellationToken::new(),
            exited: CancellationToken::new(),
        }
    }

    #[test]
    fn ids_are_sequential_and_displayed() {
        let registry = ProcessRegistry::new();
        let first = registry.next_id();
        let second = registry.next_id();
        assert_eq!(first.to_string(), "run-1");
        assert_eq!(second.as_u64(), 2);
    }

    #[test]
    fn remove_hands_out_an_entry_once() {
        let registry = ProcessRegistry::new();
        let id = registry.next_id();
        registry.insert(id, entry("webforge doctor"));
        assert!(registry.contains(id));

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_and_drain_empties() {
        let registry = ProcessRegistry::new();
        let a = registry.next_id();
        let b = registry.next_id();
        registry.insert(b, entry("webforge analyze"));
        registry.insert(a, entry("webforge doctor"));

        let commands: Vec<String> = registry
            .snapshot()
            .into_iter()
            .map(|run| run.command)
            .collect();
        assert_eq!(commands, vec!["webforge doctor", "webforge analyze"]);
        assert_eq!(registry.cancel_tokens().len(), 2);

        assert_eq!(registry.drain().len(), 2);
        assert_eq!(registry.len(), 0);
    }
}
