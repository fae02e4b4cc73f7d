use std::io;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use toolbridge_config::RunnerConfig;
use toolbridge_config::constants::defaults;
use tracing::{debug, warn};

use crate::process_group::{self, KillSignal};

/// Two-stage termination: a polite signal now, a forced kill after the
/// grace period if the child has not exited by then.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    pub grace_period: Duration,
    pub initial_signal: KillSignal,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(defaults::KILL_GRACE_PERIOD_MS),
            initial_signal: KillSignal::Term,
        }
    }
}

impl TerminationPolicy {
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            grace_period: config.kill_grace_period(),
            ..Self::default()
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Start terminating `pid`. Returns once the first signal is sent.
    ///
    /// `exited` must be cancelled by whoever reaps the child; the forced kill
    /// is skipped once it fires so a recycled PID is never signalled.
    pub fn terminate(&self, pid: u32, exited: CancellationToken) -> io::Result<()> {
        let initial = match self.initial_signal {
            KillSignal::Kill => KillSignal::Term,
            other => other,
        };
        debug!(pid, signal = ?initial, "sending termination signal");
        process_group::signal_process_group(pid, initial)?;

        let grace_period = self.grace_period;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::select! {
                        biased;
                        _ = exited.cancelled() => {}
                        _ = tokio::time::sleep(grace_period) => escalate(pid),
                    }
                });
            }
            Err(_) => {
                // Dropped outside a runtime; fall back to a plain thread.
                std::thread::spawn(move || {
                    std::thread::sleep(grace_period);
                    if !exited.is_cancelled() {
                        escalate(pid);
                    }
                });
            }
        }
        Ok(())
    }
}

fn escalate(pid: u32) {
    if !process_group::is_process_running(pid) {
        return;
    }
    debug!(pid, "grace period elapsed, force killing");
    if let Err(err) = process_group::force_kill(pid) {
        warn!(pid, error = %err, "failed to force kill child process");
    }
}
