/// Write-only destination for tool output.
///
/// The runner pushes stdout/stderr chunks into a sink as soon as they arrive,
/// which is what lets an editor panel show live progress. Sinks are never
/// read back by the core.
pub trait OutputSink: Send + Sync {
    /// Append a chunk of text. Chunks are not line-aligned.
    fn write(&self, chunk: &str);
}

impl<F> OutputSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write(&self, chunk: &str) {
        self(chunk)
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOutputSink;

impl OutputSink for NoopOutputSink {
    fn write(&self, _chunk: &str) {}
}

/// Forwards output to `tracing` for hosts that have no output panel.
#[derive(Debug, Clone)]
pub struct TracingOutputSink {
    label: String,
}

impl TracingOutputSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl OutputSink for TracingOutputSink {
    fn write(&self, chunk: &str) {
        for line in chunk.lines().filter(|line| !line.trim().is_empty()) {
            tracing::info!(target: "toolbridge::output", source = %self.label, "{line}");
        }
    }
}
