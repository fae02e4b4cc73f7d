use parking_lot::Mutex;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use toolbridge_commons::OutputSink;
use tracing::trace;

const READ_BUFFER_SIZE: usize = 8_192;

/// Incremental UTF-8 decoder for pipe chunks.
///
/// A multibyte character split across two reads is held back until the rest
/// arrives, so sinks never see a spurious replacement character. Genuinely
/// invalid bytes still decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut decoded = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    decoded.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(error) => {
                    let valid = error.valid_up_to();
                    decoded.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match error.error_len() {
                        // Truncated sequence at the end; wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(invalid) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + invalid);
                        }
                    }
                }
            }
        }
        decoded
    }

    /// Flush whatever is still buffered at end of stream.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

/// One captured child pipe: the full byte buffer plus the task filling it.
pub(crate) struct CapturedStream {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl CapturedStream {
    pub(crate) fn spawn<R>(reader: R, sink: Option<Arc<dyn OutputSink>>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(read_output_stream(reader, Arc::clone(&buffer), sink));
        Self { buffer, task }
    }

    /// Wait up to `drain_limit` for the pipe to close, then return what was
    /// captured. Grandchildren holding the pipe open cannot stall the caller.
    pub(crate) async fn finish(self, drain_limit: Duration) -> String {
        let Self { buffer, mut task } = self;
        if tokio::time::timeout(drain_limit, &mut task).await.is_err() {
            trace!("output reader still open after exit, abandoning it");
            task.abort();
        }
        let bytes = std::mem::take(&mut *buffer.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub(crate) fn abort(self) {
        self.task.abort();
    }
}

async fn read_output_stream<R>(
    mut reader: R,
    buffer: Arc<Mutex<Vec<u8>>>,
    sink: Option<Arc<dyn OutputSink>>,
) where
    R: AsyncRead + Unpin,
{
    let mut decoder = Utf8ChunkDecoder::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                buffer.lock().extend_from_slice(&buf[..n]);
                if let Some(sink) = &sink {
                    let text = decoder.decode(&buf[..n]);
                    if !text.is_empty() {
                        sink.write(&text);
                    }
                }
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    if let Some(sink) = &sink {
        let rest = decoder.finish();
        if !rest.is_empty() {
            sink.write(&rest);
        }
    }
}
