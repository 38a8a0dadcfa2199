//! Line-oriented forwarding of plugin output.

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};

/// Which plugin stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives decoded plugin output lines.
///
/// Both forwarders call the sink concurrently, so implementations must be
/// safe to share across tasks.
pub trait OutputSink: Send + Sync {
    fn line(&self, stream: OutputStream, line: &str);
}

/// Emits every line as an `info` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn line(&self, stream: OutputStream, line: &str) {
        info!(stream = %stream, "{}", line);
    }
}

/// Forward `reader` to `sink` one line at a time until EOF.
///
/// Invalid UTF-8 is replaced rather than ending the stream. The task
/// resolves to the number of lines forwarded and inherits the caller's span.
pub fn spawn_line_forwarder<R>(
    reader: R,
    stream: OutputStream,
    sink: Arc<dyn OutputSink>,
) -> JoinHandle<usize>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(
        async move {
            let mut reader = BufReader::new(reader);
            let mut buf = Vec::new();
            let mut forwarded = 0;
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        sink.line(stream, line.trim_end_matches(['\r', '\n']));
                        forwarded += 1;
                    }
                    Err(e) => {
                        warn!(stream = %stream, error = %e, "Failed to read plugin output");
                        break;
                    }
                }
            }
            debug!(stream = %stream, forwarded, "Output reader finished");
            forwarded
        }
        .in_current_span(),
    )
}
