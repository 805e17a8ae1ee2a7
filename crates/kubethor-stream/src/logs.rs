//! Followed container log as a frame source

use chrono::{SecondsFormat, Utc};
use futures::io::AsyncReadExt;
use futures::stream::{self, StreamExt};
use kubethor_cluster::LogStream;
use tracing::debug;

use crate::frame::{FrameStream, LogFrame, OutboundFrame};

/// Default maximum bytes per log frame
pub const DEFAULT_LOG_CHUNK_BYTES: usize = 1024;

/// Log tail settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTailConfig {
    /// Maximum bytes read into one frame
    pub chunk_size: usize,
}

impl Default for LogTailConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_LOG_CHUNK_BYTES,
        }
    }
}

/// Smallest chunk that always fits one UTF-8 character
const MIN_CHUNK_BYTES: usize = 4;

/// Frames of at most `chunk_size` bytes, each stamped with its read time
///
/// A character split across reads is held back and sent with the next
/// frame. Ends at EOF or on the first read error.
pub fn log_frames(reader: LogStream, chunk_size: usize) -> FrameStream {
    let chunks = LogChunks {
        reader,
        buf: vec![0u8; chunk_size.max(MIN_CHUNK_BYTES)],
        carried: 0,
    };
    stream::unfold(chunks, |mut chunks| async move {
        let log = chunks.next_chunk().await?;
        let frame = OutboundFrame::Log(LogFrame {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            log,
        });
        Some((frame, chunks))
    })
    .boxed()
}

struct LogChunks {
    reader: LogStream,
    buf: Vec<u8>,
    /// Bytes of an unfinished character kept at the front of `buf`
    carried: usize,
}

impl LogChunks {
    async fn next_chunk(&mut self) -> Option<String> {
        loop {
            let filled = self.carried;
            match self.reader.read(&mut self.buf[filled..]).await {
                Ok(0) => {
                    debug!("Log stream reached EOF");
                    return self.flush();
                }
                Ok(n) => {
                    let end = filled + n;
                    let split = complete_prefix_len(&self.buf[..end]);
                    if split == 0 {
                        self.carried = end;
                        continue;
                    }
                    let text = String::from_utf8_lossy(&self.buf[..split]).into_owned();
                    self.buf.copy_within(split..end, 0);
                    self.carried = end - split;
                    return Some(text);
                }
                Err(e) => {
                    debug!(error = %e, "Log stream read failed");
                    return None;
                }
            }
        }
    }

    /// Whatever is left at EOF, decoded lossily
    fn flush(&mut self) -> Option<String> {
        let carried = std::mem::take(&mut self.carried);
        (carried > 0).then(|| String::from_utf8_lossy(&self.buf[..carried]).into_owned())
    }
}

/// Length of `bytes` minus any trailing partial character
///
/// Invalid sequences are not held back; only a tail that a later read could
/// still complete.
fn complete_prefix_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..MIN_CHUNK_BYTES.min(len + 1) {
        let start = len - back;
        if let Err(e) = std::str::from_utf8(&bytes[start..]) {
            if e.valid_up_to() == 0 && e.error_len().is_none() {
                return start;
            }
        }
    }
    len
}
