//! Incremental line reading over a byte stream.

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncBufRead, Lines};

use super::StreamError;

/// Default upper bound for a single line (1 MiB).
pub const DEFAULT_MAX_LINE_BYTES: usize = 1 << 20;

/// A source of raw lines for the subscription engine.
///
/// `Ok(None)` means the remote side closed the stream cleanly. The engine
/// races `next_line` against the stop signal and drops the future when stop
/// wins, so implementations must tolerate being cancelled.
#[async_trait]
pub trait LineSource: Send {
    /// Read the next line with its terminator stripped.
    async fn next_line(&mut self) -> Result<Option<String>, StreamError>;
}

#[async_trait]
impl<R> LineSource for Lines<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        Ok(Lines::next_line(self).await?)
    }
}

/// Splits a chunked byte stream into lines.
///
/// Chunks are appended with [`push`](LineBuffer::push); complete lines are
/// taken with [`next_line`](LineBuffer::next_line). Both `\n` and `\r\n`
/// terminate a line. Invalid UTF-8 is replaced rather than rejected.
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    /// Bytes at the front of `buf` already known not to contain `\n`.
    scanned: usize,
    max_line_bytes: usize,
}

impl LineBuffer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            max_line_bytes,
        }
    }

    /// Append a chunk read from the stream.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete line, if one is buffered.
    ///
    /// Fails with [`StreamError::LineTooLong`] once a line exceeds the limit,
    /// whether or not its terminator has arrived.
    pub fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        match self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            Some(offset) => {
                let end = self.scanned + offset;
                self.scanned = 0;
                if content_len(&self.buf[..end]) > self.max_line_bytes {
                    return Err(self.too_long());
                }
                let line = self.buf.split_to(end + 1);
                Ok(Some(to_line(&line[..end])))
            }
            None => {
                self.scanned = self.buf.len();
                if content_len(&self.buf) > self.max_line_bytes {
                    return Err(self.too_long());
                }
                Ok(None)
            }
        }
    }

    /// Take whatever is left once the stream has ended.
    ///
    /// A final line without a terminator is still a line.
    pub fn finish(&mut self) -> Result<Option<String>, StreamError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        if content_len(&self.buf) > self.max_line_bytes {
            return Err(self.too_long());
        }
        self.scanned = 0;
        let rest = self.buf.split();
        Ok(Some(to_line(&rest)))
    }

    fn too_long(&self) -> StreamError {
        StreamError::LineTooLong {
            limit: self.max_line_bytes,
        }
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

/// Length of a line without a trailing `\r`.
fn content_len(bytes: &[u8]) -> usize {
    bytes.strip_suffix(b"\r").unwrap_or(bytes).len()
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
