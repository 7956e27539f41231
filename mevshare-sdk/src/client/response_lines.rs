use async_trait::async_trait;
use reqwest::Response;

use crate::stream::{LineBuffer, LineSource, StreamError};

/// Reads lines from a streaming HTTP response body.
///
/// Dropping it drops the response and with it the connection.
#[derive(Debug)]
pub struct ResponseLines {
    response: Response,
    lines: LineBuffer,
    exhausted: bool,
}

impl ResponseLines {
    pub fn new(response: Response, max_line_bytes: usize) -> Self {
        Self {
            response,
            lines: LineBuffer::new(max_line_bytes),
            exhausted: false,
        }
    }
}

#[async_trait]
impl LineSource for ResponseLines {
    async fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        loop {
            if let Some(line) = self.lines.next_line()? {
                return Ok(Some(line));
            }
            if self.exhausted {
                return self.lines.finish();
            }
            match self.response.chunk().await? {
                Some(chunk) => self.lines.push(&chunk),
                None => self.exhausted = true,
            }
        }
    }
}
