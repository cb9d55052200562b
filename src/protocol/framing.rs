//! Line framing
//!
//! Splits an incoming byte stream into newline-terminated records. The
//! terminator (and any `\r` before it) is kept in the returned bytes so the
//! relay can forward records verbatim.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use super::constants::LINE_TERMINATOR;
use crate::error::{FrameError, Result};

/// Buffered reader yielding one complete line at a time
pub struct LineReader<R> {
    inner: BufReader<R>,
    max_line_length: usize,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Create a line reader with the given buffer capacity and line limit
    pub fn new(reader: R, buffer_size: usize, max_line_length: usize) -> Self {
        Self {
            inner: BufReader::with_capacity(buffer_size, reader),
            max_line_length,
            bytes_read: 0,
        }
    }

    /// Total bytes consumed from the underlying reader
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Read the next complete line
    ///
    /// Returns `Ok(None)` at end of stream. Bytes after the last terminator
    /// are discarded since they never formed a complete record.
    pub async fn next_line(&mut self) -> Result<Option<Bytes>> {
        let mut line = BytesMut::new();

        loop {
            let available = self.inner.fill_buf().await?;

            if available.is_empty() {
                if !line.is_empty() {
                    tracing::debug!(bytes = line.len(), "Discarding partial line at end of stream");
                }
                return Ok(None);
            }

            let (consumed, complete) =
                match available.iter().position(|b| *b == LINE_TERMINATOR) {
                    Some(pos) => {
                        line.extend_from_slice(&available[..=pos]);
                        (pos + 1, true)
                    }
                    None => {
                        line.extend_from_slice(available);
                        (available.len(), false)
                    }
                };

            self.inner.consume(consumed);
            self.bytes_read += consumed as u64;

            if line.len() > self.max_line_length {
                return Err(FrameError::LineTooLong {
                    limit: self.max_line_length,
                }
                .into());
            }

            if complete {
                return Ok(Some(line.freeze()));
            }
        }
    }
}
