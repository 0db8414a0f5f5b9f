//! Async line reader that splits on `\n`, `\r` and `\r\n`.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::decode::decode_line;

/// Longest line kept in memory. Output without any terminator is cut into
/// chunks of this size.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Reads decoded lines from a buffered byte stream.
///
/// The only state kept between calls is whether the previous line ended in
/// `\r`, so that a `\n` arriving in the next buffer is not read as an extra
/// empty line.
pub struct LineReader<R> {
    inner: R,
    skip_lf: bool,
    max_line: usize,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            skip_lf: false,
            max_line: MAX_LINE_BYTES,
        }
    }

    #[cfg(test)]
    fn with_max_line(mut self, max_line: usize) -> Self {
        self.max_line = max_line.max(1);
        self
    }

    /// Next line without its terminator, or `None` at end of stream.
    /// A final unterminated line is returned before `None`; an unterminated
    /// run longer than the line limit comes back in limit-sized pieces.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = Vec::new();
        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                if line.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(decode_line(&line)));
            }

            let mut start = 0;
            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    start = 1;
                }
            }

            match available[start..]
                .iter()
                .position(|b| *b == b'\n' || *b == b'\r')
            {
                Some(offset) if line.len() + offset > self.max_line => {
                    let take = self.max_line - line.len();
                    line.extend_from_slice(&available[start..start + take]);
                    self.inner.consume(start + take);
                    return Ok(Some(decode_line(&line)));
                }
                Some(offset) => {
                    let end = start + offset;
                    line.extend_from_slice(&available[start..end]);
                    let terminator = available[end];
                    self.inner.consume(end + 1);
                    self.skip_lf = terminator == b'\r';
                    return Ok(Some(decode_line(&line)));
                }
                None => {
                    let room = self.max_line.saturating_sub(line.len());
                    let take = (available.len() - start).min(room);
                    line.extend_from_slice(&available[start..start + take]);
                    self.inner.consume(start + take);
                    if line.len() >= self.max_line {
                        return Ok(Some(decode_line(&line)));
                    }
                }
            }
        }
    }
}
