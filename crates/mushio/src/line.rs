use bytes::Bytes;
use bytes::BytesMut;
use memchr::memchr;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

use crate::telnet::TelnetFilter;

/// What the server sent, after telnet filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// One text line without its `\r\n` / `\n` terminator.
    Line(String),
    /// Negotiation refusals to write back to the server.
    Reply(Bytes),
}

#[derive(Debug)]
pub struct TelnetLines<R> {
    inner: R,
    filter: TelnetFilter,
    raw: BytesMut,
    text: BytesMut,
    replies: BytesMut,
    max_line_len: usize,
}

impl<R> TelnetLines<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            filter: TelnetFilter::new(),
            raw: BytesMut::with_capacity(4 * 1024),
            text: BytesMut::with_capacity(8 * 1024),
            replies: BytesMut::new(),
            max_line_len: 16 * 1024,
        }
    }

    pub fn max_line_len(mut self, max: usize) -> Self {
        self.max_line_len = max.max(1);
        self
    }
}

impl<R: AsyncRead + Unpin> TelnetLines<R> {
    /// Read the next line or pending negotiation reply.
    ///
    /// Replies are handed out before any further reading so the server never
    /// waits on us. Invalid UTF-8 is replaced rather than rejected; MUSH output
    /// is not guaranteed to be clean.
    ///
    /// Cancel safe: the only await point is the socket read, and everything
    /// read so far is kept in `self`.
    ///
    /// Returns:
    /// - `Ok(Some(..))` for a line (may be empty) or a reply,
    /// - `Ok(None)` on clean EOF with no buffered text.
    pub async fn next(&mut self) -> std::io::Result<Option<Incoming>> {
        loop {
            if !self.replies.is_empty() {
                return Ok(Some(Incoming::Reply(self.replies.split().freeze())));
            }

            if let Some(i) = memchr(b'\n', &self.text) {
                let raw = self.text.split_to(i + 1);
                return Ok(Some(Incoming::Line(decode_line(&raw))));
            }

            if self.text.len() > self.max_line_len {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "line too long",
                ));
            }

            self.raw.clear();
            let n = self.inner.read_buf(&mut self.raw).await?;
            if n == 0 {
                if self.text.is_empty() {
                    return Ok(None);
                }
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "eof while reading line",
                ));
            }
            self.filter.feed(&self.raw, &mut self.text, &mut self.replies);
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && raw[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
