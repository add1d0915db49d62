//! Group lines into messages.
//!
//! A MUSH answers one command with any number of lines and no end marker. We
//! treat everything that arrives until the socket has been quiet for a short
//! window as one message; each line in it keeps a trailing `\n`.

use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::line::{Incoming, TelnetLines};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Message(String),
    Reply(Bytes),
}

#[derive(Debug)]
pub struct MessageReader<R> {
    lines: TelnetLines<R>,
    quiet: Duration,
    pending: String,
    max_message_len: usize,
}

impl<R> MessageReader<R> {
    pub fn new(inner: R, quiet: Duration) -> Self {
        Self {
            lines: TelnetLines::new(inner),
            quiet,
            pending: String::new(),
            max_message_len: 256 * 1024,
        }
    }

    pub fn max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = max.max(1);
        self
    }
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    /// Wait for the next complete message or negotiation reply.
    ///
    /// Cancel safe: lines already collected stay in `self` and the quiet window
    /// restarts on the next call.
    ///
    /// Returns `Ok(None)` on EOF once any pending message has been handed out.
    pub async fn next(&mut self) -> std::io::Result<Option<Received>> {
        loop {
            if self.pending.len() >= self.max_message_len {
                return Ok(Some(self.flush()));
            }

            let res = if self.pending.is_empty() {
                self.lines.next().await
            } else {
                match tokio::time::timeout(self.quiet, self.lines.next()).await {
                    Ok(res) => res,
                    Err(_) => return Ok(Some(self.flush())),
                }
            };

            match res? {
                Some(Incoming::Line(line)) => {
                    self.pending.push_str(&line);
                    self.pending.push('\n');
                }
                Some(Incoming::Reply(b)) => return Ok(Some(Received::Reply(b))),
                None if self.pending.is_empty() => return Ok(None),
                None => return Ok(Some(self.flush())),
            }
        }
    }

    fn flush(&mut self) -> Received {
        Received::Message(std::mem::take(&mut self.pending))
    }
}
