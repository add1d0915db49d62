//! Telnet filtering for a MUSH client link.
//!
//! We never want any telnet option turned on, so every `DO` is answered with
//! `WONT` and every `WILL` with `DONT`. Subnegotiation blocks are dropped, and
//! the `CR NUL` pair that servers use for a bare carriage return is folded to
//! `CR` so the line framer only ever has to care about `\n`.

use bytes::BufMut;
use bytes::BytesMut;

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    #[default]
    Data,
    /// Previous data byte was `\r`; a following NUL is swallowed.
    Cr,
    Iac,
    Option {
        cmd: u8,
    },
    Subneg,
    SubnegIac,
}

#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: State,
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one chunk read from the socket.
    ///
    /// Plain text is appended to `data`; negotiation refusals that must be
    /// written back to the server are appended to `replies`. State carries over
    /// between calls, so a sequence split across reads is handled.
    pub fn feed(&mut self, chunk: &[u8], data: &mut BytesMut, replies: &mut BytesMut) {
        data.reserve(chunk.len());
        for &b in chunk {
            self.state = match self.state {
                State::Data | State::Cr => match b {
                    IAC => State::Iac,
                    0 if self.state == State::Cr => State::Data,
                    b'\r' => {
                        data.put_u8(b);
                        State::Cr
                    }
                    _ => {
                        data.put_u8(b);
                        State::Data
                    }
                },
                State::Iac => match b {
                    IAC => {
                        data.put_u8(IAC);
                        State::Data
                    }
                    DO | DONT | WILL | WONT => State::Option { cmd: b },
                    SB => State::Subneg,
                    // GA, NOP, EOR and friends carry nothing for us.
                    _ => State::Data,
                },
                State::Option { cmd } => {
                    match cmd {
                        DO => replies.put_slice(&[IAC, WONT, b]),
                        WILL => replies.put_slice(&[IAC, DONT, b]),
                        _ => {}
                    }
                    State::Data
                }
                State::Subneg => {
                    if b == IAC {
                        State::SubnegIac
                    } else {
                        State::Subneg
                    }
                }
                State::SubnegIac => {
                    if b == SE {
                        State::Data
                    } else {
                        State::Subneg
                    }
                }
            };
        }
    }
}
