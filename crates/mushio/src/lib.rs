//! `mushio`: client-side telnet line IO for talking to a MUSH.
//!
//! - `telnet`: strip IAC sequences and refuse every option,
//! - `line`: CR/LF line framing on top of the filtered stream,
//! - `batch`: group lines that arrive together into one message.

pub mod batch;
pub mod line;
pub mod telnet;
