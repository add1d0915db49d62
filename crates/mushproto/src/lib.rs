//! `mushproto`: the text protocol spoken with a TinyMUSH-style server.
//!
//! The server has no machine-readable output, so we issue a few commands whose
//! replies have a known shape and pick them apart:
//! - `who` lists connected players (`roster`),
//! - a `say` of `"<id>"[name(<id>)]` echoes a room id and its name (`location`).
//!
//! Parsers take the whole reply text, one `\n`-terminated line per server line.

pub mod location;
pub mod roster;

pub use location::{location_query, parse_location};
pub use roster::{parse_roster, Player, WHO_COMMAND};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    TooFewLines { need: usize, got: usize },
    BadHeader(String),
    BadFooter(String),
    QuoteCount { want: usize, got: usize },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::TooFewLines { need, got } => {
                write!(f, "reply too short: need {need} lines, got {got}")
            }
            ParseError::BadHeader(l) => write!(f, "unexpected who header: {l:?}"),
            ParseError::BadFooter(l) => write!(f, "unexpected who footer: {l:?}"),
            ParseError::QuoteCount { want, got } => {
                write!(f, "location reply split into {got} quoted pieces, want {want}")
            }
        }
    }
}

impl std::error::Error for ParseError {}
