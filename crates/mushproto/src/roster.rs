use crate::ParseError;

pub const WHO_COMMAND: &str = "who";

const HEADER_PREFIX: &str = "Player Name";
const FOOTER_MARKER: &str = "logged in";
const PLAYER_FIELDS: usize = 6;
const NAME_FIELD: usize = 0;
const LOCATION_FIELD: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    /// Room id as the server reports it, e.g. `#1234`.
    pub location_id: String,
}

/// Parse a `who` reply.
///
/// The reply is a header line starting with `Player Name`, one line per player,
/// and a footer such as `3 Players logged in.` followed by the final line
/// terminator, so the footer is the second-to-last piece after splitting on
/// `\n`. Player lines must have exactly six whitespace separated fields; any
/// other line between header and footer is skipped.
pub fn parse_roster(text: &str) -> Result<Vec<Player>, ParseError> {
    let lines = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect::<Vec<_>>();
    if lines.len() < 3 {
        return Err(ParseError::TooFewLines {
            need: 3,
            got: lines.len(),
        });
    }

    let header = lines[0];
    if !header.starts_with(HEADER_PREFIX) {
        return Err(ParseError::BadHeader(header.to_string()));
    }
    let footer_at = lines.len() - 2;
    if !lines[footer_at].contains(FOOTER_MARKER) {
        return Err(ParseError::BadFooter(lines[footer_at].to_string()));
    }

    let players = lines[1..footer_at]
        .iter()
        .filter_map(|line| {
            let fields = line.split_whitespace().collect::<Vec<_>>();
            if fields.len() != PLAYER_FIELDS {
                return None;
            }
            Some(Player {
                name: fields[NAME_FIELD].to_string(),
                location_id: fields[LOCATION_FIELD].to_string(),
            })
        })
        .collect();
    Ok(players)
}
