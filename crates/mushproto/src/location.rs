use crate::ParseError;

/// `say` a quoted id followed by its evaluated name.
///
/// The server echoes `You say, "<id>"<name>"`, which is what `parse_location`
/// expects back.
pub fn location_query(id: &str) -> String {
    format!("\"{id}\"[name({id})]")
}

/// Pull `(id, name)` out of a location query echo.
///
/// The reply must split on `"` into exactly four pieces: leading text, the id,
/// the name, and trailing text. Names that contain a quote therefore never
/// resolve.
pub fn parse_location(text: &str) -> Result<(String, String), ParseError> {
    let parts = text.split('"').collect::<Vec<_>>();
    if parts.len() != 4 {
        return Err(ParseError::QuoteCount {
            want: 4,
            got: parts.len(),
        });
    }
    Ok((parts[1].to_string(), parts[2].to_string()))
}
