//! Decoder line parsing
//!
//! Splits a raw decoder line into its fixed leading fields and the
//! free-text body. The body may legitimately contain the `|` delimiter,
//! so the split is bounded and the body takes all remaining text.

/// Protocol marker every decoder message line starts with
const MARKER: &str = "FLEX|";

/// Maximum number of parts produced by the bounded split
const MAX_FIELDS: usize = 7;

/// Minimum parts for a usable line: marker, local time, capcodes,
/// type and body
const MIN_FIELDS: usize = 5;

/// Fields extracted from one decoder line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Local display timestamp as emitted by the decoder (not reparsed)
    pub local_time: String,

    /// Whitespace-separated capcode tokens, unresolved
    pub capcodes: String,

    /// Short message-type code (e.g. "ALN"), opaque to this crate
    pub message_type: String,

    /// Free-text message body
    pub body: String,
}

/// Result of parsing one raw line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// A well-formed protocol line
    Parsed(ParsedLine),

    /// Line does not carry the protocol marker; expected noise
    NotProtocol,

    /// Marker present but too few fields to extract a message
    Malformed,
}

/// Parse one raw decoder line.
///
/// The line is split on `|` into at most [`MAX_FIELDS`] parts so the
/// body keeps any embedded delimiters. Field positions follow the
/// decoder format: local time is the second field, and the last three
/// fields are capcodes, type and body.
pub fn parse_line(line: &str) -> ParseOutcome {
    if !line.starts_with(MARKER) {
        return ParseOutcome::NotProtocol;
    }

    let parts: Vec<&str> = line.splitn(MAX_FIELDS, '|').collect();
    if parts.len() < MIN_FIELDS {
        return ParseOutcome::Malformed;
    }

    let n = parts.len();
    ParseOutcome::Parsed(ParsedLine {
        local_time: parts[1].to_string(),
        capcodes: parts[n - 3].to_string(),
        message_type: parts[n - 2].to_string(),
        body: parts[n - 1].to_string(),
    })
}
