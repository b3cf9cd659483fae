//! Priority tag extraction
//!
//! Dutch P2000 dispatches carry a priority token somewhere in the
//! message body (`A1`, `B2`, `P 1`, ...). Only the first occurrence
//! counts; a body without one gets the unknown sentinel.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// First word-bounded priority token, case-insensitive. `P 1` style
/// internal whitespace is tolerated and stripped on extraction.
static PRIORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(A0|A1|A2|B1|B2|P\s*1|TEST)\b").unwrap());

/// Message priority tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    A0,
    A1,
    A2,
    B1,
    B2,
    P1,
    Test,
    /// No priority token found in the body
    #[default]
    Unknown,
}

impl Priority {
    /// Canonical display token. `Unknown` uses the feed's `-` sentinel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::A0 => "A0",
            Priority::A1 => "A1",
            Priority::A2 => "A2",
            Priority::B1 => "B1",
            Priority::B2 => "B2",
            Priority::P1 => "P1",
            Priority::Test => "TEST",
            Priority::Unknown => "-",
        }
    }

    /// Parse a normalized (uppercase, no whitespace) label. Anything
    /// unrecognized maps to `Unknown` so stale snapshot files load.
    pub fn from_label(label: &str) -> Self {
        match label {
            "A0" => Priority::A0,
            "A1" => Priority::A1,
            "A2" => Priority::A2,
            "B1" => Priority::B1,
            "B2" => Priority::B2,
            "P1" => Priority::P1,
            "TEST" => Priority::Test,
            _ => Priority::Unknown,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Priority::from_label(&label))
    }
}

/// Extract the priority tag from a message body.
///
/// Scans for the first word-bounded token of the closed set; later
/// occurrences are ignored. Internal whitespace (`P 1`) is stripped
/// and the token is uppercased before mapping.
pub fn extract_priority(body: &str) -> Priority {
    match PRIORITY_RE.find(body) {
        Some(m) => {
            let token: String = m
                .as_str()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_uppercase();
            Priority::from_label(&token)
        }
        None => Priority::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_known_tokens() {
        assert_eq!(extract_priority("A1 Dorpsstraat 5"), Priority::A1);
        assert_eq!(extract_priority("Prio B2 nacontrole"), Priority::B2);
        assert_eq!(extract_priority("GRIP TEST oefening"), Priority::Test);
        assert_eq!(extract_priority("A0 reanimatie"), Priority::A0);
    }

    #[test]
    fn test_first_occurrence_wins() {
        assert_eq!(extract_priority("B1 opschalen naar A1"), Priority::B1);
        assert_eq!(extract_priority("A2 then TEST then A1"), Priority::A2);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(extract_priority("a1 brand gerucht"), Priority::A1);
        assert_eq!(extract_priority("test bericht"), Priority::Test);
    }

    #[test]
    fn test_internal_whitespace_stripped() {
        assert_eq!(extract_priority("P 1 BR gebouw"), Priority::P1);
        assert_eq!(extract_priority("P1 BR gebouw"), Priority::P1);
    }

    #[test]
    fn test_word_boundaries_respected() {
        // Token embedded in a larger word does not count
        assert_eq!(extract_priority("NA1000 straatnaam"), Priority::Unknown);
        assert_eq!(extract_priority("CONTESTED"), Priority::Unknown);
    }

    #[test]
    fn test_no_token_yields_unknown() {
        assert_eq!(extract_priority("gaslucht onderzoek"), Priority::Unknown);
        assert_eq!(extract_priority(""), Priority::Unknown);
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&Priority::P1).unwrap();
        assert_eq!(json, "\"P1\"");
        let back: Priority = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Priority::P1);

        let unknown = serde_json::to_string(&Priority::Unknown).unwrap();
        assert_eq!(unknown, "\"-\"");
        let back: Priority = serde_json::from_str(&unknown).unwrap();
        assert_eq!(back, Priority::Unknown);
    }

    #[test]
    fn test_unrecognized_label_maps_to_unknown() {
        let back: Priority = serde_json::from_str("\"Z9\"").unwrap();
        assert_eq!(back, Priority::Unknown);
    }
}
