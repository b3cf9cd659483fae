//! Capcode resolution and service classification
//!
//! Each whitespace-separated token in the raw capcode blob is reduced
//! to its candidate canonical forms, looked up in the table, and
//! classified into a service category. Tokens that match nothing are
//! kept verbatim as unmatched fragments so the original order is
//! always preserved.

use serde::{Deserialize, Serialize};

use super::lookup::{CapcodeEntry, CapcodeTable};

/// Service category of a matched capcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    /// Trauma team / medical helicopter, checked before the
    /// service-based categories
    Trauma,
    Fire,
    Ambulance,
    Police,
    Unknown,
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ServiceCategory::Trauma => "trauma",
            ServiceCategory::Fire => "fire",
            ServiceCategory::Ambulance => "ambulance",
            ServiceCategory::Police => "police",
            ServiceCategory::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// One rendering fragment per capcode token, order-preserving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolvedCapcode {
    /// Token matched a table entry
    Matched {
        /// Canonical capcode the lookup succeeded under
        capcode: String,
        entry: CapcodeEntry,
        category: ServiceCategory,
    },
    /// Token matched nothing; kept verbatim
    Unmatched { token: String },
}

/// Candidate canonical forms for one token, in lookup order.
///
/// A long all-digit token (9+) is tried by its last seven digits; a
/// 7-digit token by itself and its zero-padded form (identical here,
/// kept for the fixed candidate contract). Anything else has no
/// candidates.
fn candidates(token: &str) -> Vec<String> {
    let token = token.trim();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return Vec::new();
    }

    let mut out = Vec::new();
    if token.len() >= 9 {
        out.push(token[token.len() - 7..].to_string());
    }
    if token.len() == 7 {
        out.push(token.to_string());
        let padded = format!("{:0>7}", token);
        if padded != token[..] {
            out.push(padded);
        }
    }
    out
}

/// Classify a matched entry into exactly one category.
///
/// Trauma keys on the unit name and wins over every service-based
/// category; the remaining rules test the service name in fixed order.
fn classify(entry: &CapcodeEntry) -> ServiceCategory {
    let service = entry.service_name.to_lowercase();
    let unit = entry.unit_name.to_lowercase();

    if ["trauma", "heli", "lifeliner", "mmt"]
        .iter()
        .any(|needle| unit.contains(needle))
    {
        ServiceCategory::Trauma
    } else if service.contains("brandweer") {
        ServiceCategory::Fire
    } else if ["ambulance", "rav", "ghor"]
        .iter()
        .any(|needle| service.contains(needle))
    {
        ServiceCategory::Ambulance
    } else if service.contains("politie") || service.contains("kmar") {
        ServiceCategory::Police
    } else {
        ServiceCategory::Unknown
    }
}

/// Resolve a raw capcode blob into ordered rendering fragments.
///
/// For each token the candidates are tried in order and the first
/// table hit wins. Resolution is deterministic: the same token against
/// the same table always yields the same fragment.
pub fn resolve_capcodes(blob: &str, table: &CapcodeTable) -> Vec<ResolvedCapcode> {
    blob.split_whitespace()
        .map(|token| {
            for candidate in candidates(token) {
                if let Some(entry) = table.get(&candidate) {
                    return ResolvedCapcode::Matched {
                        capcode: candidate,
                        entry: entry.clone(),
                        category: classify(entry),
                    };
                }
            }
            ResolvedCapcode::Unmatched {
                token: token.to_string(),
            }
        })
        .collect()
}
