//! Enriched message record
//!
//! One decoded pager message after enrichment. Immutable once
//! inserted into the store; the store only ever evicts whole records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enrich::ResolvedCapcode;
use crate::protocol::Priority;

/// One enriched, immutable decoded message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Display timestamp as emitted by the decoder. Opaque: not
    /// reparsed, not guaranteed monotonic or even well-formed.
    pub local_time: String,

    /// Capture timestamp assigned by the pipeline at ingestion,
    /// monotonically non-decreasing in insertion order
    pub captured_at: DateTime<Utc>,

    /// Extracted priority tag. Defaults to the unknown sentinel so
    /// history files written before this field existed still load.
    #[serde(default)]
    pub priority: Priority,

    /// Ordered rendering fragments, one per capcode token
    pub capcodes: Vec<ResolvedCapcode>,

    /// Message-type code passed through from the decoder
    pub message_type: String,

    /// Full message body
    pub raw_text: String,
}

impl Record {
    /// Age of this record relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.captured_at
    }
}
