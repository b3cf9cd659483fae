//! FLEX decoder line protocol
//!
//! The external decoder emits one physical text line per pager message:
//!
//! ```text
//! FLEX|<local time>|<frame info>|...|<capcodes>|<type>|<message body>
//! ```
//!
//! Anything not starting with the `FLEX|` marker is expected stream
//! noise (demodulator chatter, partial frames) and is dropped without
//! comment. A marker line that is missing fields is malformed and gets
//! counted, but neither case is an error: the feed is best-effort by
//! contract and ingestion must keep running.

pub mod line;
pub mod priority;

pub use line::{parse_line, ParseOutcome, ParsedLine};
pub use priority::{extract_priority, Priority};
