//! Message enrichment
//!
//! Turns the raw capcode blob of a parsed line into human-readable,
//! classified fragments using a read-only lookup table loaded at
//! startup. Both halves are pure lookups: a missing table row or an
//! odd token degrades to an "unmatched" fragment, never an error.

pub mod lookup;
pub mod resolve;

pub use lookup::{CapcodeEntry, CapcodeTable};
pub use resolve::{resolve_capcodes, ResolvedCapcode, ServiceCategory};
