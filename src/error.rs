//! Crate error types
//!
//! Errors that cross component boundaries. Expected stream noise
//! (non-protocol lines, unmatched capcodes, unknown priority) is never
//! represented here; it is absorbed inline with default values.

use std::path::PathBuf;

/// Convenience result type for pagerfeed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pagerfeed operations
#[derive(Debug)]
pub enum Error {
    /// I/O error (socket, file, pipe)
    Io(std::io::Error),
    /// Snapshot or wire frame (de)serialization failed
    Serialize(serde_json::Error),
    /// Capcode table could not be read
    Lookup { path: PathBuf, source: csv::Error },
    /// The decoder process could not be spawned or lost its stdout
    DecoderSpawn(String),
    /// The decoder output stream ended; ingestion is over
    FeedEnded,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Serialize(e) => write!(f, "serialization error: {}", e),
            Error::Lookup { path, source } => {
                write!(f, "capcode table {} unreadable: {}", path.display(), source)
            }
            Error::DecoderSpawn(msg) => write!(f, "decoder spawn failed: {}", msg),
            Error::FeedEnded => write!(f, "decoder output stream ended"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Serialize(e) => Some(e),
            Error::Lookup { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialize(e)
    }
}
