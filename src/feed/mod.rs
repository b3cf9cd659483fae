//! Decoder feed ingestion
//!
//! The feed side of the pipeline: spawn (or be handed) a line-oriented
//! byte stream from the external radio decoder and drive every line
//! through parse → enrich → store → broadcast. The decoder is an
//! opaque, best-effort producer; garbled or dropped lines are expected
//! and tolerated. End of stream is terminal for ingestion only: the
//! serving side keeps answering with the last known history.

pub mod decoder;
pub mod ingest;

pub use decoder::{DecoderConfig, DecoderProcess};
pub use ingest::{wire_frame, IngestPipeline, IngestStats};
