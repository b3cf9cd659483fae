//! # pagerfeed
//!
//! A P2000 FLEX pager monitor backend: ingests the line stream of an
//! external radio decoder, enriches every message with a priority tag
//! and resolved capcodes, keeps a bounded recent history, and fans the
//! enriched records out live to any number of connected viewers.
//!
//! # Architecture
//!
//! ```text
//!  decoder subprocess ──lines──► IngestPipeline
//!                                  parse → enrich
//!                                       │
//!                                       ▼
//!                               MessageStore.insert ◄──── SnapshotPersister
//!                                       │                 (periodic save /
//!                                       ▼                  startup load)
//!                             SubscriberRegistry.broadcast
//!                                 │           │
//!                                 ▼           ▼
//!                            subscriber   subscriber
//!                             (TCP)        (TCP)
//! ```
//!
//! Three long-running activities share the store and the registry:
//! ingestion, the snapshot timer, and the accept loop. Each component
//! owns its state behind an internally synchronized interface and is
//! driven by a `run_until(shutdown)` future, so the demo binary can
//! coordinate shutdown with a single watch channel.
//!
//! Losing the decoder ends ingestion but not serving: viewers keep
//! receiving the last known history until the process restarts.

pub mod enrich;
pub mod error;
pub mod feed;
pub mod persist;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod store;

pub use enrich::{CapcodeEntry, CapcodeTable, ResolvedCapcode, ServiceCategory};
pub use error::{Error, Result};
pub use feed::{DecoderConfig, DecoderProcess, IngestPipeline};
pub use persist::SnapshotPersister;
pub use protocol::Priority;
pub use registry::SubscriberRegistry;
pub use server::{FeedServer, ServerConfig};
pub use store::{MessageStore, Record, StoreConfig};
