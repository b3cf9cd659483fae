//! Subscriber registry and broadcast fan-out
//!
//! The registry owns the set of live subscribers and routes each newly
//! stored record to all of them.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<SubscriberRegistry>
//!                ┌─────────────────────────────┐
//!                │ subscribers: HashMap<Id,    │
//!                │   SubscriberEntry {         │
//!                │     tx: mpsc::Sender,       │
//!                │     state,                  │
//!                │   }                         │
//!                │ >                           │
//!                └─────────────┬───────────────┘
//!                              │
//!            ┌─────────────────┼─────────────────┐
//!            │                 │                 │
//!            ▼                 ▼                 ▼
//!       [Ingest]         [Subscriber]      [Subscriber]
//!       broadcast()      rx.recv()         rx.recv()
//!            │                 │                 │
//!            └──► try_send ────► write task ───► TCP
//! ```
//!
//! Each subscriber gets its own bounded queue, so delivery is
//! fire-and-forget from the ingest path: a slow or dead subscriber
//! fills (or closes) its queue, which counts as its write failure and
//! removes it from the registry without delaying anyone else.
//!
//! # Zero-Copy Design
//!
//! The payload is `bytes::Bytes`: serialized once per record, cloned
//! per subscriber by reference count only.

pub mod entry;
pub mod store;

pub use entry::{SubscriberEntry, SubscriberId, SubscriberState};
pub use store::SubscriberRegistry;
