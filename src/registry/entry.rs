//! Subscriber entry and state types
//!
//! This module defines the per-subscriber state stored in the registry.

use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Unique identifier for a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscriber lifecycle state
///
/// `Connecting → Active` on successful registration; `Active →
/// Closing` on the first write failure or explicit disconnect; a
/// closing subscriber is discarded immediately and never receives a
/// later broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    /// Connection accepted, not yet registered
    Connecting,
    /// Registered and receiving broadcasts
    Active,
    /// First write failure or disconnect seen; about to be removed
    Closing,
}

/// Entry for a single subscriber in the registry
///
/// The sender is the uniform sink capability: the registry pushes
/// serialized frames into it and never learns what kind of connection
/// drains the other end.
#[derive(Debug)]
pub struct SubscriberEntry {
    /// Subscriber ID
    pub id: SubscriberId,

    /// Current lifecycle state
    pub state: SubscriberState,

    /// Bounded frame queue toward the connection's write task
    pub(super) tx: mpsc::Sender<Bytes>,

    /// When the subscriber registered
    pub connected_at: Instant,
}

impl SubscriberEntry {
    pub(super) fn new(id: SubscriberId, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            state: SubscriberState::Connecting,
            tx,
            connected_at: Instant::now(),
        }
    }

    /// Queue a frame without waiting.
    ///
    /// A full or closed queue is this subscriber's delivery failure;
    /// it must not stall the caller.
    pub(super) fn try_send(&self, payload: Bytes) -> bool {
        self.tx.try_send(payload).is_ok()
    }

    /// Time since registration
    pub fn connected_for(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}
