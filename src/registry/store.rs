//! Subscriber registry implementation
//!
//! The central registry that owns all live subscribers and fans each
//! broadcast frame out to their queues.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::{mpsc, RwLock};

use super::entry::{SubscriberEntry, SubscriberId, SubscriberState};

/// Default per-subscriber queue depth
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Central registry for all live subscribers
///
/// Thread-safe via `RwLock`: broadcasts take the read lock to snapshot
/// the current subscriber set, so registration and removal interleave
/// safely with an in-flight broadcast. A subscriber registering after
/// the snapshot was taken does not receive that frame.
pub struct SubscriberRegistry {
    /// Map of subscriber ID to entry
    subscribers: RwLock<HashMap<SubscriberId, SubscriberEntry>>,

    /// Next subscriber ID to allocate
    next_id: AtomicU64,

    /// Queue depth handed to new subscribers
    queue_capacity: usize,
}

impl SubscriberRegistry {
    /// Create a new registry with the default queue depth
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a new registry with a custom per-subscriber queue depth
    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity,
        }
    }

    /// Register a new subscriber.
    ///
    /// Returns the allocated ID and the receiving end of its frame
    /// queue; the caller drains the receiver into its connection.
    pub async fn register(&self) -> (SubscriberId, mpsc::Receiver<Bytes>) {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        let mut entry = SubscriberEntry::new(id, tx);
        entry.state = SubscriberState::Active;

        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(id, entry);

        tracing::info!(
            subscriber_id = %id,
            subscribers = subscribers.len(),
            "Subscriber registered"
        );

        (id, rx)
    }

    /// Remove a subscriber on explicit disconnect.
    ///
    /// Idempotent: removal after a delivery failure already discarded
    /// the entry is a no-op.
    pub async fn unregister(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.write().await;

        if let Some(mut entry) = subscribers.remove(&id) {
            entry.state = SubscriberState::Closing;
            tracing::info!(
                subscriber_id = %id,
                connected_secs = entry.connected_for().as_secs(),
                subscribers = subscribers.len(),
                "Subscriber unregistered"
            );
        }
    }

    /// Broadcast a serialized frame to every active subscriber.
    ///
    /// Delivery per subscriber is independent: each gets a bounded
    /// `try_send`, and a full or closed queue fails only that
    /// subscriber, which is removed before this call returns so it
    /// never sees a later broadcast. Returns the delivered count.
    pub async fn broadcast(&self, payload: Bytes) -> usize {
        let mut delivered = 0usize;
        let mut failed = Vec::new();

        {
            let subscribers = self.subscribers.read().await;

            // Fast path: nobody is listening
            if subscribers.is_empty() {
                return 0;
            }

            // try_send never blocks, so holding the read lock across
            // the fan-out keeps the subscriber set consistent for this
            // frame without stalling registration for long.
            for (id, entry) in subscribers.iter() {
                if entry.try_send(payload.clone()) {
                    delivered += 1;
                } else {
                    failed.push(*id);
                }
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in failed {
                if let Some(mut entry) = subscribers.remove(&id) {
                    entry.state = SubscriberState::Closing;
                    tracing::warn!(
                        subscriber_id = %id,
                        "Subscriber dropped: queue full or connection gone"
                    );
                }
            }
        }

        delivered
    }

    /// Number of live subscribers
    pub async fn count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
