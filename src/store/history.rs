//! Message store implementation
//!
//! Owns the bounded, newest-first history of enriched records and the
//! eviction policy. Insert and snapshot are safe under concurrency;
//! all mutation is serialized behind one write lock.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::config::StoreConfig;
use super::record::Record;

/// Bounded, ordered, in-memory store of enriched records
///
/// Ordering invariant: newest-first by insertion; eviction trims the
/// tail and never reorders survivors. Capture timestamps are clamped
/// at insertion so they are non-decreasing in insertion order even if
/// the wall clock steps backwards.
pub struct MessageStore {
    records: RwLock<VecDeque<Arc<Record>>>,
    config: StoreConfig,
}

impl MessageStore {
    /// Create an empty store with default bounds
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with custom bounds
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            config,
        }
    }

    /// Get the store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Insert a record and apply the eviction policy.
    ///
    /// The record is prepended (newest-first), its capture timestamp
    /// clamped against the previous newest, then age pruning runs
    /// followed by the count bound. Eviction is pure trimming: there
    /// is no "store full" error.
    ///
    /// Returns the stored record for broadcasting.
    pub async fn insert(&self, mut record: Record) -> Arc<Record> {
        let mut records = self.records.write().await;

        if let Some(newest) = records.front() {
            if record.captured_at < newest.captured_at {
                record.captured_at = newest.captured_at;
            }
        }

        let stored = Arc::new(record);
        records.push_front(Arc::clone(&stored));
        self.evict(&mut records);

        stored
    }

    /// Take a consistent copy of the current history, newest-first.
    ///
    /// Clones `Arc` pointers only; safe to hand to a new subscriber or
    /// the persister without blocking inserts beyond the copy itself.
    pub async fn snapshot(&self) -> Vec<Arc<Record>> {
        let records = self.records.read().await;
        records.iter().cloned().collect()
    }

    /// Seed the store once at startup from persisted state.
    ///
    /// Replaces the current contents and immediately applies eviction:
    /// persisted data may violate the current bounds if retention or
    /// limits changed between runs.
    pub async fn load_initial(&self, seed: Vec<Record>) {
        let mut records = self.records.write().await;

        *records = seed.into_iter().map(Arc::new).collect();
        let before = records.len();
        self.evict(&mut records);

        tracing::info!(
            loaded = records.len(),
            evicted = before - records.len(),
            "Store seeded from persisted history"
        );
    }

    /// Number of retained records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Apply the eviction policy: age bound first, then count bound on
    /// the age-pruned sequence. Oldest records sit at the back.
    fn evict(&self, records: &mut VecDeque<Arc<Record>>) {
        let retention =
            chrono::Duration::from_std(self.config.retention).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now() - retention;

        while matches!(records.back(), Some(oldest) if oldest.captured_at < cutoff) {
            records.pop_back();
        }

        if records.len() > self.config.max_records {
            records.truncate(self.config.max_records);
        }
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
