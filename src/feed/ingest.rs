//! Ingestion pipeline
//!
//! Drives each decoder line through parse → enrich → store insert →
//! broadcast. All stream noise is absorbed here with counters; the
//! only terminal conditions are end-of-stream and shutdown.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::io::{AsyncBufRead, Lines};

use crate::enrich::{resolve_capcodes, CapcodeTable};
use crate::error::{Error, Result};
use crate::protocol::{extract_priority, parse_line, ParseOutcome};
use crate::registry::SubscriberRegistry;
use crate::store::{MessageStore, Record};

/// Ingestion counters
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    /// Physical lines read from the decoder
    pub lines_seen: u64,
    /// Records parsed, enriched and stored
    pub records: u64,
    /// Marker lines with too few fields
    pub malformed: u64,
    /// Non-protocol noise lines
    pub skipped: u64,
}

/// The ingest side of the pipeline
///
/// Holds the store, the subscriber registry and the read-only capcode
/// table; constructed once at startup and captured by the ingestion
/// task.
pub struct IngestPipeline {
    store: Arc<MessageStore>,
    registry: Arc<SubscriberRegistry>,
    table: Arc<CapcodeTable>,
}

impl IngestPipeline {
    /// Create a pipeline over the shared store and registry
    pub fn new(
        store: Arc<MessageStore>,
        registry: Arc<SubscriberRegistry>,
        table: Arc<CapcodeTable>,
    ) -> Self {
        Self {
            store,
            registry,
            table,
        }
    }

    /// Ingest one raw decoder line.
    ///
    /// Noise and malformed lines only bump counters. A parsed line is
    /// enriched, stored, and broadcast; serialization is skipped
    /// entirely when no subscriber is connected.
    pub async fn ingest_line(&self, line: &str, stats: &mut IngestStats) -> Option<Arc<Record>> {
        stats.lines_seen += 1;

        let parsed = match parse_line(line.trim()) {
            ParseOutcome::Parsed(parsed) => parsed,
            ParseOutcome::NotProtocol => {
                stats.skipped += 1;
                return None;
            }
            ParseOutcome::Malformed => {
                stats.malformed += 1;
                tracing::warn!(line = line, "Malformed protocol line");
                return None;
            }
        };

        let record = Record {
            local_time: parsed.local_time,
            captured_at: Utc::now(),
            priority: extract_priority(&parsed.body),
            capcodes: resolve_capcodes(&parsed.capcodes, &self.table),
            message_type: parsed.message_type,
            raw_text: parsed.body,
        };

        let stored = self.store.insert(record).await;
        stats.records += 1;

        tracing::debug!(
            priority = %stored.priority,
            capcodes = stored.capcodes.len(),
            "Record ingested"
        );

        if self.registry.count().await > 0 {
            match wire_frame(&stored) {
                Ok(frame) => {
                    self.registry.broadcast(frame).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Record serialization failed, not broadcast");
                }
            }
        }

        Some(stored)
    }

    /// Run the ingestion loop until the stream ends or shutdown fires.
    ///
    /// End-of-stream means the decoder is gone: fatal for this
    /// activity only, surfaced as [`Error::FeedEnded`] so the caller
    /// can decide whether to keep the serving side alive.
    pub async fn run_until<R, F>(&self, mut lines: Lines<R>, shutdown: F) -> Result<IngestStats>
    where
        R: AsyncBufRead + Unpin,
        F: std::future::Future<Output = ()>,
    {
        let mut stats = IngestStats::default();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        self.ingest_line(&line, &mut stats).await;
                    }
                    Ok(None) => {
                        tracing::error!(
                            lines = stats.lines_seen,
                            records = stats.records,
                            "Decoder stream ended"
                        );
                        return Err(Error::FeedEnded);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Decoder stream read failed");
                        return Err(Error::Io(e));
                    }
                },
                _ = &mut shutdown => {
                    tracing::info!(
                        lines = stats.lines_seen,
                        records = stats.records,
                        malformed = stats.malformed,
                        "Ingestion stopped"
                    );
                    return Ok(stats);
                }
            }
        }
    }
}

/// Serialize a record as one newline-delimited JSON wire frame.
///
/// The same encoding is used for the initial snapshot batch, so a
/// subscriber needs a single decoder for both.
pub fn wire_frame(record: &Record) -> Result<Bytes> {
    let mut json = serde_json::to_vec(record)?;
    json.push(b'\n');
    Ok(Bytes::from(json))
}
