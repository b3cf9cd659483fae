//! Feed server listener
//!
//! Handles the TCP accept loop and spawns one task per subscriber
//! connection. A new connection registers with the registry, receives
//! the current history as one batch, then acts as a pure sink for
//! broadcast frames until it disconnects or falls behind.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::WriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Semaphore};

use crate::error::Result;
use crate::registry::SubscriberRegistry;
use crate::server::config::ServerConfig;
use crate::store::{MessageStore, Record};

/// Live feed server
pub struct FeedServer {
    config: ServerConfig,
    store: Arc<MessageStore>,
    registry: Arc<SubscriberRegistry>,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl FeedServer {
    /// Create a new server over the shared store and registry
    pub fn new(
        config: ServerConfig,
        store: Arc<MessageStore>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            store,
            registry,
            connection_semaphore,
        }
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the accept loop until the shutdown future resolves.
    ///
    /// On shutdown the listener stops accepting; tasks serving
    /// existing subscribers wind down on their own as connections
    /// close or broadcasts stop.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Feed server listening");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        self.handle_connection(socket, peer_addr).await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                    }
                },
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let store = Arc::clone(&self.store);
        let registry = Arc::clone(&self.registry);
        let write_timeout = self.config.write_timeout;

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = serve_subscriber(socket, peer_addr, store, registry, write_timeout).await
            {
                tracing::debug!(peer = %peer_addr, error = %e, "Subscriber connection error");
            }

            tracing::debug!(peer = %peer_addr, "Subscriber connection closed");
        });
    }
}

/// Serve one subscriber connection for its whole lifetime.
///
/// Registration precedes the snapshot push, so a record broadcast
/// while the batch is being written is queued and delivered right
/// after it. Unregistration is unconditional on the way out.
async fn serve_subscriber(
    mut socket: TcpStream,
    peer_addr: SocketAddr,
    store: Arc<MessageStore>,
    registry: Arc<SubscriberRegistry>,
    write_timeout: Duration,
) -> Result<()> {
    let (id, mut rx) = registry.register().await;
    tracing::info!(subscriber_id = %id, peer = %peer_addr, "Subscriber connected");

    let result = stream_records(&mut socket, &store, &mut rx, write_timeout).await;

    registry.unregister(id).await;
    result
}

async fn stream_records(
    socket: &mut TcpStream,
    store: &MessageStore,
    rx: &mut mpsc::Receiver<Bytes>,
    write_timeout: Duration,
) -> Result<()> {
    let (mut reader, mut writer) = socket.split();

    // Initial batch: the full current history as one JSON array line
    let snapshot = store.snapshot().await;
    let view: Vec<&Record> = snapshot.iter().map(|r| r.as_ref()).collect();
    let mut batch = serde_json::to_vec(&view)?;
    batch.push(b'\n');
    timed_write(&mut writer, &batch, write_timeout).await?;

    // Pure sink from here on: forward queued frames, watch for EOF.
    // Inbound bytes carry no application meaning and are discarded.
    let mut drain = [0u8; 512];
    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => {
                    timed_write(&mut writer, &frame, write_timeout).await?;
                }
                // Queue closed: the registry dropped this subscriber
                None => return Ok(()),
            },
            read = reader.read(&mut drain) => match read {
                Ok(0) => return Ok(()), // peer closed
                Ok(_) => {}
                Err(e) => return Err(e.into()),
            },
        }
    }
}

async fn timed_write(
    writer: &mut WriteHalf<'_>,
    payload: &[u8],
    write_timeout: Duration,
) -> std::io::Result<()> {
    match tokio::time::timeout(write_timeout, writer.write_all(payload)).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "subscriber write timed out",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ingest::wire_frame;
    use crate::protocol::Priority;
    use chrono::Utc;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn record(body: &str) -> Record {
        Record {
            local_time: "12:00:00".to_string(),
            captured_at: Utc::now(),
            priority: Priority::A1,
            capcodes: Vec::new(),
            message_type: "ALN".to_string(),
            raw_text: body.to_string(),
        }
    }

    async fn spawn_serving_listener(
        store: Arc<MessageStore>,
        registry: Arc<SubscriberRegistry>,
    ) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (socket, peer_addr) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(_) => return,
                };
                let store = Arc::clone(&store);
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let _ = serve_subscriber(
                        socket,
                        peer_addr,
                        store,
                        registry,
                        Duration::from_secs(5),
                    )
                    .await;
                });
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_subscriber_gets_snapshot_then_live_frames() {
        let store = Arc::new(MessageStore::new());
        store.insert(record("historisch")).await;

        let registry = Arc::new(SubscriberRegistry::new());
        let addr = spawn_serving_listener(Arc::clone(&store), Arc::clone(&registry)).await;

        let client = TcpStream::connect(addr).await.unwrap();
        let mut lines = BufReader::new(client).lines();

        // Initial batch arrives as one JSON array line
        let batch_line = lines.next_line().await.unwrap().unwrap();
        let batch: Vec<Record> = serde_json::from_str(&batch_line).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].raw_text, "historisch");

        // Registration happened before the batch was written
        assert_eq!(registry.count().await, 1);

        // A live broadcast arrives as its own line
        let live = store.insert(record("live melding")).await;
        registry.broadcast(wire_frame(&live).unwrap()).await;

        let live_line = lines.next_line().await.unwrap().unwrap();
        let decoded: Record = serde_json::from_str(&live_line).unwrap();
        assert_eq!(&decoded, live.as_ref());
    }

    #[tokio::test]
    async fn test_disconnect_unregisters_subscriber() {
        let store = Arc::new(MessageStore::new());
        let registry = Arc::new(SubscriberRegistry::new());
        let addr = spawn_serving_listener(Arc::clone(&store), Arc::clone(&registry)).await;

        let client = TcpStream::connect(addr).await.unwrap();
        let mut lines = BufReader::new(client).lines();
        lines.next_line().await.unwrap().unwrap(); // initial batch
        assert_eq!(registry.count().await, 1);

        drop(lines);

        // The serving task notices EOF and unregisters
        let mut settled = false;
        for _ in 0..50 {
            if registry.count().await == 0 {
                settled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(settled, "subscriber was not unregistered after disconnect");
    }

    #[tokio::test]
    async fn test_empty_store_sends_empty_batch() {
        let store = Arc::new(MessageStore::new());
        let registry = Arc::new(SubscriberRegistry::new());
        let addr = spawn_serving_listener(store, registry).await;

        let client = TcpStream::connect(addr).await.unwrap();
        let mut lines = BufReader::new(client).lines();

        let batch_line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(batch_line, "[]");
    }

    #[tokio::test]
    async fn test_run_until_stops_accepting_on_shutdown() {
        let store = Arc::new(MessageStore::new());
        let registry = Arc::new(SubscriberRegistry::new());
        let config = ServerConfig::default().bind("127.0.0.1:0".parse().unwrap());
        let server = FeedServer::new(config, store, registry);

        // Already-resolved shutdown: run_until returns promptly
        server.run_until(async {}).await.unwrap();
    }
}
