//! P2000 FLEX feed server
//!
//! Run with: cargo run --example feed_server [BIND_ADDR] [OPTIONS]
//!
//! Examples:
//!   cargo run --example feed_server                     # binds to 0.0.0.0:8113
//!   cargo run --example feed_server localhost:9000
//!   cargo run --example feed_server -- --decoder "cat fixture.txt"
//!
//! Wires the full pipeline: decoder subprocess → ingest → store →
//! broadcast, with the snapshot persister and the TCP feed server
//! running alongside. A connected viewer first receives the current
//! history as one JSON array line, then one JSON object per line as
//! new messages arrive.
//!
//! Ctrl-C triggers a coordinated shutdown: ingestion stops and the
//! decoder is terminated (with a kill grace period), the persister
//! writes one final snapshot, and the listener stops accepting.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use pagerfeed::{
    CapcodeTable, DecoderConfig, DecoderProcess, FeedServer, IngestPipeline, MessageStore,
    ServerConfig, SnapshotPersister, SubscriberRegistry,
};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8113
/// - "localhost:9000" -> 127.0.0.1:9000
/// - "0.0.0.0:8113" -> 0.0.0.0:8113
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8113;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: feed_server [BIND_ADDR] [OPTIONS]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR            Address to bind to (default: 0.0.0.0:8113)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --capcodes <FILE>    Capcode CSV (default: capcodelijst.csv)");
    eprintln!("  --history <FILE>     Snapshot file (default: p2000_history.json)");
    eprintln!("  --decoder <CMD>      Decoder shell command override");
    eprintln!("  -v, --verbose        Debug logging");
}

struct Args {
    bind_addr: SocketAddr,
    capcode_path: PathBuf,
    history_path: PathBuf,
    decoder_cmd: Option<String>,
    verbose: bool,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut args = Args {
        bind_addr: "0.0.0.0:8113".parse().unwrap(),
        capcode_path: PathBuf::from("capcodelijst.csv"),
        history_path: PathBuf::from("p2000_history.json"),
        decoder_cmd: None,
        verbose: false,
    };

    let raw: Vec<String> = std::env::args().collect();
    let mut iter = raw.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(None),
            "--verbose" | "-v" => args.verbose = true,
            "--capcodes" => {
                args.capcode_path = iter
                    .next()
                    .ok_or_else(|| "--capcodes needs a path".to_string())?
                    .into();
            }
            "--history" => {
                args.history_path = iter
                    .next()
                    .ok_or_else(|| "--history needs a path".to_string())?
                    .into();
            }
            "--decoder" => {
                args.decoder_cmd = Some(
                    iter.next()
                        .ok_or_else(|| "--decoder needs a command".to_string())?
                        .clone(),
                );
            }
            other => args.bind_addr = parse_bind_addr(other)?,
        }
    }

    Ok(Some(args))
}

/// Shutdown future for `run_until`: resolves when the watch flips
fn shutdown_signal(mut rx: watch::Receiver<bool>) -> impl std::future::Future<Output = ()> {
    async move {
        let _ = rx.changed().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("pagerfeed={}", default_level).parse()?)
                .add_directive(format!("feed_server={}", default_level).parse()?),
        )
        .init();

    // Capcode table: absence is a degraded start, not an abort
    let table = match CapcodeTable::load_csv(&args.capcode_path) {
        Ok(table) => table,
        Err(e) => {
            tracing::warn!(error = %e, "Capcode table unavailable, enrichment degraded");
            CapcodeTable::default()
        }
    };

    let store = Arc::new(MessageStore::new());
    let registry = Arc::new(SubscriberRegistry::new());

    // Seed history from the last snapshot, if any
    let persister = SnapshotPersister::new(&args.history_path, Arc::clone(&store));
    store.load_initial(persister.load().await).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Snapshot timer
    let persister_handle = {
        let shutdown = shutdown_signal(shutdown_rx.clone());
        tokio::spawn(async move { persister.run_until(shutdown).await })
    };

    // Feed server
    let server = FeedServer::new(
        ServerConfig::default().bind(args.bind_addr),
        Arc::clone(&store),
        Arc::clone(&registry),
    );
    let server_handle = {
        let shutdown = shutdown_signal(shutdown_rx.clone());
        tokio::spawn(async move {
            if let Err(e) = server.run_until(shutdown).await {
                tracing::error!(error = %e, "Feed server failed");
            }
        })
    };

    // Decoder + ingestion
    let mut decoder_config = DecoderConfig::default();
    if let Some(cmd) = args.decoder_cmd {
        decoder_config = decoder_config.command(cmd);
    }
    let pipeline = IngestPipeline::new(Arc::clone(&store), Arc::clone(&registry), Arc::new(table));
    let ingest_handle = {
        let shutdown = shutdown_signal(shutdown_rx.clone());
        tokio::spawn(async move {
            let (decoder, lines) = match DecoderProcess::spawn(&decoder_config) {
                Ok(spawned) => spawned,
                Err(e) => {
                    tracing::error!(error = %e, "Decoder failed to start, serving history only");
                    return;
                }
            };

            let result = pipeline.run_until(lines, shutdown).await;
            decoder.shutdown().await;

            // A dead feed is fatal for ingestion only; the server keeps
            // answering with the last known history.
            if let Err(e) = result {
                tracing::error!(error = %e, "Ingestion ended, serving last known history");
            }
        })
    };

    println!("Feed server listening on {}", args.bind_addr);
    println!("Connect with: nc {} to follow the live feed", args.bind_addr);

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");
    let _ = shutdown_tx.send(true);

    // Ingestion stops first (and reaps the decoder), the persister
    // writes its final snapshot, the listener stops accepting.
    let _ = ingest_handle.await;
    let _ = persister_handle.await;
    let _ = server_handle.await;

    Ok(())
}
