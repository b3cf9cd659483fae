//! Live feed TCP server
//!
//! Accepts viewer connections and serves each one the current history
//! followed by the live broadcast stream, newline-delimited JSON
//! throughout. Subscribers send nothing after connecting; inbound data
//! is only used to detect disconnects.

pub mod config;
pub mod listener;

pub use config::ServerConfig;
pub use listener::FeedServer;
