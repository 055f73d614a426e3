//! Signaling relay binary.
//!
//! Usage:
//! ```bash
//! signal-relay --bind 0.0.0.0:8080 --path /ws
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use signal_relay::{DefaultHandler, ServerConfig, SignalingServer};

#[derive(Parser, Debug)]
#[command(name = "signal-relay")]
#[command(about = "WebRTC signaling relay: routes offers, answers and ICE candidates by client identity")]
#[command(version)]
struct Args {
    /// Address to bind the relay
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// WebSocket endpoint path
    #[arg(long, default_value = "/ws")]
    path: String,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

    /// Outbound frames buffered per client before it is disconnected as too slow
    #[arg(long, default_value_t = 256)]
    queue_capacity: usize,

    /// Seconds without any inbound frame before a client is dropped (0 = never)
    #[arg(long, default_value_t = 120)]
    idle_timeout: u64,

    /// Seconds between server pings (0 = no pings)
    #[arg(long, default_value_t = 30)]
    ping_interval: u64,

    /// Largest accepted inbound message, in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    max_message_size: usize,
}

#[tokio::main]
async fn main() -> signal_relay::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = ServerConfig::with_addr(args.bind)
        .ws_path(args.path)
        .max_connections(args.max_connections)
        .outbound_queue_capacity(args.queue_capacity)
        .idle_timeout(Duration::from_secs(args.idle_timeout))
        .ping_interval(Duration::from_secs(args.ping_interval))
        .max_message_size(args.max_message_size);

    tracing::info!(bind = %config.bind_addr, path = %config.ws_path, "Starting signaling relay");

    let server = SignalingServer::new(config, DefaultHandler);
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
}
