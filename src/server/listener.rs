//! Signaling server listener
//!
//! Handles the TCP accept loop and spawns one connection task per socket.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::protocol::ClientId;
use crate::registry::{ClientRegistry, RegistryConfig};
use crate::router::MessageRouter;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::server::handler::SignalingHandler;
use crate::session::ConnectionContext;
use crate::stats::RelayStats;

/// First pause after a failed accept
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);

/// Longest pause between accept retries
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Signaling relay server
pub struct SignalingServer<H: SignalingHandler> {
    config: ServerConfig,
    handler: Arc<H>,
    registry: Arc<ClientRegistry>,
    stats: Arc<RelayStats>,
    router: Arc<MessageRouter>,
    next_conn_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl<H: SignalingHandler> SignalingServer<H> {
    /// Create a new server with the given configuration and handler
    pub fn new(config: ServerConfig, handler: H) -> Self {
        Self::with_registry_config(config, handler, RegistryConfig::default())
    }

    /// Create a new server with custom registry configuration
    pub fn with_registry_config(
        config: ServerConfig,
        handler: H,
        registry_config: RegistryConfig,
    ) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let registry = Arc::new(ClientRegistry::with_config(registry_config));
        let stats = Arc::new(RelayStats::new());
        let router = Arc::new(MessageRouter::new(
            Arc::clone(&registry),
            Arc::clone(&stats),
        ));

        Self {
            config,
            handler: Arc::new(handler),
            registry,
            stats,
            router,
            next_conn_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Get a reference to the relay statistics
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Get a reference to the message router
    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Identities currently joined, in join order
    pub async fn clients(&self) -> Vec<ClientId> {
        self.registry.snapshot_ids().await
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails to bind.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            path = %self.config.ws_path,
            "Signaling server listening"
        );

        let stats_handle = self.spawn_stats_task();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        };

        if let Some(handle) = stats_handle {
            handle.abort();
        }

        result
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        let mut backoff = None;
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    backoff = None;
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    // EMFILE and friends persist across retries
                    let delay = next_backoff(backoff);
                    backoff = Some(delay);
                    tracing::error!(
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "Failed to accept connection"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
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

        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(conn_id = conn_id, peer = %peer_addr, "New connection");

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let config = self.config.clone();
        let handler = Arc::clone(&self.handler);
        let router = Arc::clone(&self.router);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            // Held until the connection task ends
            let _permit = permit;

            if !handler
                .on_connection(&ConnectionContext::new(conn_id, peer_addr))
                .await
            {
                tracing::debug!(conn_id = conn_id, "Connection refused by handler");
                return;
            }

            stats.record_connection_opened();
            let connection = Connection::new(conn_id, peer_addr, config, handler, router);
            if let Err(e) = connection.run(socket).await {
                tracing::debug!(conn_id = conn_id, error = %e, "Connection error");
            }
            stats.record_connection_closed();

            tracing::debug!(conn_id = conn_id, "Connection closed");
        });
    }

    fn spawn_stats_task(&self) -> Option<JoinHandle<()>> {
        if self.config.stats_interval.is_zero() {
            return None;
        }

        let stats = Arc::clone(&self.stats);
        let registry = Arc::clone(&self.registry);
        let interval = self.config.stats_interval;

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let clients = registry.len().await;
                let snapshot = stats.snapshot();
                tracing::info!(
                    clients = clients,
                    active_connections = snapshot.active_connections,
                    messages = snapshot.messages_received,
                    routing_misses = snapshot.routing_misses,
                    delivery_failures = snapshot.delivery_failures,
                    evictions = snapshot.evictions,
                    message_rate = snapshot.message_rate(),
                    "Relay stats"
                );
            }
        }))
    }
}

/// Pause before the next accept retry, doubling up to a ceiling
fn next_backoff(previous: Option<Duration>) -> Duration {
    match previous {
        None => ACCEPT_BACKOFF_MIN,
        Some(delay) => (delay * 2).min(ACCEPT_BACKOFF_MAX),
    }
}
