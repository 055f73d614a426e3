//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Request path accepted for the WebSocket upgrade
    pub ws_path: String,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Frames buffered per connection; overflowing it evicts the connection
    pub outbound_queue_capacity: usize,

    /// The WebSocket upgrade must complete within this time
    pub handshake_timeout: Duration,

    /// Disconnect if nothing is received for this long (zero = never)
    pub idle_timeout: Duration,

    /// Interval between server pings (zero = no pings)
    pub ping_interval: Duration,

    /// Largest inbound message accepted, in bytes
    pub max_message_size: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Interval of the periodic stats log line (zero = disabled)
    pub stats_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            ws_path: "/ws".to_string(),
            max_connections: 0, // Unlimited
            outbound_queue_capacity: 256,
            handshake_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(120),
            ping_interval: Duration::from_secs(30),
            max_message_size: 1024 * 1024, // 1MB, SDP blobs are a few KB
            tcp_nodelay: true,
            stats_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the WebSocket path
    pub fn ws_path(mut self, path: impl Into<String>) -> Self {
        self.ws_path = path.into();
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-connection outbound queue capacity (at least 1)
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set maximum inbound message size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Disable the periodic stats log
    pub fn disable_stats_log(mut self) -> Self {
        self.stats_interval = Duration::ZERO;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.ws_path, "/ws");
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.outbound_queue_capacity, 256);
        assert!(config.tcp_nodelay);
        assert!(!config.idle_timeout.is_zero());
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.ws_path, "/ws");
    }

    #[test]
    fn test_builder_queue_capacity_floor() {
        let config = ServerConfig::default().outbound_queue_capacity(0);

        assert_eq!(config.outbound_queue_capacity, 1);
    }

    #[test]
    fn test_builder_disable_stats_log() {
        let config = ServerConfig::default().disable_stats_log();

        assert!(config.stats_interval.is_zero());
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .ws_path("/signal")
            .max_connections(50)
            .outbound_queue_capacity(16)
            .handshake_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(30))
            .ping_interval(Duration::ZERO)
            .max_message_size(4096);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.ws_path, "/signal");
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.outbound_queue_capacity, 16);
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert!(config.ping_interval.is_zero());
        assert_eq!(config.max_message_size, 4096);
    }
}
