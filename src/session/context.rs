//! Handler context
//!
//! Read-only connection information passed to
//! [`SignalingHandler`](crate::server::SignalingHandler) callbacks.

use std::net::SocketAddr;

use crate::protocol::ClientId;

/// Context passed to handler callbacks
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Unique connection ID
    pub conn_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Identity, once joined
    pub client_id: Option<ClientId>,
}

impl ConnectionContext {
    /// Create a context for a connection that has not joined
    pub fn new(conn_id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            conn_id,
            peer_addr,
            client_id: None,
        }
    }
}
