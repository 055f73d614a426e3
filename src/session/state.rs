//! Session state machine
//!
//! Tracks one connection from accept to disconnect:
//! `Unjoined -> Joined -> Left`. `Left` is terminal.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::protocol::ClientId;
use crate::registry::PeerSender;

use super::context::ConnectionContext;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connected, no identity yet
    Unjoined,
    /// Joined under an assigned identity
    Joined,
    /// Disconnected; nothing more is processed
    Left,
}

/// Per-connection state
#[derive(Debug)]
pub struct Session {
    /// Remote peer address
    peer_addr: SocketAddr,

    /// Current phase
    phase: SessionPhase,

    /// Identity bound on join; kept after leaving for logging
    client_id: Option<ClientId>,

    /// This connection's outbound channel
    sender: PeerSender,

    /// Connection start time
    connected_at: Instant,

    /// Time of the successful join
    joined_at: Option<Instant>,
}

impl Session {
    /// Create a new unjoined session
    pub fn new(sender: PeerSender, peer_addr: SocketAddr) -> Self {
        Self {
            peer_addr,
            phase: SessionPhase::Unjoined,
            client_id: None,
            sender,
            connected_at: Instant::now(),
            joined_at: None,
        }
    }

    /// Connection ID
    pub fn conn_id(&self) -> u64 {
        self.sender.conn_id()
    }

    /// Remote peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Current phase
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Bound identity, if the session ever joined
    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    /// This connection's outbound channel
    pub fn sender(&self) -> &PeerSender {
        &self.sender
    }

    pub fn is_joined(&self) -> bool {
        self.phase == SessionPhase::Joined
    }

    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Left
    }

    /// Time since the connection was accepted
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Time since the join, if joined
    pub fn joined_for(&self) -> Option<Duration> {
        self.joined_at.map(|t| t.elapsed())
    }

    /// Snapshot for handler callbacks
    pub fn context(&self) -> ConnectionContext {
        ConnectionContext {
            conn_id: self.conn_id(),
            peer_addr: self.peer_addr,
            client_id: self.client_id.clone(),
        }
    }

    /// Bind an identity. Only valid from `Unjoined`.
    pub(crate) fn bind(&mut self, id: ClientId) -> bool {
        if self.phase != SessionPhase::Unjoined {
            return false;
        }
        self.client_id = Some(id);
        self.joined_at = Some(Instant::now());
        self.phase = SessionPhase::Joined;
        true
    }

    /// Move to `Left`
    ///
    /// Returns the identity to remove from the registry if the session was
    /// joined. Later calls return `None`.
    pub(crate) fn close(&mut self) -> Option<ClientId> {
        let was_joined = self.phase == SessionPhase::Joined;
        self.phase = SessionPhase::Left;
        if was_joined {
            self.client_id.clone()
        } else {
            None
        }
    }
}
