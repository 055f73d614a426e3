//! Message router implementation
//!
//! Applies the per-type delivery policy to one inbound message at a time.
//! Many connection tasks call into the same router concurrently; the only
//! shared mutable state behind it is the [`ClientRegistry`].

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::protocol::{codec, ClientId, MessageType, SignalingMessage};
use crate::registry::{ClientRegistry, DeliveryError, PeerSender};
use crate::session::Session;
use crate::stats::RelayStats;

use super::dispatch::{Dispatch, DropReason, IgnoreReason};

/// Routes signaling messages between joined participants
pub struct MessageRouter {
    registry: Arc<ClientRegistry>,
    stats: Arc<RelayStats>,

    /// Serializes membership changes with their `client-list` fan-out, so
    /// every participant sees lists in the order membership changed. Relayed
    /// messages resolve their recipients under it too, so a newcomer's
    /// `joined` reply is always the first frame it is sent. Held only while
    /// frames are queued, never across socket I/O.
    membership: Mutex<()>,
}

impl MessageRouter {
    /// Create a router over a shared registry
    pub fn new(registry: Arc<ClientRegistry>, stats: Arc<RelayStats>) -> Self {
        Self {
            registry,
            stats,
            membership: Mutex::new(()),
        }
    }

    /// The registry this router delivers through
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Relay statistics
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Route one inbound message from `session`
    ///
    /// `join` is the only type accepted before the session has joined.
    /// Nothing is processed once the session has left.
    pub async fn dispatch(&self, session: &mut Session, message: SignalingMessage) -> Dispatch {
        if session.is_closed() {
            return self.ignore(session, &message, IgnoreReason::SessionClosed);
        }
        self.stats.record_received();

        if message.kind == MessageType::Join {
            return self.handle_join(session, &message).await;
        }
        if !session.is_joined() {
            return self.ignore(session, &message, IgnoreReason::NotJoined);
        }

        let kind = &message.kind;
        if kind.is_server_originated() {
            let reason = IgnoreReason::ServerOnlyType(kind.clone());
            return self.ignore(session, &message, reason);
        }
        if let MessageType::Unknown(raw) = kind {
            let reason = IgnoreReason::UnknownType(raw.clone());
            return self.ignore(session, &message, reason);
        }

        if !message.is_broadcast() {
            return self.unicast(message).await;
        }
        if message.kind.is_negotiation() {
            return self.broadcast_from(session, message).await;
        }

        // connection-request and connection-response need a recipient
        self.stats.record_routing_miss();
        tracing::debug!(
            conn_id = session.conn_id(),
            kind = %message.kind,
            from = %message.from,
            "Dropping untargeted message"
        );
        Dispatch::Dropped(DropReason::MissingRecipient)
    }

    /// Tear down a session
    ///
    /// Moves it to `Left`; if it had joined, removes it from the registry and
    /// announces the new participant list. Returns the identity that left.
    /// Safe to call more than once.
    pub async fn disconnect(&self, session: &mut Session) -> Option<ClientId> {
        let id = session.close()?;

        let _announce = self.membership.lock().await;
        if self.registry.leave(&id).await {
            self.stats.record_leave();
            tracing::info!(
                client_id = %id,
                conn_id = session.conn_id(),
                joined_for_ms = session.joined_for().map(|d| d.as_millis() as u64).unwrap_or(0),
                "Client left"
            );
            self.announce_client_list().await;
        }

        Some(id)
    }

    async fn handle_join(&self, session: &mut Session, message: &SignalingMessage) -> Dispatch {
        if session.is_joined() {
            return self.ignore(session, message, IgnoreReason::AlreadyJoined);
        }

        let _announce = self.membership.lock().await;

        let requested = &message.from;
        let id = self.registry.join(requested, session.sender().clone()).await;
        session.bind(id.clone());
        self.stats.record_join();

        if !requested.is_empty() && *requested != id {
            tracing::info!(
                requested = %requested,
                assigned = %id,
                "Requested identity unavailable, assigned a fresh one"
            );
        }
        tracing::info!(
            client_id = %id,
            conn_id = session.conn_id(),
            peer = %session.peer_addr(),
            "Client joined"
        );

        let reply = SignalingMessage::joined(&id);
        if let Some(frame) = self.encode(&reply) {
            self.deliver(&id, session.sender(), frame);
        }
        self.announce_client_list().await;

        Dispatch::Joined(id)
    }

    async fn unicast(&self, message: SignalingMessage) -> Dispatch {
        let recipient = {
            let _membership = self.membership.lock().await;
            self.registry.lookup(&message.to).await
        };
        let Some(sender) = recipient else {
            self.stats.record_routing_miss();
            tracing::debug!(
                kind = %message.kind,
                from = %message.from,
                to = %message.to,
                "Recipient not found"
            );
            return Dispatch::Dropped(DropReason::UnknownRecipient(message.to));
        };

        let Some(frame) = self.encode(&message) else {
            return Dispatch::Dropped(DropReason::Unencodable);
        };

        match self.deliver(&message.to, &sender, frame) {
            Ok(()) => {
                self.stats.record_unicast();
                tracing::debug!(
                    kind = %message.kind,
                    from = %message.from,
                    to = %message.to,
                    "Forwarded"
                );
                Dispatch::Delivered(message.to)
            }
            Err(error) => Dispatch::Dropped(DropReason::DeliveryFailed {
                recipient: message.to,
                error,
            }),
        }
    }

    async fn broadcast_from(&self, session: &Session, message: SignalingMessage) -> Dispatch {
        let Some(frame) = self.encode(&message) else {
            return Dispatch::Dropped(DropReason::Unencodable);
        };

        let members = {
            let _membership = self.membership.lock().await;
            self.registry.snapshot_all().await
        };
        let (delivered, failed) = self.fan_out(&members, session.client_id(), &frame);
        self.stats.record_broadcast(delivered);

        tracing::debug!(
            kind = %message.kind,
            from = %message.from,
            delivered = delivered,
            failed = failed,
            "Broadcast to all others"
        );

        Dispatch::Broadcast { delivered, failed }
    }

    /// Send the current participant list to every participant.
    /// Caller holds the membership lock.
    async fn announce_client_list(&self) {
        let members = self.registry.snapshot_all().await;
        let ids: Vec<ClientId> = members.iter().map(|(id, _)| id.clone()).collect();

        let Some(frame) = self.encode(&SignalingMessage::client_list(&ids)) else {
            return;
        };
        let (delivered, failed) = self.fan_out(&members, None, &frame);

        tracing::debug!(
            clients = ?ids,
            delivered = delivered,
            failed = failed,
            "Broadcast client list"
        );
    }

    /// Queue `frame` for every member except `exclude`. A failure for one
    /// recipient never stops the others.
    fn fan_out(
        &self,
        members: &[(ClientId, PeerSender)],
        exclude: Option<&ClientId>,
        frame: &Bytes,
    ) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;

        for (id, sender) in members {
            if Some(id) == exclude {
                continue;
            }
            match self.deliver(id, sender, frame.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => failed += 1,
            }
        }

        (delivered, failed)
    }

    fn deliver(&self, id: &ClientId, sender: &PeerSender, frame: Bytes) -> Result<(), DeliveryError> {
        let result = sender.try_deliver(frame);

        match &result {
            Ok(()) => {}
            Err(DeliveryError::Closed) => {
                // Recipient is on its way out; its own task removes it
                self.stats.record_delivery_failure();
                tracing::debug!(client_id = %id, "Recipient closing, frame dropped");
            }
            Err(e @ DeliveryError::QueueFull) => {
                // The sender is now evicted; its connection closes and leaves
                self.stats.record_delivery_failure();
                self.stats.record_eviction();
                tracing::warn!(
                    client_id = %id,
                    conn_id = sender.conn_id(),
                    error = %e,
                    "Evicting slow recipient"
                );
            }
        }

        result
    }

    fn encode(&self, message: &SignalingMessage) -> Option<Bytes> {
        match codec::encode(message) {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!(kind = %message.kind, error = %e, "Failed to encode message");
                None
            }
        }
    }

    fn ignore(&self, session: &Session, message: &SignalingMessage, reason: IgnoreReason) -> Dispatch {
        self.stats.record_ignored();
        tracing::debug!(
            conn_id = session.conn_id(),
            kind = %message.kind,
            reason = %reason,
            "Ignoring message"
        );
        Dispatch::Ignored(reason)
    }
}
