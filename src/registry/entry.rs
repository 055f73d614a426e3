//! Participant entries
//!
//! A participant is a joined connection plus the sending half of its
//! outbound queue. The queue itself belongs to the connection's writer task;
//! the registry only holds a clone of the sender.
//!
//! A recipient whose queue fills up is evicted rather than silently missing
//! frames: the first full-queue delivery marks the sender evicted and wakes
//! the owning connection, which then closes and leaves. Every later delivery
//! to that sender reports [`DeliveryError::Closed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};

use crate::protocol::ClientId;

use super::error::DeliveryError;

/// Outbound channel of one connection
///
/// Cheap to clone. Sending never waits: a full queue or a closed connection
/// is reported immediately as a [`DeliveryError`].
#[derive(Debug, Clone)]
pub struct PeerSender {
    conn_id: u64,
    tx: mpsc::Sender<Bytes>,
    eviction: Arc<Eviction>,
}

#[derive(Debug, Default)]
struct Eviction {
    evicted: AtomicBool,
    notify: Notify,
}

impl PeerSender {
    /// Create a bounded outbound queue for a connection
    ///
    /// Returns the sender and the receiver the connection's writer drains.
    pub fn channel(conn_id: u64, capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sender = Self {
            conn_id,
            tx,
            eviction: Arc::new(Eviction::default()),
        };
        (sender, rx)
    }

    /// Connection this sender belongs to
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    /// Queue an encoded frame without waiting
    ///
    /// A full queue evicts the recipient; see the module docs.
    pub fn try_deliver(&self, frame: Bytes) -> Result<(), DeliveryError> {
        if self.is_evicted() {
            return Err(DeliveryError::Closed);
        }

        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => {
                self.evict();
                DeliveryError::QueueFull
            }
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Whether this connection has been evicted for falling behind
    pub fn is_evicted(&self) -> bool {
        self.eviction.evicted.load(Ordering::Acquire)
    }

    /// Resolves once the connection has been evicted
    pub async fn evicted(&self) {
        if self.is_evicted() {
            return;
        }
        // A notification sent before we start waiting is kept as a permit
        self.eviction.notify.notified().await;
    }

    fn evict(&self) {
        if !self.eviction.evicted.swap(true, Ordering::AcqRel) {
            self.eviction.notify.notify_one();
        }
    }
}

/// A joined participant as stored in the registry
#[derive(Debug, Clone)]
pub struct ParticipantRecord {
    /// Assigned identity
    pub id: ClientId,

    /// Outbound channel
    pub sender: PeerSender,

    /// When the participant joined
    pub joined_at: Instant,
}

impl ParticipantRecord {
    pub(super) fn new(id: ClientId, sender: PeerSender) -> Self {
        Self {
            id,
            sender,
            joined_at: Instant::now(),
        }
    }
}
