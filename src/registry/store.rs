//! Client registry implementation
//!
//! The single source of truth for who is currently joined. Every operation
//! takes the internal lock once, touches only memory, and releases it before
//! returning. Callers that need to send to several participants take a
//! snapshot and send after the lock is gone.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::protocol::ClientId;

use super::config::RegistryConfig;
use super::entry::{ParticipantRecord, PeerSender};

/// Membership state guarded by the registry lock
///
/// `records` answers lookups, `order` keeps join order for snapshots.
/// Both always hold the same set of identities.
#[derive(Default)]
struct Membership {
    records: HashMap<ClientId, ParticipantRecord>,
    order: Vec<ClientId>,
    next_generated: u64,
}

impl Membership {
    fn is_available(&self, requested: &ClientId, max_len: usize) -> bool {
        !requested.is_empty()
            && requested.len() <= max_len
            && !self.records.contains_key(requested)
    }

    fn generate_id(&mut self, prefix: &str) -> ClientId {
        loop {
            self.next_generated += 1;
            let candidate = ClientId::new(format!("{}{}", prefix, self.next_generated));
            if !self.records.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

/// Registry of joined participants
///
/// Thread-safe via `RwLock`; share it behind an `Arc`. Lookups and snapshots
/// take the read lock, join and leave take the write lock.
pub struct ClientRegistry {
    inner: RwLock<Membership>,

    /// Configuration
    config: RegistryConfig,
}

impl ClientRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: RwLock::new(Membership::default()),
            config,
        }
    }

    /// Add a participant
    ///
    /// Uses `requested` if it is non-empty, not too long and not taken;
    /// otherwise generates a fresh identity. The participant is appended to
    /// the join order. Returns the identity actually assigned.
    pub async fn join(&self, requested: &ClientId, sender: PeerSender) -> ClientId {
        let mut members = self.inner.write().await;

        let id = if members.is_available(requested, self.config.max_id_len) {
            requested.clone()
        } else {
            members.generate_id(&self.config.id_prefix)
        };

        let conn_id = sender.conn_id();
        members.order.push(id.clone());
        members
            .records
            .insert(id.clone(), ParticipantRecord::new(id.clone(), sender));

        tracing::debug!(
            client_id = %id,
            conn_id = conn_id,
            members = members.order.len(),
            "Participant added"
        );

        id
    }

    /// Remove a participant
    ///
    /// Returns whether anything was removed. Removing an unknown identity is
    /// a no-op.
    pub async fn leave(&self, id: &ClientId) -> bool {
        let mut members = self.inner.write().await;

        let Some(record) = members.records.remove(id) else {
            return false;
        };
        members.order.retain(|member| member != id);

        tracing::debug!(
            client_id = %id,
            joined_for_ms = record.joined_at.elapsed().as_millis() as u64,
            members = members.order.len(),
            "Participant removed"
        );

        true
    }

    /// Outbound channel of a joined participant
    pub async fn lookup(&self, id: &ClientId) -> Option<PeerSender> {
        let members = self.inner.read().await;
        members.records.get(id).map(|record| record.sender.clone())
    }

    /// Point-in-time copy of all participants, in join order
    pub async fn snapshot_all(&self) -> Vec<(ClientId, PeerSender)> {
        let members = self.inner.read().await;
        members
            .order
            .iter()
            .filter_map(|id| {
                members
                    .records
                    .get(id)
                    .map(|record| (id.clone(), record.sender.clone()))
            })
            .collect()
    }

    /// Point-in-time copy of all identities, in join order
    pub async fn snapshot_ids(&self) -> Vec<ClientId> {
        self.inner.read().await.order.clone()
    }

    /// Whether an identity is currently joined
    pub async fn contains(&self, id: &ClientId) -> bool {
        self.inner.read().await.records.contains_key(id)
    }

    /// Number of joined participants
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Whether nobody is joined
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;

    fn sender(conn_id: u64) -> PeerSender {
        // Receiver is dropped; these tests only look at membership
        PeerSender::channel(conn_id, 8).0
    }

    fn ids(names: &[&str]) -> Vec<ClientId> {
        names.iter().map(|name| ClientId::new(*name)).collect()
    }

    #[tokio::test]
    async fn test_join_with_requested_identity() {
        let registry = ClientRegistry::new();

        let id = registry.join(&ClientId::new("alice"), sender(1)).await;

        assert_eq!(id, ClientId::new("alice"));
        assert!(registry.contains(&id).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_identity_is_generated() {
        let registry = ClientRegistry::new();

        let first = registry.join(&ClientId::empty(), sender(1)).await;
        let second = registry.join(&ClientId::empty(), sender(2)).await;

        assert_eq!(first, ClientId::new("client_1"));
        assert_eq!(second, ClientId::new("client_2"));
    }

    #[tokio::test]
    async fn test_taken_identity_gets_fresh_one() {
        let registry = ClientRegistry::new();

        let first = registry.join(&ClientId::new("alice"), sender(1)).await;
        let second = registry.join(&ClientId::new("alice"), sender(2)).await;

        assert_eq!(first, ClientId::new("alice"));
        assert_ne!(second, first);
        assert_eq!(registry.len().await, 2);

        // The original holder keeps its channel
        let looked_up = registry.lookup(&first).await.unwrap();
        assert_eq!(looked_up.conn_id(), 1);
    }

    #[tokio::test]
    async fn test_generated_identity_skips_requested_names() {
        let registry = ClientRegistry::new();

        registry.join(&ClientId::new("client_1"), sender(1)).await;
        let generated = registry.join(&ClientId::empty(), sender(2)).await;

        assert_eq!(generated, ClientId::new("client_2"));
    }

    #[tokio::test]
    async fn test_overlong_identity_is_replaced() {
        let config = RegistryConfig::default().max_id_len(4).id_prefix("p");
        let registry = ClientRegistry::with_config(config);

        let id = registry.join(&ClientId::new("toolong"), sender(1)).await;

        assert_eq!(id, ClientId::new("p1"));
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let registry = ClientRegistry::new();
        let id = registry.join(&ClientId::new("alice"), sender(1)).await;

        assert!(registry.leave(&id).await);
        assert!(!registry.leave(&id).await);
        assert!(!registry.leave(&ClientId::new("never-joined")).await);

        assert!(registry.is_empty().await);
        assert!(registry.lookup(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_order_survives_removal() {
        let registry = ClientRegistry::new();
        for (conn_id, name) in ["a", "b", "c", "d"].iter().enumerate() {
            registry.join(&ClientId::new(*name), sender(conn_id as u64)).await;
        }

        registry.leave(&ClientId::new("b")).await;
        assert_eq!(registry.snapshot_ids().await, ids(&["a", "c", "d"]));

        registry.join(&ClientId::new("b"), sender(9)).await;
        assert_eq!(registry.snapshot_ids().await, ids(&["a", "c", "d", "b"]));

        let all = registry.snapshot_all().await;
        let order: Vec<ClientId> = all.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(order, ids(&["a", "c", "d", "b"]));
        assert_eq!(all[3].1.conn_id(), 9);
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_later_changes() {
        let registry = ClientRegistry::new();
        let (alice_tx, mut alice_rx) = PeerSender::channel(1, 8);
        registry.join(&ClientId::new("alice"), alice_tx).await;
        registry.join(&ClientId::new("bob"), sender(2)).await;

        let snapshot = registry.snapshot_all().await;

        registry.leave(&ClientId::new("bob")).await;
        registry.join(&ClientId::new("carol"), sender(3)).await;

        let names: Vec<&str> = snapshot.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);

        // Channels in the snapshot still work
        snapshot[0].1.try_deliver(Bytes::from_static(b"hi")).unwrap();
        assert_eq!(alice_rx.try_recv().unwrap(), Bytes::from_static(b"hi"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_are_unique() {
        let registry = Arc::new(ClientRegistry::new());
        let mut handles = Vec::new();

        for conn_id in 0..64u64 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                // Half ask for the same name, half ask for nothing
                let requested = if conn_id % 2 == 0 {
                    ClientId::new("popular")
                } else {
                    ClientId::empty()
                };
                registry.join(&requested, sender(conn_id)).await
            }));
        }

        let mut assigned = HashSet::new();
        for handle in handles {
            assert!(assigned.insert(handle.await.unwrap()));
        }

        assert_eq!(assigned.len(), 64);
        assert_eq!(registry.len().await, 64);
        assert_eq!(registry.snapshot_ids().await.len(), 64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_join_leave_keeps_order_consistent() {
        let registry = Arc::new(ClientRegistry::new());
        let mut handles = Vec::new();

        for conn_id in 0..32u64 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let id = registry
                    .join(&ClientId::new(format!("peer{}", conn_id)), sender(conn_id))
                    .await;
                if conn_id % 3 == 0 {
                    registry.leave(&id).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let order = registry.snapshot_ids().await;
        let all = registry.snapshot_all().await;
        assert_eq!(order.len(), registry.len().await);
        assert_eq!(all.len(), order.len());
        for id in &order {
            assert!(registry.contains(id).await);
        }
    }
}
