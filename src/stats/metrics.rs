//! Statistics for the relay
//!
//! Monotonic counters updated from every connection task. Relaxed ordering
//! is enough: the numbers are only ever read for reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Relay-wide counters
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    joins: AtomicU64,
    leaves: AtomicU64,
    messages_received: AtomicU64,
    unicasts_delivered: AtomicU64,
    broadcasts: AtomicU64,
    broadcast_deliveries: AtomicU64,
    routing_misses: AtomicU64,
    delivery_failures: AtomicU64,
    evictions: AtomicU64,
    ignored_messages: AtomicU64,
    decode_errors: AtomicU64,
}

impl RelayStats {
    /// Create a zeroed set of counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            joins: AtomicU64::new(0),
            leaves: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            unicasts_delivered: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            broadcast_deliveries: AtomicU64::new(0),
            routing_misses: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            ignored_messages: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
        }
    }

    pub fn record_connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        // Saturating so a stray close can't wrap the gauge
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }

    pub fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_leave(&self) {
        self.leaves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unicast(&self) {
        self.unicasts_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one broadcast that reached `delivered` recipients
    pub fn record_broadcast(&self, delivered: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.broadcast_deliveries
            .fetch_add(delivered as u64, Ordering::Relaxed);
    }

    /// Target identity was empty or not joined
    pub fn record_routing_miss(&self) {
        self.routing_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A recipient fell behind and was disconnected
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            leaves: self.leaves.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            unicasts_delivered: self.unicasts_delivered.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            broadcast_deliveries: self.broadcast_deliveries.load(Ordering::Relaxed),
            routing_misses: self.routing_misses.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            ignored_messages: self.ignored_messages.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Time since the stats were created
    pub uptime: Duration,
    /// Connections ever accepted
    pub total_connections: u64,
    /// Connections currently open
    pub active_connections: u64,
    /// Successful joins
    pub joins: u64,
    /// Participants removed on disconnect
    pub leaves: u64,
    /// Decoded messages handed to the router
    pub messages_received: u64,
    /// Targeted messages queued for their recipient
    pub unicasts_delivered: u64,
    /// Untargeted negotiation messages fanned out
    pub broadcasts: u64,
    /// Individual recipients reached by broadcasts
    pub broadcast_deliveries: u64,
    /// Messages dropped because the target was missing or not joined
    pub routing_misses: u64,
    /// Frames a recipient could not accept (queue full or closing)
    pub delivery_failures: u64,
    /// Recipients disconnected for falling behind
    pub evictions: u64,
    /// Messages ignored by policy (not joined, unknown type, ...)
    pub ignored_messages: u64,
    /// Frames that were not valid signaling JSON
    pub decode_errors: u64,
}

impl StatsSnapshot {
    /// Messages received per second since start
    pub fn message_rate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.messages_received as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = RelayStats::new().snapshot();
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.joins, 0);
        assert_eq!(stats.messages_received, 0);
        assert_eq!(stats.routing_misses, 0);
    }

    #[test]
    fn test_connection_gauge() {
        let stats = RelayStats::new();

        stats.record_connection_opened();
        stats.record_connection_opened();
        stats.record_connection_closed();

        let snap = stats.snapshot();
        assert_eq!(snap.total_connections, 2);
        assert_eq!(snap.active_connections, 1);
    }

    #[test]
    fn test_connection_gauge_saturates() {
        let stats = RelayStats::new();
        stats.record_connection_closed();

        assert_eq!(stats.snapshot().active_connections, 0);
    }

    #[test]
    fn test_broadcast_counts_recipients() {
        let stats = RelayStats::new();

        stats.record_broadcast(3);
        stats.record_broadcast(0);

        let snap = stats.snapshot();
        assert_eq!(snap.broadcasts, 2);
        assert_eq!(snap.broadcast_deliveries, 3);
    }

    #[test]
    fn test_message_rate_zero_uptime() {
        let snap = StatsSnapshot::default();
        assert_eq!(snap.message_rate(), 0.0);
    }
}
