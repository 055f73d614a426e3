//! Registry error types
//!
//! Per-recipient delivery failures. These never abort a fan-out; the router
//! counts and logs them and moves on to the next recipient.

/// Error returned when a frame cannot be queued for a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The participant's outbound queue is full. The participant is evicted.
    QueueFull,
    /// The participant's connection is shutting down
    Closed,
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::QueueFull => write!(f, "Outbound queue full"),
            DeliveryError::Closed => write!(f, "Connection closed"),
        }
    }
}

impl std::error::Error for DeliveryError {}
