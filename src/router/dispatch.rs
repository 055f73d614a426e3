//! Dispatch outcomes
//!
//! What the router did with one inbound message. Senders are never told
//! about drops; these values exist for hooks, stats and tests.

use std::fmt;

use crate::protocol::{ClientId, MessageType};
use crate::registry::DeliveryError;

/// Result of routing one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The connection joined under this identity
    Joined(ClientId),
    /// Forwarded to exactly one recipient
    Delivered(ClientId),
    /// Fanned out to everyone else
    Broadcast {
        /// Recipients whose queue accepted the frame
        delivered: usize,
        /// Recipients that could not take it
        failed: usize,
    },
    /// Targeted message that reached nobody
    Dropped(DropReason),
    /// Not routed by policy
    Ignored(IgnoreReason),
}

/// Why a targeted message was not delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// `to` names nobody currently joined
    UnknownRecipient(ClientId),
    /// `to` is empty on a type that must be targeted
    MissingRecipient,
    /// The recipient is joined but its queue refused the frame
    DeliveryFailed {
        /// Intended recipient
        recipient: ClientId,
        /// What went wrong
        error: DeliveryError,
    },
    /// The message could not be serialized
    Unencodable,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::UnknownRecipient(id) => write!(f, "recipient {} not joined", id),
            DropReason::MissingRecipient => write!(f, "no recipient given"),
            DropReason::DeliveryFailed { recipient, error } => {
                write!(f, "delivery to {} failed: {}", recipient, error)
            }
            DropReason::Unencodable => write!(f, "message could not be encoded"),
        }
    }
}

/// Why a message was ignored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Sender has not joined yet
    NotJoined,
    /// Sender sent `join` twice
    AlreadyJoined,
    /// Session is already in `Left`
    SessionClosed,
    /// Client sent a type only the server may emit
    ServerOnlyType(MessageType),
    /// Unrecognized type
    UnknownType(String),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::NotJoined => write!(f, "sender not joined"),
            IgnoreReason::AlreadyJoined => write!(f, "sender already joined"),
            IgnoreReason::SessionClosed => write!(f, "session closed"),
            IgnoreReason::ServerOnlyType(kind) => write!(f, "{} is server-originated", kind),
            IgnoreReason::UnknownType(raw) => write!(f, "unknown type {:?}", raw),
        }
    }
}
