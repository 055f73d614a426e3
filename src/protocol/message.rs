//! Signaling message types

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

/// Identity of a participant
///
/// Opaque to the relay. The empty identity means "not joined yet" in `from`
/// and "broadcast" in `to`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Create an identity from any string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The empty identity
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Borrow the identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty identity
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the identity in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Message type tag
///
/// Unrecognized tags parse into [`MessageType::Unknown`] and keep their raw
/// text so they can be logged; the router ignores them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// Client asks to become a participant
    Join,
    /// Server tells a client which identity it was assigned
    Joined,
    /// Application-level request to open a peer connection
    ConnectionRequest,
    /// Reply to a connection request
    ConnectionResponse,
    /// SDP offer
    Offer,
    /// SDP answer
    Answer,
    /// ICE candidate
    IceCandidate,
    /// Server announcement of the current participant list
    ClientList,
    /// Anything else
    Unknown(String),
}

impl MessageType {
    /// Wire name of this type
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Join => "join",
            MessageType::Joined => "joined",
            MessageType::ConnectionRequest => "connection-request",
            MessageType::ConnectionResponse => "connection-response",
            MessageType::Offer => "offer",
            MessageType::Answer => "answer",
            MessageType::IceCandidate => "ice-candidate",
            MessageType::ClientList => "client-list",
            MessageType::Unknown(raw) => raw,
        }
    }

    /// Types only the server is allowed to emit
    pub fn is_server_originated(&self) -> bool {
        matches!(self, MessageType::Joined | MessageType::ClientList)
    }

    /// SDP and ICE exchange types, which may be broadcast
    pub fn is_negotiation(&self) -> bool {
        matches!(
            self,
            MessageType::Offer | MessageType::Answer | MessageType::IceCandidate
        )
    }
}

impl From<String> for MessageType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "join" => MessageType::Join,
            "joined" => MessageType::Joined,
            "connection-request" => MessageType::ConnectionRequest,
            "connection-response" => MessageType::ConnectionResponse,
            "offer" => MessageType::Offer,
            "answer" => MessageType::Answer,
            "ice-candidate" => MessageType::IceCandidate,
            "client-list" => MessageType::ClientList,
            _ => MessageType::Unknown(raw),
        }
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Unknown(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of exchange between clients and the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalingMessage {
    /// Message type
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Sender identity (may be empty before join)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub from: ClientId,

    /// Recipient identity, empty for broadcast
    #[serde(default, deserialize_with = "null_as_empty")]
    pub to: ClientId,

    /// Opaque payload
    #[serde(default)]
    pub data: Value,
}

impl SignalingMessage {
    /// Create a message
    pub fn new(kind: MessageType, from: impl Into<ClientId>, to: impl Into<ClientId>, data: Value) -> Self {
        Self {
            kind,
            from: from.into(),
            to: to.into(),
            data,
        }
    }

    /// A join request for the given identity (empty lets the server pick)
    pub fn join(requested: impl Into<ClientId>) -> Self {
        Self::new(MessageType::Join, requested, ClientId::empty(), Value::Null)
    }

    /// The server's reply to a successful join
    pub fn joined(id: &ClientId) -> Self {
        Self::new(
            MessageType::Joined,
            ClientId::empty(),
            id.clone(),
            json!({ "id": id }),
        )
    }

    /// The participant list announcement
    pub fn client_list(ids: &[ClientId]) -> Self {
        Self::new(
            MessageType::ClientList,
            ClientId::empty(),
            ClientId::empty(),
            json!({ "clients": ids }),
        )
    }

    /// Whether the message is addressed to everyone else
    pub fn is_broadcast(&self) -> bool {
        self.to.is_empty()
    }
}

/// An explicit `null` address reads the same as an absent one
fn null_as_empty<'de, D>(deserializer: D) -> Result<ClientId, D::Error>
where
    D: Deserializer<'de>,
{
    let id = Option::<String>::deserialize(deserializer)?;
    Ok(id.map(ClientId::from).unwrap_or_default())
}
