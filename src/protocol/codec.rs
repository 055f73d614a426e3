//! JSON framing for signaling messages
//!
//! Outbound messages are encoded once into [`Bytes`]; fan-out to many
//! recipients clones the reference-counted buffer, not the JSON.

use bytes::Bytes;

use crate::error::Result;

use super::message::SignalingMessage;

/// Encode a message into a JSON frame
pub fn encode(message: &SignalingMessage) -> Result<Bytes> {
    let json = serde_json::to_vec(message)?;
    Ok(Bytes::from(json))
}

/// Decode a JSON frame into a message
pub fn decode(frame: &[u8]) -> Result<SignalingMessage> {
    Ok(serde_json::from_slice(frame)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::error::Error;
    use crate::protocol::message::{ClientId, MessageType};

    #[test]
    fn test_decode_offer() {
        let frame = br#"{"type":"offer","from":"alice","to":"bob","data":"v=0\r\n"}"#;
        let msg = assert_ok!(decode(frame));

        assert_eq!(msg.kind, MessageType::Offer);
        assert_eq!(msg.from, ClientId::new("alice"));
        assert_eq!(msg.to, ClientId::new("bob"));
        assert_eq!(msg.data, json!("v=0\r\n"));
    }

    #[test]
    fn test_payload_passes_through_untouched() {
        let data = json!({
            "candidate": "candidate:1 1 UDP 2122252543 192.168.1.2 50000 typ host",
            "sdpMid": "0",
            "sdpMLineIndex": 0,
            "nested": { "list": [1, 2.5, null, true] }
        });
        let original = SignalingMessage::new(MessageType::IceCandidate, "a", "b", data);

        let frame = assert_ok!(encode(&original));
        let decoded = assert_ok!(decode(&frame));

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_unknown_type_decodes() {
        let msg = assert_ok!(decode(br#"{"type":"bye","from":"a"}"#));
        assert_eq!(msg.kind, MessageType::Unknown("bye".into()));
    }

    #[test]
    fn test_encode_uses_wire_names() {
        let msg = SignalingMessage::new(MessageType::ConnectionRequest, "a", "b", json!(null));
        let frame = assert_ok!(encode(&msg));
        let value: serde_json::Value = assert_ok!(serde_json::from_slice(&frame));

        assert_eq!(value["type"], "connection-request");
        assert_eq!(value["from"], "a");
        assert_eq!(value["to"], "b");
    }

    #[test]
    fn test_null_recipient_is_broadcast() {
        let msg = assert_ok!(decode(
            br#"{"type":"ice-candidate","from":"A","to":null,"data":{}}"#
        ));

        assert_eq!(msg.kind, MessageType::IceCandidate);
        assert_eq!(msg.from, ClientId::new("A"));
        assert!(msg.is_broadcast());
    }

    #[test]
    fn test_null_sender_decodes_as_anonymous_join() {
        let msg = assert_ok!(decode(br#"{"type":"join","from":null}"#));

        assert_eq!(msg.kind, MessageType::Join);
        assert!(msg.from.is_empty());
    }

    #[test]
    fn test_non_string_address_is_rejected() {
        assert_err!(decode(br#"{"type":"offer","from":"a","to":42}"#));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = assert_err!(decode(b"not json"));
        assert!(matches!(err, Error::Codec(_)));

        // `type` is required
        assert_err!(decode(br#"{"from":"a"}"#));
    }
}
