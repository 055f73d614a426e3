//! Signaling wire protocol
//!
//! Messages are JSON objects of the form
//! `{"type": "...", "from": "...", "to": "...", "data": <any>}`.
//! An empty `to` means "everyone else". The relay reads `type`, `from` and
//! `to` and never looks inside `data`.

pub mod codec;
pub mod message;

pub use message::{ClientId, MessageType, SignalingMessage};
