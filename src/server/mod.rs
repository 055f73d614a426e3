//! Signaling server
//!
//! TCP listener, WebSocket upgrade and per-connection tasks around the
//! [`MessageRouter`](crate::router::MessageRouter).

pub mod config;
pub mod connection;
pub mod handler;
pub mod listener;

pub use config::ServerConfig;
pub use handler::{DefaultHandler, SignalingHandler};
pub use listener::SignalingServer;
