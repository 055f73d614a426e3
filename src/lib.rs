//! WebRTC signaling relay
//!
//! Clients connect over WebSocket, join under an identity, and exchange
//! negotiation messages (SDP offers and answers, ICE candidates, connection
//! requests) addressed by identity. The relay never looks at the payloads.
//!
//! # Architecture
//!
//! ```text
//!   TcpListener ──► SignalingServer ──spawn──► Connection (one per socket)
//!                                                 │ reader: JSON ─► Dispatch
//!                                                 │ writer: PeerSender queue ─► WS
//!                                                 ▼
//!                                           MessageRouter ──► ClientRegistry
//!                                                 │             (shared, Arc)
//!                                                 └──► RelayStats
//! ```
//!
//! # Example
//!
//! ```no_run
//! use signal_relay::{DefaultHandler, ServerConfig, SignalingServer};
//!
//! # async fn example() -> signal_relay::Result<()> {
//! let config = ServerConfig::with_addr("127.0.0.1:8080".parse().unwrap());
//! let server = SignalingServer::new(config, DefaultHandler);
//!
//! server
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! # }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{ClientId, MessageType, SignalingMessage};
pub use registry::{ClientRegistry, PeerSender, RegistryConfig};
pub use router::{Dispatch, MessageRouter};
pub use server::{DefaultHandler, ServerConfig, SignalingHandler, SignalingServer};
pub use session::{ConnectionContext, Session, SessionPhase};
pub use stats::{RelayStats, StatsSnapshot};
