//! Client registry
//!
//! Tracks which connections have joined and under which identity, and holds
//! the outbound channel for each of them.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ClientRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ RwLock<Membership {          │
//!                  │   records: HashMap<Id, Rec>, │
//!                  │   order:   Vec<Id>,          │
//!                  │ }>                           │
//!                  └──────────────┬───────────────┘
//!                                 │ snapshot_all()
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!   PeerSender (A)          PeerSender (B)          PeerSender (C)
//!   try_deliver()           try_deliver()           try_deliver()
//!         │                       │                       │
//!   writer task ──► WS      writer task ──► WS      writer task ──► WS
//! ```
//!
//! Sends happen on the snapshot, after the lock is released. A participant
//! that leaves mid-broadcast just reports [`DeliveryError::Closed`].

pub mod config;
pub mod entry;
pub mod error;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{ParticipantRecord, PeerSender};
pub use error::DeliveryError;
pub use store::ClientRegistry;
