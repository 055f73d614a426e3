//! Per-connection session state

pub mod context;
pub mod state;

pub use context::ConnectionContext;
pub use state::{Session, SessionPhase};
