//! Server callbacks
//!
//! Implement [`SignalingHandler`] to observe connections and membership.
//! Every method has a default, so implementors only override what they use.
//! Hooks are notifications: routing has already happened when they run.

use std::future::Future;

use crate::protocol::ClientId;
use crate::router::DropReason;
use crate::session::ConnectionContext;

/// Callbacks invoked by the connection tasks
pub trait SignalingHandler: Send + Sync + 'static {
    /// A TCP connection was accepted. Return `false` to close it before the
    /// WebSocket upgrade.
    fn on_connection(&self, _ctx: &ConnectionContext) -> impl Future<Output = bool> + Send {
        async { true }
    }

    /// The connection joined under `client_id`
    fn on_join(
        &self,
        _ctx: &ConnectionContext,
        _client_id: &ClientId,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// The participant left and was removed from the registry
    fn on_leave(
        &self,
        _ctx: &ConnectionContext,
        _client_id: &ClientId,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// A targeted message from this connection reached nobody
    fn on_undelivered(
        &self,
        _ctx: &ConnectionContext,
        _reason: &DropReason,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Handler that accepts everything and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl SignalingHandler for DefaultHandler {}
