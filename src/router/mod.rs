//! Message routing
//!
//! | type | action |
//! |---|---|
//! | `join` | assign identity, reply `joined`, announce `client-list` |
//! | `connection-request`, `connection-response` | forward to `to`; dropped if `to` is empty or not joined |
//! | `offer`, `answer`, `ice-candidate` | forward to `to`, or to everyone else when `to` is empty |
//! | anything else | ignored |
//!
//! Forwarded messages keep `type`, `from`, `to` and `data` exactly as the
//! sender wrote them. The only payload the router builds itself is the
//! `client-list` announcement sent after every join and leave.

pub mod dispatch;
pub mod relay;

pub use dispatch::{Dispatch, DropReason, IgnoreReason};
pub use relay::MessageRouter;
