//! Transport capability.
//!
//! The connection itself (socket.io, WebSocket, an in-process relay in tests)
//! lives outside this crate. The session manager only needs named-event
//! `emit`/`on` semantics and a connected flag, which [`Transport`] captures.

use std::sync::Arc;

use crate::listeners::ListenerId;
use crate::protocol::{OutboundEvent, TransportEvent};

/// Callback receiving inbound transport events.
pub type TransportListener = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

/// A named-event connection scoped to one workspace.
///
/// Implementations deliver inbound events to every registered listener in
/// registration order, and must not hold internal locks while doing so.
pub trait Transport: Send + Sync {
    /// Send an event. Implementations may drop events while disconnected.
    fn emit(&self, event: OutboundEvent);

    /// Whether the connection is currently up.
    fn is_connected(&self) -> bool;

    /// Register a listener for inbound events.
    fn on(&self, listener: TransportListener) -> ListenerId;

    /// Remove a listener registered with [`Transport::on`].
    fn off(&self, id: ListenerId);
}

/// Creates (or hands back a cached) transport for a workspace id.
///
/// A factory may return a different handle for the same workspace after a
/// reconnect; the session manager rebinds its listeners when that happens.
pub trait TransportFactory: Send + Sync {
    /// Connection for `workspace_id`.
    fn connect(&self, workspace_id: &str) -> Arc<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn(&str) -> Arc<dyn Transport> + Send + Sync,
{
    fn connect(&self, workspace_id: &str) -> Arc<dyn Transport> {
        self(workspace_id)
    }
}
