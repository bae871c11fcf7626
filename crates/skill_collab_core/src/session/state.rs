//! Connection state machine.
//!
//! Restoring session state after a reconnect happens on exactly one edge:
//! entering [`ConnectionState::Connected`] from any other state. Repeated
//! `connect` notifications while already connected fire nothing.

use serde::{Deserialize, Serialize};

/// Lifecycle of the workspace connection as seen by the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport is bound, or it reported `disconnect`.
    #[default]
    Disconnected,
    /// Listeners are bound but the transport has not reported `connect` yet.
    Connecting,
    /// The transport reported `connect`.
    Connected,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Listeners were attached to a (possibly new) transport handle.
    Bind,
    /// The transport reported `connect`.
    Connected,
    /// The transport reported `disconnect`, or the session was torn down.
    Disconnected,
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Re-announce the active file to the server.
    ReassertActiveFile,
    /// Send the full state of locally edited documents so edits made offline reach peers.
    PublishLocalState,
    /// Emit one resync request per file opened while offline.
    FlushPendingResync,
}

impl ConnectionState {
    /// Apply `event`, returning the next state and the actions to run.
    pub fn transition(self, event: ConnectionEvent) -> (ConnectionState, Vec<ConnectionAction>) {
        match (self, event) {
            (ConnectionState::Connected, ConnectionEvent::Connected) => {
                (ConnectionState::Connected, Vec::new())
            }
            (_, ConnectionEvent::Connected) => (
                ConnectionState::Connected,
                vec![
                    ConnectionAction::ReassertActiveFile,
                    ConnectionAction::PublishLocalState,
                    ConnectionAction::FlushPendingResync,
                ],
            ),
            (_, ConnectionEvent::Bind) => (ConnectionState::Connecting, Vec::new()),
            (_, ConnectionEvent::Disconnected) => (ConnectionState::Disconnected, Vec::new()),
        }
    }

    /// Check if the state is `Connected`.
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_edge_fires_restore_actions() {
        let (state, actions) = ConnectionState::Disconnected.transition(ConnectionEvent::Connected);
        assert_eq!(state, ConnectionState::Connected);
        assert_eq!(
            actions,
            vec![
                ConnectionAction::ReassertActiveFile,
                ConnectionAction::PublishLocalState,
                ConnectionAction::FlushPendingResync
            ]
        );

        let (_, actions) = ConnectionState::Connecting.transition(ConnectionEvent::Connected);
        assert_eq!(actions.len(), 3);
    }

    #[test]
    fn test_repeated_connect_fires_nothing() {
        let (state, actions) = ConnectionState::Connected.transition(ConnectionEvent::Connected);
        assert!(state.is_connected());
        assert!(actions.is_empty());
    }

    #[test]
    fn test_bind_and_disconnect() {
        let (state, actions) = ConnectionState::Connected.transition(ConnectionEvent::Disconnected);
        assert_eq!(state, ConnectionState::Disconnected);
        assert!(actions.is_empty());

        let (state, _) = state.transition(ConnectionEvent::Bind);
        assert_eq!(state, ConnectionState::Connecting);
        assert!(!state.is_connected());
    }
}
