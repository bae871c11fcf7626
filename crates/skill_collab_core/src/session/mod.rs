//! Transport session, leader tracking, and the connection state machine.

mod leader;
mod manager;
mod state;

pub use leader::LeaderTable;
pub use manager::{SessionEvent, SessionManager, SyncHandler};
pub use state::{ConnectionAction, ConnectionEvent, ConnectionState};
