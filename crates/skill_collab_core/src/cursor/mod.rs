//! Cursor presence: throttled local selection broadcasts and TTL-bounded
//! rendering of remote selections.

mod presence;
mod style;
mod throttle;

pub use presence::{
    CursorEntry, CursorOverlay, CursorPresence, OnlineUser, RemoteCaret, SelectionDecoration,
};
pub use style::{StyleRegistry, StyleRule, user_class, user_color, user_hash};
pub use throttle::{Selection, SelectionThrottle};
