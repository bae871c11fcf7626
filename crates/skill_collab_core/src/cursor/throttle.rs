//! Trailing-edge throttle for local selection broadcasts.
//!
//! The first change opens a window; changes inside it only replace the
//! pending value, and the latest value is released when the window closes.
//! A value identical to the last one released is dropped.

/// A selection as absolute `(start, end)` offsets, `start <= end`.
pub type Selection = (usize, usize);

/// Per-file throttle state.
#[derive(Debug, Clone)]
pub struct SelectionThrottle {
    window_ms: i64,
    deadline: Option<i64>,
    pending: Option<Selection>,
    last_sent: Option<Selection>,
}

impl SelectionThrottle {
    /// Throttle with a window of `window_ms`.
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms: i64::try_from(window_ms).unwrap_or(i64::MAX),
            deadline: None,
            pending: None,
            last_sent: None,
        }
    }

    /// Record a selection change at `now_ms`. Returns when the window closes.
    pub fn record(&mut self, selection: Selection, now_ms: i64) -> i64 {
        self.pending = Some(selection);
        *self
            .deadline
            .get_or_insert(now_ms.saturating_add(self.window_ms))
    }

    /// Release the pending selection if its window has closed.
    pub fn poll(&mut self, now_ms: i64) -> Option<Selection> {
        match self.deadline {
            Some(deadline) if deadline <= now_ms => {}
            _ => return None,
        }
        self.deadline = None;
        let selection = self.pending.take()?;
        if self.last_sent == Some(selection) {
            return None;
        }
        self.last_sent = Some(selection);
        Some(selection)
    }

    /// When the open window closes, if one is open.
    pub fn next_deadline(&self) -> Option<i64> {
        self.deadline
    }

    /// Forget pending and last-sent state (after the cursor was cleared).
    pub fn reset(&mut self) {
        self.deadline = None;
        self.pending = None;
        self.last_sent = None;
    }
}
