//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin selector.
/// Stores an internal cursor to rotate through candidates.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the index to use out of `len` candidates and advance the cursor
    /// to `(index + 1) % len`.
    ///
    /// The cursor is shared by callers passing different `len` values, so
    /// the stored value is reduced modulo `len` before use.
    pub fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        let previous = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cursor| {
                Some((cursor % len + 1) % len)
            })
            .unwrap_or_else(|cursor| cursor);
        Some(previous % len)
    }

    /// Current cursor value.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}
