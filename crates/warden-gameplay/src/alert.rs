//! Alert raising and buffering.
//!
//! Agents raise alerts into an [`AlertSink`] while handling a hit. The
//! director owns an [`AlertQueue`] and fans the buffered origins out once the
//! current operation has finished, so an alert never triggers another alert
//! while it is being delivered.

use warden_common::Vec3;

/// Receives alert origins raised by agents.
pub trait AlertSink {
    /// Raises an alert centered on `origin`.
    fn raise_alert(&mut self, origin: Vec3);
}

/// FIFO buffer of raised alerts.
#[derive(Debug, Clone, Default)]
pub struct AlertQueue {
    pending: Vec<Vec3>,
}

impl AlertQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered alerts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes every buffered origin in raise order.
    pub fn drain(&mut self) -> Vec<Vec3> {
        std::mem::take(&mut self.pending)
    }
}

impl AlertSink for AlertQueue {
    fn raise_alert(&mut self, origin: Vec3) {
        self.pending.push(origin);
    }
}
