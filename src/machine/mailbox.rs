//! Depth-1 handoff between the receive interrupt and the polling loop.

use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::machine::assembler::ScanFrame;

/// Single-slot, lossy mailbox.
///
/// Invariants: the interrupt side only writes an empty slot, the consumer
/// clears the slot under the same guard, and at most one frame is ever in
/// flight. A frame arriving while one is pending is dropped; bounded loss is
/// preferred over blocking at interrupt priority.
pub struct Mailbox {
    slot: Mutex<Option<ScanFrame>>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Interrupt side. Never waits: if the consumer holds the guard or a
    /// frame is already pending, the new frame is dropped.
    pub fn publish(&self, frame: ScanFrame) {
        let Ok(mut slot) = self.slot.try_lock() else {
            trace!("mailbox busy, frame dropped");
            return;
        };
        if slot.is_some() {
            trace!("mailbox full, frame dropped");
            return;
        }
        *slot = Some(frame);
    }

    /// Polling-loop side. The guard is held only for the copy-and-clear.
    pub fn take(&self) -> Option<ScanFrame> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_take() {
        let mailbox = Mailbox::new();
        assert_eq!(mailbox.take(), None);
        mailbox.publish(ScanFrame::new(&[0x1C]));
        assert_eq!(mailbox.take(), Some(ScanFrame::new(&[0x1C])));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_publish_while_full_is_dropped() {
        let mailbox = Mailbox::new();
        mailbox.publish(ScanFrame::new(&[0x1C]));
        mailbox.publish(ScanFrame::new(&[0x32]));
        // The pending frame is retained; the second publish is lost
        assert_eq!(mailbox.take(), Some(ScanFrame::new(&[0x1C])));
        assert_eq!(mailbox.take(), None);
    }
}
