//! Per-key pressed state with a shared debounce gate.

use tracing::trace;

use crate::machine::decoder::KeyEvent;
use crate::machine::io::MillisTimer;
use crate::machine::scancode::{Key, resolve};

/// Latched pressed/released state for every key symbol.
///
/// Break events clear unconditionally. Make events are gated by one timer
/// shared across all keys: inside the window a make is treated as contact
/// bounce and clears the latch instead of setting it. A shared gate means a
/// press of one key can suppress a genuine press of another inside the same
/// window; the hardware this models behaves the same way.
pub struct KeyStateLatch {
    pressed: [bool; Key::COUNT],
}

impl Default for KeyStateLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStateLatch {
    pub fn new() -> Self {
        Self {
            pressed: [false; Key::COUNT],
        }
    }

    pub fn apply(&mut self, event: &KeyEvent, debounce: &mut impl MillisTimer, window_ms: u64) {
        let Some(key) = resolve(event.extended, event.code) else {
            trace!(
                "unmapped scan code {:02X} (extended: {})",
                event.code, event.extended
            );
            return;
        };
        let slot = &mut self.pressed[key.index()];
        if event.release {
            *slot = false;
        } else if debounce.has_expired() {
            *slot = true;
            debounce.arm(window_ms);
        } else {
            *slot = false;
        }
    }

    pub fn read(&self, key: Key) -> bool {
        self.pressed[key.index()]
    }
}
