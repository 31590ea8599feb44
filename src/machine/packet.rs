//! Outgoing packet encoding.
//!
//! Wire format, one byte per transaction:
//!
//! ```text
//! bit:    7       6    5            4 3 2        1 0
//! field: parity   0   key_pressed   random3     key_value
//! ```
//!
//! `key_value` is 0=Down, 1=Up, 2=Left, 3=Right for directional events, and
//! 0 doubles as "no key" for idle packets. The parity bit makes the total
//! count of 1-bits even.

use tracing::trace;

use crate::machine::io::{RandomSource, SpiLink};
use crate::machine::latch::KeyStateLatch;
use crate::machine::scancode::Key;

/// XOR fold of all 8 bits: 0 for an even population count, 1 for odd.
pub fn parity(byte: u8) -> u8 {
    let mut p = 0;
    let mut x = byte;
    for _ in 0..8 {
        p ^= x & 1;
        x >>= 1;
    }
    p
}

/// Build the full wire word from its fields.
pub fn pack(key_pressed: bool, random3: u8, key_value: u8) -> u8 {
    let payload = ((key_pressed as u8) << 5) | ((random3 & 0x07) << 2) | (key_value & 0x03);
    (parity(payload) << 7) | payload
}

/// Edge-detect evaluation order. First rising edge wins; a simultaneous
/// second edge goes out on the next poll.
const EDGE_PRIORITY: [Key; 4] = [Key::Up, Key::Down, Key::Left, Key::Right];

pub struct PacketEncoder {
    snapshot: [bool; 4],
    random3: u8,
}

impl Default for PacketEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self {
            snapshot: [false; 4],
            random3: 0,
        }
    }

    pub fn random3(&self) -> u8 {
        self.random3
    }

    /// Compare the latch against the previous poll's snapshot and transmit
    /// at most one packet for the highest-priority rising edge.
    pub fn edge_detect_and_send(&mut self, latch: &KeyStateLatch, link: &mut impl SpiLink) {
        let mut sent = false;
        for (i, key) in EDGE_PRIORITY.into_iter().enumerate() {
            let pressed = latch.read(key);
            if pressed && !self.snapshot[i] {
                if sent {
                    // Snapshot stays false so this edge fires next poll
                    continue;
                }
                let word = pack(true, self.random3, key.wire_code().unwrap_or(0));
                trace!("{key:?} rising edge");
                self.transmit(word, link);
                self.snapshot[i] = true;
                sent = true;
            } else {
                self.snapshot[i] = pressed;
            }
        }
    }

    /// Redraw the 3-bit random field and, when enabled, announce it with an
    /// idle packet.
    pub fn periodic_refresh(
        &mut self,
        rng: &mut impl RandomSource,
        link: &mut impl SpiLink,
        send_idle: bool,
    ) {
        self.random3 = loop {
            let v = (rng.next_random32() & 0x07) as u8;
            if v != 7 {
                break v;
            }
        };
        trace!("random field refreshed to {}", self.random3);
        if send_idle {
            let word = pack(false, self.random3, 0);
            self.transmit(word, link);
        }
    }

    fn transmit(&mut self, word: u8, link: &mut impl SpiLink) {
        let mut txn = link.selected();
        let echo = txn.exchange(word);
        trace!("SPI send {word:02X}, echo {echo:02X}");
    }
}
