//! Traits for the peripherals the controller core consumes, plus the
//! workstation-side implementations used by the binary.

use std::time::{Duration, Instant};

use rand::RngCore;

/// Full-duplex synchronous serial link with an explicit chip-select line.
pub trait SpiLink {
    fn assert_select(&mut self);
    fn release_select(&mut self);
    fn exchange(&mut self, byte: u8) -> u8;

    /// Scoped chip-select: asserted on creation, released on drop, so every
    /// exit path deselects.
    fn selected(&mut self) -> Selected<'_, Self>
    where
        Self: Sized,
    {
        Selected::new(self)
    }
}

impl<L: SpiLink + ?Sized> SpiLink for Box<L> {
    fn assert_select(&mut self) {
        (**self).assert_select()
    }
    fn release_select(&mut self) {
        (**self).release_select()
    }
    fn exchange(&mut self, byte: u8) -> u8 {
        (**self).exchange(byte)
    }
}

pub struct Selected<'a, L: SpiLink> {
    link: &'a mut L,
}

impl<'a, L: SpiLink> Selected<'a, L> {
    fn new(link: &'a mut L) -> Self {
        link.assert_select();
        Self { link }
    }

    pub fn exchange(&mut self, byte: u8) -> u8 {
        self.link.exchange(byte)
    }
}

impl<L: SpiLink> Drop for Selected<'_, L> {
    fn drop(&mut self) {
        self.link.release_select();
    }
}

pub trait RandomSource {
    fn next_random32(&mut self) -> u32;
}

/// Level-triggered millisecond timer: `has_expired` stays true from expiry
/// until the next `arm`.
pub trait MillisTimer {
    fn arm(&mut self, window_ms: u64);
    fn has_expired(&self) -> bool;
}

/// Wall-clock timer. Starts expired, matching a hardware timer that has
/// never been armed.
pub struct WallTimer {
    deadline: Instant,
}

impl Default for WallTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl WallTimer {
    pub fn new() -> Self {
        Self {
            deadline: Instant::now(),
        }
    }
}

impl MillisTimer for WallTimer {
    fn arm(&mut self, window_ms: u64) {
        self.deadline = Instant::now() + Duration::from_millis(window_ms);
    }

    fn has_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Host stand-in for the hardware random number generator.
pub struct HostRng {
    rng: rand::rngs::ThreadRng,
}

impl Default for HostRng {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRng {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl RandomSource for HostRng {
    fn next_random32(&mut self) -> u32 {
        self.rng.next_u32()
    }
}
