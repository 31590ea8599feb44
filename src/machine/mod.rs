//! The bridge controller core: everything that would run on the device.

pub mod assembler;
pub mod decoder;
pub mod io;
pub mod latch;
pub mod mailbox;
pub mod packet;
pub mod scancode;

use std::sync::Arc;

use tracing::trace;

use crate::machine::assembler::ScanIrq;
use crate::machine::decoder::classify;
use crate::machine::io::{MillisTimer, RandomSource, SpiLink};
use crate::machine::latch::KeyStateLatch;
use crate::machine::mailbox::Mailbox;
use crate::machine::packet::PacketEncoder;
use crate::machine::scancode::Key;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Window during which repeated makes are treated as contact bounce.
    pub debounce_ms: u64,
    /// First random-refresh interval after power-up.
    pub refresh_warmup_ms: u64,
    /// Steady-state random-refresh interval.
    pub refresh_steady_ms: u64,
    /// Announce each refreshed random field with an idle packet.
    pub idle_packet_on_refresh: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            refresh_warmup_ms: 1_000,
            refresh_steady_ms: 5_000,
            idle_packet_on_refresh: true,
        }
    }
}

/// Main-loop half of the bridge.
///
/// The receive-interrupt half is the [`ScanIrq`] obtained from [`irq`];
/// the two halves share only the mailbox. The debounce timer, the latch and
/// the encoder snapshots are touched exclusively from `poll`, so they need
/// no synchronization.
///
/// [`irq`]: Controller::irq
pub struct Controller<L, R, T> {
    mailbox: Arc<Mailbox>,
    latch: KeyStateLatch,
    encoder: PacketEncoder,
    debounce: T,
    refresh: T,
    link: L,
    rng: R,
    config: ControllerConfig,
}

impl<L: SpiLink, R: RandomSource, T: MillisTimer> Controller<L, R, T> {
    pub fn new(link: L, rng: R, debounce: T, mut refresh: T, config: ControllerConfig) -> Self {
        refresh.arm(config.refresh_warmup_ms);
        Self {
            mailbox: Arc::new(Mailbox::new()),
            latch: KeyStateLatch::new(),
            encoder: PacketEncoder::new(),
            debounce,
            refresh,
            link,
            rng,
            config,
        }
    }

    /// Create the interrupt-side handler feeding this controller.
    pub fn irq(&self) -> ScanIrq {
        ScanIrq::new(self.mailbox.clone())
    }

    /// One iteration of the main loop: drain the mailbox, update the latch,
    /// edge-detect the arrows, service the periodic refresh.
    pub fn poll(&mut self) {
        if let Some(frame) = self.mailbox.take() {
            let event = classify(&frame);
            trace!(
                "frame {:02X?} (len {}) -> code {:02X} (release: {}, extended: {})",
                frame.bytes(),
                frame.len(),
                event.code,
                event.release,
                event.extended
            );
            self.latch
                .apply(&event, &mut self.debounce, self.config.debounce_ms);
        }

        self.encoder.edge_detect_and_send(&self.latch, &mut self.link);

        if self.refresh.has_expired() {
            self.encoder.periodic_refresh(
                &mut self.rng,
                &mut self.link,
                self.config.idle_packet_on_refresh,
            );
            self.refresh.arm(self.config.refresh_steady_ms);
        }
    }

    pub fn key_pressed(&self, key: Key) -> bool {
        self.latch.read(key)
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use hex_literal::hex;

    use super::*;
    use crate::machine::packet::pack;

    #[derive(Default)]
    struct RecordingLink {
        sent: Vec<u8>,
        selected: bool,
    }

    impl SpiLink for RecordingLink {
        fn assert_select(&mut self) {
            assert!(!self.selected);
            self.selected = true;
        }
        fn release_select(&mut self) {
            assert!(self.selected);
            self.selected = false;
        }
        fn exchange(&mut self, byte: u8) -> u8 {
            assert!(self.selected);
            self.sent.push(byte);
            0
        }
    }

    struct FixedRng(u32);

    impl RandomSource for FixedRng {
        fn next_random32(&mut self) -> u32 {
            self.0
        }
    }

    /// Timer whose expiry the test controls through a shared handle.
    #[derive(Clone)]
    struct HandleTimer {
        expired: Rc<Cell<bool>>,
    }

    impl HandleTimer {
        fn new(expired: bool) -> Self {
            Self {
                expired: Rc::new(Cell::new(expired)),
            }
        }
    }

    impl MillisTimer for HandleTimer {
        fn arm(&mut self, _window_ms: u64) {
            self.expired.set(false);
        }
        fn has_expired(&self) -> bool {
            self.expired.get()
        }
    }

    fn controller(
        config: ControllerConfig,
    ) -> (
        Controller<RecordingLink, FixedRng, HandleTimer>,
        HandleTimer,
        HandleTimer,
    ) {
        let debounce = HandleTimer::new(true);
        let refresh = HandleTimer::new(false);
        let controller = Controller::new(
            RecordingLink::default(),
            FixedRng(3),
            debounce.clone(),
            refresh.clone(),
            config,
        );
        (controller, debounce, refresh)
    }

    fn feed_and_poll(
        controller: &mut Controller<RecordingLink, FixedRng, HandleTimer>,
        irq: &mut ScanIrq,
        bytes: &[u8],
    ) {
        for &b in bytes {
            irq.on_byte(b);
            controller.poll();
        }
    }

    #[test]
    fn test_press_and_release_through_the_stack() {
        let (mut controller, _debounce, _refresh) = controller(ControllerConfig::default());
        let mut irq = controller.irq();

        feed_and_poll(&mut controller, &mut irq, &hex!("1C"));
        assert!(controller.key_pressed(Key::Char(b'A')));
        feed_and_poll(&mut controller, &mut irq, &hex!("F0 1C"));
        assert!(!controller.key_pressed(Key::Char(b'A')));
        // No arrow ever rose, so nothing was transmitted
        assert!(controller.link().sent.is_empty());
    }

    #[test]
    fn test_arrow_press_emits_packet() {
        let (mut controller, debounce, _refresh) = controller(ControllerConfig::default());
        let mut irq = controller.irq();

        feed_and_poll(&mut controller, &mut irq, &hex!("E0 75"));
        assert!(controller.key_pressed(Key::Up));
        assert_eq!(controller.link().sent, vec![pack(true, 0, 1)]);

        // Held key: no further packets
        controller.poll();
        assert_eq!(controller.link().sent.len(), 1);

        // Release, reopen the gate, press again: second packet
        feed_and_poll(&mut controller, &mut irq, &hex!("E0 F0 75"));
        debounce.expired.set(true);
        feed_and_poll(&mut controller, &mut irq, &hex!("E0 75"));
        assert_eq!(controller.link().sent, vec![pack(true, 0, 1), pack(true, 0, 1)]);
    }

    #[test]
    fn test_break_clears_despite_closed_debounce_window() {
        let (mut controller, debounce, _refresh) = controller(ControllerConfig::default());
        let mut irq = controller.irq();

        feed_and_poll(&mut controller, &mut irq, &hex!("1C"));
        assert!(controller.key_pressed(Key::Char(b'A')));
        assert!(!debounce.expired.get());
        feed_and_poll(&mut controller, &mut irq, &hex!("F0 1C"));
        assert!(!controller.key_pressed(Key::Char(b'A')));
    }

    #[test]
    fn test_unpolled_second_frame_is_lost() {
        let (mut controller, _debounce, _refresh) = controller(ControllerConfig::default());
        let mut irq = controller.irq();

        // Two frames arrive before the loop polls; only the first survives
        irq.on_byte(0x1C);
        irq.on_byte(0x1B);
        controller.poll();
        controller.poll();
        assert!(controller.key_pressed(Key::Char(b'A')));
        assert!(!controller.key_pressed(Key::Char(b'S')));
    }

    #[test]
    fn test_refresh_rearms_with_steady_period() {
        let (mut controller, _debounce, refresh) = controller(ControllerConfig::default());

        controller.poll();
        assert!(controller.link().sent.is_empty());

        refresh.expired.set(true);
        controller.poll();
        // Idle packet with the new random field, then the timer is rearmed
        assert_eq!(controller.link().sent, vec![pack(false, 3, 0)]);
        assert!(!refresh.expired.get());

        // Subsequent arrow packets carry the refreshed field
        let mut irq = controller.irq();
        feed_and_poll(&mut controller, &mut irq, &hex!("E0 72"));
        assert_eq!(
            controller.link().sent,
            vec![pack(false, 3, 0), pack(true, 3, 0)]
        );
    }

    #[test]
    fn test_refresh_idle_packet_configurable() {
        let (mut controller, _debounce, refresh) = controller(ControllerConfig {
            idle_packet_on_refresh: false,
            ..ControllerConfig::default()
        });

        refresh.expired.set(true);
        controller.poll();
        assert!(controller.link().sent.is_empty());
        assert!(!refresh.expired.get());
    }
}
