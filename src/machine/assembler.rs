//! Scan Code Set 2 byte assembler.
//!
//! The keyboard transmits one byte per receive interrupt. A key event is one
//! to three bytes: `[code]` for a plain make, `[E0 code]` for an extended
//! make, `[F0 code]` for a plain break and `[E0 F0 code]` for an extended
//! break. The assembler runs in the receive interrupt and carries its state
//! across invocations until a sequence completes.

use std::sync::Arc;

use tracing::trace;

use crate::machine::mailbox::Mailbox;

/// One completed scan-code sequence, 1 to 3 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFrame {
    bytes: [u8; 3],
    len: u8,
}

impl ScanFrame {
    pub fn new(bytes: &[u8]) -> Self {
        debug_assert!((1..=3).contains(&bytes.len()));
        let mut frame = ScanFrame {
            bytes: [0; 3],
            len: bytes.len().min(3) as u8,
        };
        frame.bytes[..frame.len as usize].copy_from_slice(&bytes[..frame.len as usize]);
        frame
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    GotE0,
    GotF0,
    GotE0F0,
}

/// Accumulates raw bytes into [`ScanFrame`]s.
///
/// Every call is bounded time and never blocks, so it is safe to run at
/// interrupt priority.
pub struct FrameAssembler {
    state: State,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Feed one raw byte; returns a frame when a sequence completes.
    pub fn push(&mut self, b: u8) -> Option<ScanFrame> {
        match self.state {
            State::Idle => match b {
                0xE0 => {
                    self.state = State::GotE0;
                    None
                }
                0xF0 => {
                    self.state = State::GotF0;
                    None
                }
                code => Some(ScanFrame::new(&[code])),
            },
            State::GotE0 => {
                if b == 0xF0 {
                    self.state = State::GotE0F0;
                    None
                } else {
                    self.state = State::Idle;
                    Some(ScanFrame::new(&[0xE0, b]))
                }
            }
            State::GotF0 => {
                self.state = State::Idle;
                Some(ScanFrame::new(&[0xF0, b]))
            }
            State::GotE0F0 => {
                self.state = State::Idle;
                Some(ScanFrame::new(&[0xE0, 0xF0, b]))
            }
        }
    }
}

/// Interrupt-side receive handler: assembles bytes and publishes completed
/// frames into the mailbox. This is the only code that runs in the
/// byte-arrival context.
pub struct ScanIrq {
    assembler: FrameAssembler,
    mailbox: Arc<Mailbox>,
}

impl ScanIrq {
    pub fn new(mailbox: Arc<Mailbox>) -> Self {
        Self {
            assembler: FrameAssembler::new(),
            mailbox,
        }
    }

    pub fn on_byte(&mut self, b: u8) {
        trace!("RX byte {b:02X}");
        if let Some(frame) = self.assembler.push(b) {
            self.mailbox.publish(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(bytes: &[u8]) -> Vec<ScanFrame> {
        let mut assembler = FrameAssembler::new();
        bytes.iter().filter_map(|&b| assembler.push(b)).collect()
    }

    #[test]
    fn test_single_byte_make() {
        for b in 0u8..=0xFF {
            if b == 0xE0 || b == 0xF0 {
                continue;
            }
            let frames = assemble(&[b]);
            assert_eq!(frames, vec![ScanFrame::new(&[b])], "byte {b:02X}");
        }
    }

    #[test]
    fn test_extended_make() {
        for b in 0u8..=0xFF {
            if b == 0xF0 {
                continue;
            }
            let frames = assemble(&[0xE0, b]);
            assert_eq!(frames, vec![ScanFrame::new(&[0xE0, b])], "byte {b:02X}");
        }
    }

    #[test]
    fn test_plain_break() {
        for b in 0u8..=0xFF {
            let frames = assemble(&[0xF0, b]);
            assert_eq!(frames, vec![ScanFrame::new(&[0xF0, b])], "byte {b:02X}");
        }
    }

    #[test]
    fn test_extended_break() {
        for b in 0u8..=0xFF {
            let frames = assemble(&[0xE0, 0xF0, b]);
            assert_eq!(frames, vec![ScanFrame::new(&[0xE0, 0xF0, b])], "byte {b:02X}");
        }
    }

    #[test]
    fn test_state_retained_across_pushes() {
        let mut assembler = FrameAssembler::new();
        assert_eq!(assembler.push(0xE0), None);
        assert_eq!(assembler.push(0xF0), None);
        assert_eq!(
            assembler.push(0x75),
            Some(ScanFrame::new(&[0xE0, 0xF0, 0x75]))
        );
        // Back to idle: next byte is a fresh make
        assert_eq!(assembler.push(0x1C), Some(ScanFrame::new(&[0x1C])));
    }

    #[test]
    fn test_mixed_stream() {
        use hex_literal::hex;

        // 'A' make, 'A' break, Up make, Up break
        let frames = assemble(&hex!("1C F0 1C E0 75 E0 F0 75"));
        assert_eq!(
            frames,
            vec![
                ScanFrame::new(&hex!("1C")),
                ScanFrame::new(&hex!("F0 1C")),
                ScanFrame::new(&hex!("E0 75")),
                ScanFrame::new(&hex!("E0 F0 75")),
            ]
        );
    }

    #[test]
    fn test_irq_publishes_to_mailbox() {
        let mailbox = Arc::new(Mailbox::new());
        let mut irq = ScanIrq::new(mailbox.clone());
        irq.on_byte(0xE0);
        assert_eq!(mailbox.take(), None);
        irq.on_byte(0x75);
        assert_eq!(mailbox.take(), Some(ScanFrame::new(&[0xE0, 0x75])));
    }
}
