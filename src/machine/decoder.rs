//! Frame classification: make/break, normal/extended.

use crate::machine::assembler::ScanFrame;

/// A frame reduced to its canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub release: bool,
    pub extended: bool,
    pub code: u8,
}

impl KeyEvent {
    fn make(code: u8) -> Self {
        KeyEvent {
            release: false,
            extended: false,
            code,
        }
    }
}

/// Classify a completed frame.
///
/// Malformed shapes never raise an error: anything unrecognized degrades to
/// a plain make of the last byte.
pub fn classify(frame: &ScanFrame) -> KeyEvent {
    match frame.bytes() {
        &[code] => KeyEvent::make(code),
        &[0xE0, code] => KeyEvent {
            release: false,
            extended: true,
            code,
        },
        &[0xF0, code] => KeyEvent {
            release: true,
            extended: false,
            code,
        },
        &[_, code] => KeyEvent::make(code),
        &[0xE0, 0xF0, code] => KeyEvent {
            release: true,
            extended: true,
            code,
        },
        &[_, _, code] => KeyEvent::make(code),
        other => KeyEvent::make(other.last().copied().unwrap_or(0)),
    }
}
