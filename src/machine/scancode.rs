//! Scan Code Set 2 lookup tables.

/// A logical key identity.
///
/// The four arrows carry a 2-bit wire code of their own; everything else maps
/// to an ASCII byte. `index()` gives each key a slot in the 128-entry state
/// array: the base table never produces ASCII below 0x08, so the arrows own
/// slots 0 through 3 (matching their wire codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Down,
    Up,
    Left,
    Right,
    Char(u8),
}

impl Key {
    pub const COUNT: usize = 128;

    pub fn index(self) -> usize {
        match self {
            Key::Down => 0,
            Key::Up => 1,
            Key::Left => 2,
            Key::Right => 3,
            Key::Char(c) => (c as usize) & 0x7F,
        }
    }

    /// 2-bit value carried in the outgoing packet; arrows only.
    pub fn wire_code(self) -> Option<u8> {
        match self {
            Key::Down => Some(0),
            Key::Up => Some(1),
            Key::Left => Some(2),
            Key::Right => Some(3),
            Key::Char(_) => None,
        }
    }
}

/// Resolve a canonical (extended, code) pair to a key, or `None` when the
/// code is not in either table.
pub fn resolve(extended: bool, code: u8) -> Option<Key> {
    if extended {
        return match code {
            0x75 => Some(Key::Up),
            0x72 => Some(Key::Down),
            0x6B => Some(Key::Left),
            0x74 => Some(Key::Right),
            _ => None,
        };
    }

    let ch = match code {
        // Row: ` 1 2 3 4 5 6 7 8 9 0 - =
        0x0E => b'`',
        0x16 => b'1',
        0x1E => b'2',
        0x26 => b'3',
        0x25 => b'4',
        0x2E => b'5',
        0x36 => b'6',
        0x3D => b'7',
        0x3E => b'8',
        0x46 => b'9',
        0x45 => b'0',
        0x4E => b'-',
        0x55 => b'=',

        // Row: Q W E R T Y U I O P [ ]
        0x15 => b'Q',
        0x1D => b'W',
        0x24 => b'E',
        0x2D => b'R',
        0x2C => b'T',
        0x35 => b'Y',
        0x3C => b'U',
        0x43 => b'I',
        0x44 => b'O',
        0x4D => b'P',
        0x54 => b'[',
        0x5B => b']',

        // Row: A S D F G H J K L ; ' \
        0x1C => b'A',
        0x1B => b'S',
        0x23 => b'D',
        0x2B => b'F',
        0x34 => b'G',
        0x33 => b'H',
        0x3B => b'J',
        0x42 => b'K',
        0x4B => b'L',
        0x4C => b';',
        0x52 => b'\'',
        0x5D => b'\\',

        // Row: Z X C V B N M , . /
        0x1A => b'Z',
        0x22 => b'X',
        0x21 => b'C',
        0x2A => b'V',
        0x32 => b'B',
        0x31 => b'N',
        0x3A => b'M',
        0x41 => b',',
        0x49 => b'.',
        0x4A => b'/',

        // Space and control keys
        0x29 => b' ',
        0x5A => b'\n',
        0x0D => b'\t',
        0x66 => 0x08, // Backspace
        0x76 => 0x1B, // Escape

        _ => return None,
    };
    Some(Key::Char(ch))
}
