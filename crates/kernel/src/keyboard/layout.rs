//! Keyboard layouts
//!
//! Three translation planes (normal, shifted, AltGr) of 128 entries each,
//! indexed by set-1 make code. A zero entry means "no mapping in this
//! plane"; the shifted and AltGr planes fall through to normal. Symbols are
//! Latin-1 bytes, so the DE umlauts and AltGr glyphs stay single-byte.

pub struct Layout {
    pub name: &'static str,
    pub normal: [u8; 128],
    pub shifted: [u8; 128],
    pub altgr: [u8; 128],
}

/// Expand a sparse (scancode, symbol) list into a full plane.
const fn plane(pairs: &[(u8, u8)]) -> [u8; 128] {
    let mut table = [0u8; 128];
    let mut i = 0;
    while i < pairs.len() {
        table[pairs[i].0 as usize] = pairs[i].1;
        i += 1;
    }
    table
}

const EMPTY_PLANE: [u8; 128] = [0; 128];

pub static US: Layout = Layout {
    name: "us",
    normal: plane(&[
        (0x01, 0x1B), // Esc
        (0x02, b'1'),
        (0x03, b'2'),
        (0x04, b'3'),
        (0x05, b'4'),
        (0x06, b'5'),
        (0x07, b'6'),
        (0x08, b'7'),
        (0x09, b'8'),
        (0x0A, b'9'),
        (0x0B, b'0'),
        (0x0C, b'-'),
        (0x0D, b'='),
        (0x0E, 0x08), // Backspace
        (0x0F, b'\t'),
        (0x10, b'q'),
        (0x11, b'w'),
        (0x12, b'e'),
        (0x13, b'r'),
        (0x14, b't'),
        (0x15, b'y'),
        (0x16, b'u'),
        (0x17, b'i'),
        (0x18, b'o'),
        (0x19, b'p'),
        (0x1A, b'['),
        (0x1B, b']'),
        (0x1C, b'\n'),
        (0x1E, b'a'),
        (0x1F, b's'),
        (0x20, b'd'),
        (0x21, b'f'),
        (0x22, b'g'),
        (0x23, b'h'),
        (0x24, b'j'),
        (0x25, b'k'),
        (0x26, b'l'),
        (0x27, b';'),
        (0x28, b'\''),
        (0x29, b'`'),
        (0x2B, b'\\'),
        (0x2C, b'z'),
        (0x2D, b'x'),
        (0x2E, b'c'),
        (0x2F, b'v'),
        (0x30, b'b'),
        (0x31, b'n'),
        (0x32, b'm'),
        (0x33, b','),
        (0x34, b'.'),
        (0x35, b'/'),
        (0x37, b'*'), // keypad
        (0x39, b' '),
        (0x47, b'7'),
        (0x48, b'8'),
        (0x49, b'9'),
        (0x4A, b'-'),
        (0x4B, b'4'),
        (0x4C, b'5'),
        (0x4D, b'6'),
        (0x4E, b'+'),
        (0x4F, b'1'),
        (0x50, b'2'),
        (0x51, b'3'),
        (0x52, b'0'),
        (0x53, b'.'),
    ]),
    shifted: plane(&[
        (0x02, b'!'),
        (0x03, b'@'),
        (0x04, b'#'),
        (0x05, b'$'),
        (0x06, b'%'),
        (0x07, b'^'),
        (0x08, b'&'),
        (0x09, b'*'),
        (0x0A, b'('),
        (0x0B, b')'),
        (0x0C, b'_'),
        (0x0D, b'+'),
        (0x10, b'Q'),
        (0x11, b'W'),
        (0x12, b'E'),
        (0x13, b'R'),
        (0x14, b'T'),
        (0x15, b'Y'),
        (0x16, b'U'),
        (0x17, b'I'),
        (0x18, b'O'),
        (0x19, b'P'),
        (0x1A, b'{'),
        (0x1B, b'}'),
        (0x1E, b'A'),
        (0x1F, b'S'),
        (0x20, b'D'),
        (0x21, b'F'),
        (0x22, b'G'),
        (0x23, b'H'),
        (0x24, b'J'),
        (0x25, b'K'),
        (0x26, b'L'),
        (0x27, b':'),
        (0x28, b'"'),
        (0x29, b'~'),
        (0x2B, b'|'),
        (0x2C, b'Z'),
        (0x2D, b'X'),
        (0x2E, b'C'),
        (0x2F, b'V'),
        (0x30, b'B'),
        (0x31, b'N'),
        (0x32, b'M'),
        (0x33, b'<'),
        (0x34, b'>'),
        (0x35, b'?'),
    ]),
    altgr: EMPTY_PLANE,
};

pub static DE: Layout = Layout {
    name: "de",
    normal: plane(&[
        (0x01, 0x1B), // Esc
        (0x02, b'1'),
        (0x03, b'2'),
        (0x04, b'3'),
        (0x05, b'4'),
        (0x06, b'5'),
        (0x07, b'6'),
        (0x08, b'7'),
        (0x09, b'8'),
        (0x0A, b'9'),
        (0x0B, b'0'),
        (0x0C, 0xDF), // ß
        (0x0D, 0xB4), // acute accent
        (0x0E, 0x08), // Backspace
        (0x0F, b'\t'),
        (0x10, b'q'),
        (0x11, b'w'),
        (0x12, b'e'),
        (0x13, b'r'),
        (0x14, b't'),
        (0x15, b'z'),
        (0x16, b'u'),
        (0x17, b'i'),
        (0x18, b'o'),
        (0x19, b'p'),
        (0x1A, 0xFC), // ü
        (0x1B, b'+'),
        (0x1C, b'\n'),
        (0x1E, b'a'),
        (0x1F, b's'),
        (0x20, b'd'),
        (0x21, b'f'),
        (0x22, b'g'),
        (0x23, b'h'),
        (0x24, b'j'),
        (0x25, b'k'),
        (0x26, b'l'),
        (0x27, 0xF6), // ö
        (0x28, 0xE4), // ä
        (0x29, b'^'),
        (0x2B, b'#'),
        (0x2C, b'y'),
        (0x2D, b'x'),
        (0x2E, b'c'),
        (0x2F, b'v'),
        (0x30, b'b'),
        (0x31, b'n'),
        (0x32, b'm'),
        (0x33, b','),
        (0x34, b'.'),
        (0x35, b'-'),
        (0x37, b'*'), // keypad
        (0x39, b' '),
        (0x47, b'7'),
        (0x48, b'8'),
        (0x49, b'9'),
        (0x4A, b'-'),
        (0x4B, b'4'),
        (0x4C, b'5'),
        (0x4D, b'6'),
        (0x4E, b'+'),
        (0x4F, b'1'),
        (0x50, b'2'),
        (0x51, b'3'),
        (0x52, b'0'),
        (0x53, b','),
        (0x56, b'<'),
    ]),
    shifted: plane(&[
        (0x02, b'!'),
        (0x03, b'"'),
        (0x04, 0xA7), // §
        (0x05, b'$'),
        (0x06, b'%'),
        (0x07, b'&'),
        (0x08, b'/'),
        (0x09, b'('),
        (0x0A, b')'),
        (0x0B, b'='),
        (0x0C, b'?'),
        (0x0D, b'`'),
        (0x10, b'Q'),
        (0x11, b'W'),
        (0x12, b'E'),
        (0x13, b'R'),
        (0x14, b'T'),
        (0x15, b'Z'),
        (0x16, b'U'),
        (0x17, b'I'),
        (0x18, b'O'),
        (0x19, b'P'),
        (0x1A, 0xDC), // Ü
        (0x1B, b'*'),
        (0x1E, b'A'),
        (0x1F, b'S'),
        (0x20, b'D'),
        (0x21, b'F'),
        (0x22, b'G'),
        (0x23, b'H'),
        (0x24, b'J'),
        (0x25, b'K'),
        (0x26, b'L'),
        (0x27, 0xD6), // Ö
        (0x28, 0xC4), // Ä
        (0x29, 0xB0), // °
        (0x2B, b'\''),
        (0x2C, b'Y'),
        (0x2D, b'X'),
        (0x2E, b'C'),
        (0x2F, b'V'),
        (0x30, b'B'),
        (0x31, b'N'),
        (0x32, b'M'),
        (0x33, b';'),
        (0x34, b':'),
        (0x35, b'_'),
        (0x56, b'>'),
    ]),
    altgr: plane(&[
        (0x03, 0xB2), // ²
        (0x04, 0xB3), // ³
        (0x08, b'{'),
        (0x09, b'['),
        (0x0A, b']'),
        (0x0B, b'}'),
        (0x0C, b'\\'),
        (0x10, b'@'),
        (0x1B, b'~'),
        (0x32, 0xB5), // µ
        (0x56, b'|'),
    ]),
};
