//! ASCII to USB HID usage mapping (US layout)
//!
//! Reference: USB HID Usage Tables 1.12, Section 10 (Keyboard/Keypad Page)

/// USB HID key codes (Usage Page 0x07)
#[allow(dead_code)]
pub mod usb {
    pub const KEY_A: u8 = 0x04;
    pub const KEY_Z: u8 = 0x1D;
    pub const KEY_1: u8 = 0x1E;
    pub const KEY_0: u8 = 0x27;

    pub const KEY_ENTER: u8 = 0x28;
    pub const KEY_ESCAPE: u8 = 0x29;
    pub const KEY_BACKSPACE: u8 = 0x2A;
    pub const KEY_TAB: u8 = 0x2B;
    pub const KEY_SPACE: u8 = 0x2C;
    pub const KEY_MINUS: u8 = 0x2D;
    pub const KEY_EQUAL: u8 = 0x2E;
    pub const KEY_LEFT_BRACKET: u8 = 0x2F;
    pub const KEY_RIGHT_BRACKET: u8 = 0x30;
    pub const KEY_BACKSLASH: u8 = 0x31;
    pub const KEY_SEMICOLON: u8 = 0x33;
    pub const KEY_APOSTROPHE: u8 = 0x34;
    pub const KEY_GRAVE: u8 = 0x35;
    pub const KEY_COMMA: u8 = 0x36;
    pub const KEY_PERIOD: u8 = 0x37;
    pub const KEY_SLASH: u8 = 0x38;
}

/// Modifier byte bits
pub mod modifier {
    pub const RIGHT_SHIFT: u8 = 0b0010_0000;
}

/// Shift modifier used for upper-case and shifted symbols
pub const SHIFT: u8 = modifier::RIGHT_SHIFT;

/// Entry: (usage, needs shift). Usage 0 means unmapped.
const ASCII_TABLE: [(u8, bool); 128] = {
    let mut table = [(0u8, false); 128];

    let mut i = 0;
    while i < 26 {
        table[b'a' as usize + i] = (usb::KEY_A + i as u8, false);
        table[b'A' as usize + i] = (usb::KEY_A + i as u8, true);
        i += 1;
    }

    // '1'..'9' then '0'
    let mut d = 0;
    while d < 9 {
        table[b'1' as usize + d] = (usb::KEY_1 + d as u8, false);
        d += 1;
    }
    table[b'0' as usize] = (usb::KEY_0, false);

    let shifted_digits = *b"!@#$%^&*()";
    let mut s = 0;
    while s < shifted_digits.len() {
        table[shifted_digits[s] as usize] = (usb::KEY_1 + s as u8, true);
        s += 1;
    }

    table[b'\n' as usize] = (usb::KEY_ENTER, false);
    table[0x1B] = (usb::KEY_ESCAPE, false);
    table[0x08] = (usb::KEY_BACKSPACE, false);
    table[b'\t' as usize] = (usb::KEY_TAB, false);
    table[b' ' as usize] = (usb::KEY_SPACE, false);

    table[b'-' as usize] = (usb::KEY_MINUS, false);
    table[b'_' as usize] = (usb::KEY_MINUS, true);
    table[b'=' as usize] = (usb::KEY_EQUAL, false);
    table[b'+' as usize] = (usb::KEY_EQUAL, true);
    table[b'[' as usize] = (usb::KEY_LEFT_BRACKET, false);
    table[b'{' as usize] = (usb::KEY_LEFT_BRACKET, true);
    table[b']' as usize] = (usb::KEY_RIGHT_BRACKET, false);
    table[b'}' as usize] = (usb::KEY_RIGHT_BRACKET, true);
    table[b'\\' as usize] = (usb::KEY_BACKSLASH, false);
    table[b'|' as usize] = (usb::KEY_BACKSLASH, true);
    table[b';' as usize] = (usb::KEY_SEMICOLON, false);
    table[b':' as usize] = (usb::KEY_SEMICOLON, true);
    table[b'\'' as usize] = (usb::KEY_APOSTROPHE, false);
    table[b'"' as usize] = (usb::KEY_APOSTROPHE, true);
    table[b'`' as usize] = (usb::KEY_GRAVE, false);
    table[b'~' as usize] = (usb::KEY_GRAVE, true);
    table[b',' as usize] = (usb::KEY_COMMA, false);
    table[b'<' as usize] = (usb::KEY_COMMA, true);
    table[b'.' as usize] = (usb::KEY_PERIOD, false);
    table[b'>' as usize] = (usb::KEY_PERIOD, true);
    table[b'/' as usize] = (usb::KEY_SLASH, false);
    table[b'?' as usize] = (usb::KEY_SLASH, true);

    table
};

/// Map an ASCII character to `(modifier byte, usage)`
///
/// Uses a fixed-size lookup table. Returns None for unmapped characters.
#[inline]
pub fn ascii_to_usb(c: char) -> Option<(u8, u8)> {
    if !c.is_ascii() {
        return None;
    }
    match ASCII_TABLE[c as usize] {
        (0, _) => None,
        (usage, true) => Some((SHIFT, usage)),
        (usage, false) => Some((0, usage)),
    }
}
