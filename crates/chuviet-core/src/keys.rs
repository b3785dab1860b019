//! Virtual-key codes understood by the engine.
//!
//! The engine speaks Windows virtual-key codes on every platform; shells on
//! other systems translate their native codes before calling in.

pub const VK_BACK: u16 = 0x08;
pub const VK_TAB: u16 = 0x09;
pub const VK_RETURN: u16 = 0x0D;
pub const VK_SHIFT: u16 = 0x10;
pub const VK_CONTROL: u16 = 0x11;
pub const VK_MENU: u16 = 0x12;
pub const VK_CAPITAL: u16 = 0x14;
pub const VK_ESCAPE: u16 = 0x1B;
pub const VK_SPACE: u16 = 0x20;
pub const VK_PRIOR: u16 = 0x21;
pub const VK_NEXT: u16 = 0x22;
pub const VK_END: u16 = 0x23;
pub const VK_HOME: u16 = 0x24;
pub const VK_LEFT: u16 = 0x25;
pub const VK_UP: u16 = 0x26;
pub const VK_RIGHT: u16 = 0x27;
pub const VK_DOWN: u16 = 0x28;
pub const VK_INSERT: u16 = 0x2D;
pub const VK_DELETE: u16 = 0x2E;
pub const VK_LWIN: u16 = 0x5B;
pub const VK_RWIN: u16 = 0x5C;
pub const VK_LSHIFT: u16 = 0xA0;
pub const VK_RSHIFT: u16 = 0xA1;
pub const VK_LCONTROL: u16 = 0xA2;
pub const VK_RCONTROL: u16 = 0xA3;
pub const VK_LMENU: u16 = 0xA4;
pub const VK_RMENU: u16 = 0xA5;
pub const VK_DIVIDE: u16 = 0x6F;
pub const VK_NUMLOCK: u16 = 0x90;
pub const VK_APPS: u16 = 0x5D;

/// `.` on US layouts.
pub const VK_OEM_PERIOD: u16 = 0xBE;
/// `/` and `?`.
pub const VK_OEM_2: u16 = 0xBF;
/// `[` and `{`.
pub const VK_OEM_4: u16 = 0xDB;
/// `]` and `}`.
pub const VK_OEM_6: u16 = 0xDD;
/// `'` and `"`.
pub const VK_OEM_7: u16 = 0xDE;

pub const VK_0: u16 = 0x30;
pub const VK_9: u16 = 0x39;
pub const VK_A: u16 = 0x41;
pub const VK_Z: u16 = 0x5A;

/// Key code for a lowercase ASCII letter or digit.
pub const fn vk(c: char) -> u16 {
    match c {
        'a'..='z' => VK_A + (c as u16 - 'a' as u16),
        'A'..='Z' => VK_A + (c as u16 - 'A' as u16),
        '0'..='9' => VK_0 + (c as u16 - '0' as u16),
        ' ' => VK_SPACE,
        '\t' => VK_TAB,
        '\n' => VK_RETURN,
        _ => 0,
    }
}

pub fn is_letter(key: u16) -> bool {
    (VK_A..=VK_Z).contains(&key)
}

pub fn is_digit(key: u16) -> bool {
    (VK_0..=VK_9).contains(&key)
}

/// Space, Return, Tab and Escape end the word under composition.
pub fn is_boundary(key: u16) -> bool {
    matches!(key, VK_SPACE | VK_RETURN | VK_TAB | VK_ESCAPE)
}

pub fn is_modifier(key: u16) -> bool {
    matches!(
        key,
        VK_SHIFT
            | VK_CONTROL
            | VK_MENU
            | VK_CAPITAL
            | VK_LWIN
            | VK_RWIN
            | VK_LSHIFT
            | VK_RSHIFT
            | VK_LCONTROL
            | VK_RCONTROL
            | VK_LMENU
            | VK_RMENU
    )
}

/// Lowercase ASCII character produced by a letter, digit or bracket key.
pub fn to_char(key: u16) -> Option<char> {
    if is_letter(key) {
        Some((b'a' + (key - VK_A) as u8) as char)
    } else if is_digit(key) {
        Some((b'0' + (key - VK_0) as u8) as char)
    } else {
        match key {
            VK_OEM_4 => Some('['),
            VK_OEM_6 => Some(']'),
            _ => None,
        }
    }
}

/// Keys that must be posted with the extended-key flag. Without it the
/// navigation keys turn into their numpad twins while NumLock is on.
pub fn is_extended(key: u16) -> bool {
    matches!(
        key,
        VK_PRIOR
            | VK_NEXT
            | VK_END
            | VK_HOME
            | VK_LEFT
            | VK_UP
            | VK_RIGHT
            | VK_DOWN
            | VK_INSERT
            | VK_DELETE
            | VK_RCONTROL
            | VK_RMENU
            | VK_LWIN
            | VK_RWIN
            | VK_APPS
            | VK_DIVIDE
            | VK_NUMLOCK
    )
}

/// `.`, `!` or `?`.
pub fn is_sentence_end(key: u16, shift: bool) -> bool {
    match key {
        VK_OEM_PERIOD => !shift,
        VK_OEM_2 => shift,
        _ => shift && key == vk('1'),
    }
}

/// Quotes and opening brackets, which may sit between a sentence end and
/// the next word.
pub fn is_opening_punct(key: u16, shift: bool) -> bool {
    match key {
        VK_OEM_7 | VK_OEM_4 => true,
        _ => shift && key == vk('9'),
    }
}

pub fn is_vowel_key(key: u16) -> bool {
    matches!(to_char(key), Some('a' | 'e' | 'i' | 'o' | 'u' | 'y'))
}
