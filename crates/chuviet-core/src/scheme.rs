use crate::chars::Tone;
use crate::keys;
use serde::{Deserialize, Serialize};

/// Transliteration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Telex,
    Vni,
}

impl Method {
    /// Scheme id used across the FFI boundary (0 = Telex, 1 = VNI).
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Method::Telex),
            1 => Some(Method::Vni),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Method::Telex => 0,
            Method::Vni => 1,
        }
    }
}

/// What a key does to the word when it is not taken literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Tone(Tone),
    /// Remove the tone, or the last diacritic when there is no tone.
    Clear,
    /// Circumflex on the rightmost a/e/o.
    Circumflex,
    /// Horn on o/u.
    Horn,
    /// Breve on a.
    Breve,
    /// Telex `w`: horn, breve, or a bare `ư`.
    HornOrBreve,
    /// Stroke on the first `d` of the word (Telex `d`, VNI `9`).
    Stroke,
    /// Telex `aa`, `ee`, `oo`: circumflex on the latest plain vowel of that
    /// letter, so "tana" gives "tân".
    Double(char),
    /// Telex `]` and `[` when enabled: a horned `u` or `o` typed as a letter.
    Bracket(char),
}

const TELEX: &[(char, Modifier)] = &[
    ('s', Modifier::Tone(Tone::Acute)),
    ('f', Modifier::Tone(Tone::Grave)),
    ('r', Modifier::Tone(Tone::Hook)),
    ('x', Modifier::Tone(Tone::Tilde)),
    ('j', Modifier::Tone(Tone::Dot)),
    ('z', Modifier::Clear),
    ('a', Modifier::Double('a')),
    ('e', Modifier::Double('e')),
    ('o', Modifier::Double('o')),
    ('w', Modifier::HornOrBreve),
    ('d', Modifier::Stroke),
];

const VNI: &[(char, Modifier)] = &[
    ('1', Modifier::Tone(Tone::Acute)),
    ('2', Modifier::Tone(Tone::Grave)),
    ('3', Modifier::Tone(Tone::Hook)),
    ('4', Modifier::Tone(Tone::Tilde)),
    ('5', Modifier::Tone(Tone::Dot)),
    ('6', Modifier::Circumflex),
    ('7', Modifier::Horn),
    ('8', Modifier::Breve),
    ('9', Modifier::Stroke),
    ('0', Modifier::Clear),
];

fn table(method: Method) -> &'static [(char, Modifier)] {
    match method {
        Method::Telex => TELEX,
        Method::Vni => VNI,
    }
}

/// Modifier meaning of `key` under `method`, if any.
///
/// Shifted digits are symbols, never VNI modifiers.
pub fn modifier(method: Method, key: u16, shift: bool) -> Option<Modifier> {
    if shift && keys::is_digit(key) {
        return None;
    }
    let c = keys::to_char(key)?;
    table(method)
        .iter()
        .find(|(k, _)| *k == c)
        .map(|(_, m)| *m)
}

/// Vowel a bracket key stands for when the bracket shortcut is on.
pub fn bracket_vowel(method: Method, key: u16, shift: bool) -> Option<char> {
    if method != Method::Telex || shift {
        return None;
    }
    match key {
        keys::VK_OEM_6 => Some('u'),
        keys::VK_OEM_4 => Some('o'),
        _ => None,
    }
}

/// Whether `key` can be part of a word under `method`: every letter, plus
/// the VNI digits.
pub fn is_word_key(method: Method, key: u16, shift: bool) -> bool {
    keys::is_letter(key) || (method == Method::Vni && !shift && keys::is_digit(key))
}
