//! Precomposed Vietnamese vowels.

use serde::{Deserialize, Serialize};

/// The five marked tones plus the level (unmarked) tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Level,
    /// sắc
    Acute,
    /// huyền
    Grave,
    /// hỏi
    Hook,
    /// ngã
    Tilde,
    /// nặng
    Dot,
}

impl Tone {
    const fn index(self) -> usize {
        match self {
            Tone::Level => 0,
            Tone::Acute => 1,
            Tone::Grave => 2,
            Tone::Hook => 3,
            Tone::Tilde => 4,
            Tone::Dot => 5,
        }
    }
}

/// Vowel-quality marks. Tone marks are tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Diacritic {
    #[default]
    None,
    /// â ê ô
    Circumflex,
    /// ă
    Breve,
    /// ơ ư
    Horn,
}

impl Diacritic {
    /// Whether this mark exists on the given base vowel.
    pub fn fits(self, base: char) -> bool {
        match self {
            Diacritic::None => true,
            Diacritic::Circumflex => matches!(base, 'a' | 'e' | 'o'),
            Diacritic::Breve => base == 'a',
            Diacritic::Horn => matches!(base, 'o' | 'u'),
        }
    }
}

// Each row: level, sắc, huyền, hỏi, ngã, nặng.
const A: [char; 6] = ['a', 'á', 'à', 'ả', 'ã', 'ạ'];
const A_BREVE: [char; 6] = ['ă', 'ắ', 'ằ', 'ẳ', 'ẵ', 'ặ'];
const A_CIRC: [char; 6] = ['â', 'ấ', 'ầ', 'ẩ', 'ẫ', 'ậ'];
const E: [char; 6] = ['e', 'é', 'è', 'ẻ', 'ẽ', 'ẹ'];
const E_CIRC: [char; 6] = ['ê', 'ế', 'ề', 'ể', 'ễ', 'ệ'];
const I: [char; 6] = ['i', 'í', 'ì', 'ỉ', 'ĩ', 'ị'];
const O: [char; 6] = ['o', 'ó', 'ò', 'ỏ', 'õ', 'ọ'];
const O_CIRC: [char; 6] = ['ô', 'ố', 'ồ', 'ổ', 'ỗ', 'ộ'];
const O_HORN: [char; 6] = ['ơ', 'ớ', 'ờ', 'ở', 'ỡ', 'ợ'];
const U: [char; 6] = ['u', 'ú', 'ù', 'ủ', 'ũ', 'ụ'];
const U_HORN: [char; 6] = ['ư', 'ứ', 'ừ', 'ử', 'ữ', 'ự'];
const Y: [char; 6] = ['y', 'ý', 'ỳ', 'ỷ', 'ỹ', 'ỵ'];

fn row(base: char, diacritic: Diacritic) -> Option<&'static [char; 6]> {
    Some(match (base, diacritic) {
        ('a', Diacritic::None) => &A,
        ('a', Diacritic::Breve) => &A_BREVE,
        ('a', Diacritic::Circumflex) => &A_CIRC,
        ('e', Diacritic::None) => &E,
        ('e', Diacritic::Circumflex) => &E_CIRC,
        ('i', Diacritic::None) => &I,
        ('o', Diacritic::None) => &O,
        ('o', Diacritic::Circumflex) => &O_CIRC,
        ('o', Diacritic::Horn) => &O_HORN,
        ('u', Diacritic::None) => &U,
        ('u', Diacritic::Horn) => &U_HORN,
        ('y', Diacritic::None) => &Y,
        _ => return None,
    })
}

/// Builds the precomposed lowercase vowel, or `None` for an impossible
/// combination such as a horn on `e`.
pub fn compose(base: char, diacritic: Diacritic, tone: Tone) -> Option<char> {
    row(base, diacritic).map(|r| r[tone.index()])
}

/// Applies the requested case to a (possibly precomposed) lowercase char.
pub fn with_case(c: char, upper: bool) -> char {
    if upper {
        c.to_uppercase().next().unwrap_or(c)
    } else {
        c
    }
}

pub const D_STROKE: char = 'đ';
