//! Vietnamese syllable structure: where the onset ends, which vowels form
//! the nucleus, and where the tone mark goes.

use crate::buffer::Letter;
use crate::chars::{Diacritic, Tone};
use std::ops::Range;

const INITIALS: &[&str] = &[
    "b", "c", "d", "g", "h", "k", "l", "m", "n", "p", "r", "s", "t", "v", "x", "ch", "gh", "gi",
    "kh", "ng", "nh", "ph", "qu", "th", "tr", "ngh",
];

const FINALS: &[&str] = &["c", "ch", "m", "n", "ng", "nh", "p", "t"];

const STOP_FINALS: &[&str] = &["c", "ch", "p", "t"];

/// Vowel clusters by base letter, diacritics ignored.
const DIPHTHONGS: &[&str] = &[
    "ai", "ao", "au", "ay", "eo", "eu", "ia", "ie", "iu", "oa", "oe", "oi", "oo", "ua", "ue", "ui",
    "uo", "uu", "uy", "ye",
];

const TRIPHTHONGS: &[&str] = &[
    "ieu", "oai", "oao", "oay", "oeo", "uay", "uoi", "uou", "uya", "uye", "uyu", "yeu",
];

/// Pairs whose tone position depends on the modern/classic style.
const MEDIAL_PAIRS: &[&str] = &["oa", "oe", "uy"];

/// Onset, nucleus and coda of the letters typed so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syllable {
    pub initial: Range<usize>,
    pub vowels: Range<usize>,
    pub coda: Range<usize>,
    /// Letters left over after the coda (a vowel after a final consonant).
    pub trailing: bool,
}

fn base(letters: &[Letter], range: Range<usize>) -> String {
    letters[range].iter().map(|l| l.base()).collect()
}

/// Splits `letters` into onset, nucleus and coda. Returns `None` when the
/// word holds anything other than letters.
pub fn parse(letters: &[Letter]) -> Option<Syllable> {
    if letters.iter().any(|l| !l.is_alpha()) {
        return None;
    }
    let n = letters.len();
    let mut i = letters.iter().take_while(|l| !l.is_vowel()).count();

    // qu and gi absorb their glide into the onset.
    if i == 1 && i < n {
        let onset = letters[0].base();
        let next = letters[1].base();
        let vowel_follows = n > 2 && letters[2].is_vowel();
        if (onset == 'q' && next == 'u') || (onset == 'g' && next == 'i' && vowel_follows) {
            i += 1;
        }
    }
    let initial = 0..i;

    let v_start = i;
    while i < n && letters[i].is_vowel() {
        i += 1;
    }
    let vowels = v_start..i;

    let c_start = i;
    while i < n && !letters[i].is_vowel() {
        i += 1;
    }
    Some(Syllable {
        initial,
        vowels,
        coda: c_start..i,
        trailing: i < n,
    })
}

fn spelling_ok(initial: &str, first_vowel: char) -> bool {
    let front = matches!(first_vowel, 'e' | 'i' | 'y');
    let back = matches!(first_vowel, 'a' | 'o' | 'u');
    match initial {
        "c" => !front,
        "k" => !back,
        "g" => first_vowel != 'e',
        "ng" => !matches!(first_vowel, 'e' | 'i'),
        "gh" | "ngh" => !back,
        _ => true,
    }
}

fn plausible_parts(letters: &[Letter], syl: &Syllable) -> bool {
    if syl.trailing {
        return false;
    }
    let initial = base(letters, syl.initial.clone());
    if !initial.is_empty() && !INITIALS.contains(&initial.as_str()) {
        return false;
    }
    let nucleus = base(letters, syl.vowels.clone());
    let nucleus_ok = match nucleus.len() {
        0 | 1 => true,
        2 => DIPHTHONGS.contains(&nucleus.as_str()),
        3 => TRIPHTHONGS.contains(&nucleus.as_str()),
        _ => false,
    };
    if !nucleus_ok {
        return false;
    }
    let coda = base(letters, syl.coda.clone());
    if !coda.is_empty() && (nucleus.is_empty() || !FINALS.contains(&coda.as_str())) {
        return false;
    }
    match nucleus.chars().next() {
        Some(v) => spelling_ok(&initial, v),
        None => true,
    }
}

/// Whether the letters typed so far can still grow into a Vietnamese
/// syllable. Gates Telex modifiers.
pub fn is_plausible(letters: &[Letter]) -> bool {
    match parse(letters) {
        Some(syl) => plausible_parts(letters, &syl),
        None => false,
    }
}

/// Whether the letters form a complete, well-formed Vietnamese syllable
/// carrying `tone`.
pub fn is_valid_word(letters: &[Letter], tone: Tone) -> bool {
    let Some(syl) = parse(letters) else {
        return false;
    };
    if syl.vowels.is_empty() || !plausible_parts(letters, &syl) {
        return false;
    }
    let nucleus = &letters[syl.vowels.clone()];
    let bases: String = nucleus.iter().map(|l| l.base()).collect();
    let coda = base(letters, syl.coda.clone());
    let has_coda = !coda.is_empty();

    for (idx, l) in nucleus.iter().enumerate() {
        let last = idx + 1 == nucleus.len();
        if l.diacritic == Diacritic::Breve && (!has_coda || !last) {
            return false;
        }
    }

    for pair in ["ie", "ye", "uo"] {
        if let Some(at) = bases.find(pair) {
            let closed = has_coda || at + 2 < bases.len();
            if !closed {
                return false;
            }
            let second = &nucleus[at + 1];
            let marked = match pair {
                "uo" => second.diacritic != Diacritic::None,
                _ => second.diacritic == Diacritic::Circumflex,
            };
            if !marked {
                return false;
            }
        }
    }
    if let Some(at) = bases.find("eu") {
        if nucleus[at].diacritic != Diacritic::Circumflex {
            return false;
        }
    }

    if STOP_FINALS.contains(&coda.as_str()) && !matches!(tone, Tone::Acute | Tone::Dot) {
        return false;
    }
    true
}

/// Indices of the vowels that may carry the tone, glides of qu/gi excluded.
/// A reverted VNI digit ends the word for this purpose.
fn nucleus(letters: &[Letter]) -> Option<(Range<usize>, bool)> {
    let end = letters
        .iter()
        .position(|l| !l.is_alpha())
        .unwrap_or(letters.len());
    let syl = parse(&letters[..end])?;
    if syl.vowels.is_empty() {
        return None;
    }
    Some((syl.vowels.clone(), !syl.coda.is_empty()))
}

/// Position of the letter that carries the tone mark.
pub fn tone_position(letters: &[Letter], modern: bool) -> Option<usize> {
    let (run, has_coda) = nucleus(letters)?;
    let len = run.len();
    if len == 1 {
        return Some(run.start);
    }
    if let Some(i) = run
        .clone()
        .rev()
        .find(|&i| letters[i].diacritic != Diacritic::None)
    {
        return Some(i);
    }
    if has_coda {
        return Some(run.end - 1);
    }
    if len >= 3 {
        return Some(run.start + 1);
    }
    let pair: String = letters[run.clone()].iter().map(|l| l.base()).collect();
    if MEDIAL_PAIRS.contains(&pair.as_str()) && modern {
        return Some(run.start + 1);
    }
    Some(run.start)
}

/// Whether `letters` is empty or a bare onset that can take a horned
/// `vowel` (`u` or `o`) next: "nh" + w gives "như", "t" + [ gives "tơ".
pub fn accepts_bare_horn(letters: &[Letter], vowel: char) -> bool {
    if letters.is_empty() {
        return true;
    }
    if letters.iter().any(|l| l.is_vowel() || !l.is_alpha()) {
        return false;
    }
    let initial: String = letters.iter().map(|l| l.base()).collect();
    INITIALS.contains(&initial.as_str()) && spelling_ok(&initial, vowel)
}
