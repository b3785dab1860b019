use crate::chars::{self, Diacritic, Tone};
use crate::keys;
use crate::phonology;

/// Maximum number of letters in one word. Matches the wire result capacity.
pub const MAX_LEN: usize = 64;

/// Steps remembered for revert.
const HISTORY_LEN: usize = 16;

/// One typed base letter with the marks applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letter {
    pub key: u16,
    pub upper: bool,
    pub diacritic: Diacritic,
    pub stroke: bool,
}

impl Letter {
    pub fn new(key: u16, upper: bool) -> Self {
        Self {
            key,
            upper,
            diacritic: Diacritic::None,
            stroke: false,
        }
    }

    /// Lowercase ASCII base, or NUL for a key outside letters and digits.
    pub fn base(&self) -> char {
        keys::to_char(self.key).unwrap_or('\0')
    }

    pub fn is_vowel(&self) -> bool {
        keys::is_vowel_key(self.key)
    }

    pub fn is_alpha(&self) -> bool {
        keys::is_letter(self.key)
    }

    fn render(&self, tone: Tone) -> char {
        let base = self.base();
        let c = if self.is_vowel() {
            chars::compose(base, self.diacritic, tone).unwrap_or(base)
        } else if self.stroke {
            chars::D_STROKE
        } else {
            base
        };
        chars::with_case(c, self.upper)
    }
}

/// A modification applied by one keystroke, kept so the same key can
/// undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Literal { key: u16 },
    /// Tone set by `key`, with diacritics implied by it (iê before a coda).
    Tone { key: u16, previous: Tone, implied: Vec<(usize, Diacritic)> },
    /// Diacritics replaced at the given positions, with their old values.
    Diacritic { key: u16, changes: Vec<(usize, Diacritic)> },
    Stroke { key: u16, pos: usize },
    /// A bare `ư` inserted at `pos`.
    BareHorn { key: u16, pos: usize },
    /// A marks-clearing key that changed the word.
    Clear { key: u16, previous: Tone, changes: Vec<(usize, Diacritic)> },
    /// The previous step by `key` was undone.
    Reverted { key: u16 },
}

impl Step {
    pub fn key(&self) -> u16 {
        match *self {
            Step::Literal { key }
            | Step::Tone { key, .. }
            | Step::Diacritic { key, .. }
            | Step::Stroke { key, .. }
            | Step::BareHorn { key, .. }
            | Step::Clear { key, .. }
            | Step::Reverted { key } => key,
        }
    }
}

/// The word currently being typed.
#[derive(Debug, Clone, Default)]
pub struct CompositionBuffer {
    letters: Vec<Letter>,
    tone: Tone,
    history: Vec<Step>,
    /// Keystrokes as typed, for restoring the ASCII form.
    raw: Vec<char>,
    /// False once the raw keystrokes no longer describe the word (after a
    /// backspace or a capacity reset).
    raw_reliable: bool,
    /// Set once "ww" was reverted; `w` stays literal for the rest of the word.
    horn_suppressed: bool,
}

impl CompositionBuffer {
    pub fn new() -> Self {
        Self {
            raw_reliable: true,
            ..Self::default()
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_full(&self) -> bool {
        self.letters.len() >= MAX_LEN
    }

    pub fn letters(&self) -> &[Letter] {
        &self.letters
    }

    pub fn letters_mut(&mut self) -> &mut [Letter] {
        &mut self.letters
    }

    pub fn last(&self) -> Option<&Letter> {
        self.letters.last()
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn set_tone(&mut self, tone: Tone) {
        self.tone = tone;
    }

    pub fn has_vowel(&self) -> bool {
        self.letters.iter().any(Letter::is_vowel)
    }

    /// Whether any vowel carries a diacritic or a `d` is stroked.
    pub fn has_marks(&self) -> bool {
        self.letters
            .iter()
            .any(|l| l.diacritic != Diacritic::None || l.stroke)
    }

    /// Appends a letter. Returns false when the word is at capacity.
    pub fn push(&mut self, letter: Letter) -> bool {
        if self.is_full() {
            return false;
        }
        self.letters.push(letter);
        true
    }

    pub fn insert(&mut self, pos: usize, letter: Letter) {
        if !self.is_full() && pos <= self.letters.len() {
            self.letters.insert(pos, letter);
        }
    }

    pub fn remove(&mut self, pos: usize) -> Option<Letter> {
        (pos < self.letters.len()).then(|| self.letters.remove(pos))
    }

    /// Drops the last letter. The tone goes with it once no vowel is left.
    pub fn pop(&mut self) -> Option<Letter> {
        let letter = self.letters.pop()?;
        if !self.has_vowel() {
            self.tone = Tone::Level;
        }
        self.history.clear();
        self.raw_reliable = false;
        Some(letter)
    }

    pub fn record(&mut self, step: Step) {
        if self.history.len() == HISTORY_LEN {
            self.history.remove(0);
        }
        self.history.push(step);
    }

    pub fn last_step(&self) -> Option<&Step> {
        self.history.last()
    }

    /// Undoes the most recent modification step. Literal steps are not
    /// undoable and are left in place.
    pub fn undo_last(&mut self) -> bool {
        let Some(step) = self.history.last().cloned() else {
            return false;
        };
        match step {
            Step::Tone {
                previous, implied, ..
            } => {
                self.tone = previous;
                self.restore_diacritics(&implied);
            }
            Step::Diacritic { changes, .. } => self.restore_diacritics(&changes),
            Step::Stroke { pos, .. } => {
                if let Some(l) = self.letters.get_mut(pos) {
                    l.stroke = false;
                }
            }
            Step::BareHorn { pos, .. } => {
                self.remove(pos);
            }
            Step::Clear { previous, changes, .. } => {
                self.tone = previous;
                self.restore_diacritics(&changes);
            }
            Step::Literal { .. } | Step::Reverted { .. } => return false,
        }
        self.history.pop();
        true
    }

    fn restore_diacritics(&mut self, changes: &[(usize, Diacritic)]) {
        for &(pos, old) in changes {
            if let Some(l) = self.letters.get_mut(pos) {
                l.diacritic = old;
            }
        }
    }

    pub fn push_raw(&mut self, c: char) {
        if self.raw.len() < MAX_LEN {
            self.raw.push(c);
        } else {
            self.raw_reliable = false;
        }
    }

    /// Raw keystrokes, if they still describe the word.
    pub fn raw(&self) -> Option<String> {
        self.raw_reliable.then(|| self.raw.iter().collect())
    }

    pub fn raw_chars(&self) -> &[char] {
        &self.raw
    }

    pub fn horn_suppressed(&self) -> bool {
        self.horn_suppressed
    }

    pub fn suppress_horn(&mut self) {
        self.horn_suppressed = true;
    }

    /// Visible text of the word.
    pub fn render(&self, modern: bool) -> Vec<char> {
        let tone_at = if self.tone == Tone::Level {
            None
        } else {
            phonology::tone_position(&self.letters, modern)
        };
        self.letters
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let tone = if Some(i) == tone_at {
                    self.tone
                } else {
                    Tone::Level
                };
                l.render(tone)
            })
            .collect()
    }

    pub fn render_string(&self, modern: bool) -> String {
        self.render(modern).into_iter().collect()
    }
}
