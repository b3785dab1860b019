//! Sentence tracking for automatic capitalization.

use crate::keys::{self, VK_RETURN, VK_SPACE, VK_TAB};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SentenceState {
    #[default]
    Idle,
    /// `.`, `!` or `?` just typed; a space must follow.
    Ended,
    /// The next letter starts a sentence.
    Pending,
}

/// Watches the keys between words and decides whether the next word starts
/// a sentence. "x.y" and "1.5" never qualify: a space or Enter must come
/// after the punctuation.
#[derive(Debug, Clone, Default)]
pub struct SentenceTracker {
    state: SentenceState,
    /// The current word's first letter was capitalized by us.
    capitalized: bool,
}

fn is_navigation(key: u16) -> bool {
    matches!(
        key,
        keys::VK_PRIOR
            | keys::VK_NEXT
            | keys::VK_END
            | keys::VK_HOME
            | keys::VK_LEFT
            | keys::VK_UP
            | keys::VK_RIGHT
            | keys::VK_DOWN
    )
}

impl SentenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_pending(&self) -> bool {
        self.state == SentenceState::Pending
    }

    /// Feeds a key that is not part of a word.
    pub fn on_separator(&mut self, key: u16, shift: bool) {
        self.capitalized = false;
        if is_navigation(key) {
            return;
        }
        self.state = match (self.state, key) {
            _ if keys::is_sentence_end(key, shift) => SentenceState::Ended,
            (_, VK_RETURN) => SentenceState::Pending,
            (SentenceState::Ended | SentenceState::Pending, VK_SPACE | VK_TAB) => {
                SentenceState::Pending
            }
            (SentenceState::Pending, _) if keys::is_opening_punct(key, shift) => {
                SentenceState::Pending
            }
            _ => SentenceState::Idle,
        };
    }

    /// First key of a word. Returns true when a letter should be
    /// capitalized; digits end the pending state.
    pub fn on_word_start(&mut self, letter: bool) -> bool {
        let pending = letter && self.state == SentenceState::Pending;
        self.state = SentenceState::Idle;
        self.capitalized = pending;
        pending
    }

    /// The word was erased back to nothing. A word we capitalized gives
    /// the pending state back, so retyping capitalizes again.
    pub fn on_word_erased(&mut self) {
        if self.capitalized {
            self.capitalized = false;
            self.state = SentenceState::Pending;
        }
    }
}
