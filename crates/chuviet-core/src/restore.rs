//! English auto-restore.
//!
//! Runs at a word boundary on words the engine transformed. A policy
//! decides whether the ASCII keystrokes were meant as an English word.

use crate::buffer::Letter;
use crate::chars::{Diacritic, Tone};
use crate::phonology;
use std::collections::HashSet;

/// A finished word as seen by a restore policy.
#[derive(Debug, Clone, Copy)]
pub struct WordSnapshot<'a> {
    /// Keystrokes as typed.
    pub raw: &'a str,
    /// Text currently on screen.
    pub composed: &'a str,
    pub letters: &'a [Letter],
    pub tone: Tone,
}

impl WordSnapshot<'_> {
    /// Whether any vowel carries a diacritic or a `d` is stroked.
    pub fn has_marks(&self) -> bool {
        self.letters
            .iter()
            .any(|l| l.diacritic != Diacritic::None || l.stroke)
    }
}

/// Decides whether a transformed word goes back to its keystrokes.
pub trait RestorePolicy: Send {
    fn should_restore(&self, word: &WordSnapshot<'_>) -> bool;
}

lazy_static::lazy_static! {
    /// Common English words that also compose into valid Vietnamese.
    static ref COMMON_ENGLISH: HashSet<&'static str> = [
        "as", "is", "us", "if", "of", "or", "nor", "its", "this", "his", "has", "was", "bus",
        "gas", "yes", "box", "mix", "six", "tax", "max", "sex", "hex", "lax", "ox", "ax", "ex",
        "car", "bar", "tar", "mar", "her", "per", "sir", "door", "poor", "see", "tree", "bee",
        "too", "moon", "soon", "noon", "boom", "room", "these", "those", "case", "base", "rose",
        "nose", "use", "user", "sax", "saas", "mass", "less", "boss", "loss", "miss", "kiss",
        "pass", "class", "glass", "cross", "dress", "press", "stress", "access", "across",
        "lots", "hits", "bits", "sits", "cats", "hats", "mats", "rats", "pets", "bets", "sets",
        "nets", "tips", "tops", "cups", "maps", "caps", "laps", "ships", "shops", "stops",
        "text", "next", "best", "test", "rest", "nest", "most", "just", "must", "last", "past",
        "cast", "vast", "list", "mist", "cost", "lost", "host", "post", "bust", "dust", "rust",
        "expect", "export", "express", "extra", "luxury", "issue", "core", "care", "more",
        "sure", "pure", "cure", "here", "there", "where", "were", "mere", "bare", "dare",
        "rare", "hire", "tire", "sire", "bore", "sore", "tore", "store", "score", "share",
    ]
    .into_iter()
    .collect();
}

/// Stops that follow a consumed `s`/`x` in English clusters (test, text).
const STOP_AFTER_SIBILANT: &[&str] = &["st", "sp", "sk", "sc", "xt", "xp", "xc"];

/// Default policy: a built-in word list plus structural signals.
#[derive(Debug, Clone, Default)]
pub struct EnglishHeuristic;

impl EnglishHeuristic {
    fn in_word_list(raw: &str) -> bool {
        COMMON_ENGLISH.contains(raw.to_ascii_lowercase().as_str())
    }

    /// A consumed sibilant tone key right before a stop consonant, on a
    /// word without vowel marks.
    fn sibilant_stop(word: &WordSnapshot<'_>) -> bool {
        if word.has_marks() || word.tone == Tone::Level {
            return false;
        }
        let raw = word.raw.to_ascii_lowercase();
        let consumed = raw.chars().count() > word.composed.chars().count();
        consumed && STOP_AFTER_SIBILANT.iter().any(|p| raw.contains(p))
    }
}

impl RestorePolicy for EnglishHeuristic {
    fn should_restore(&self, word: &WordSnapshot<'_>) -> bool {
        if word.raw.is_empty() || !word.raw.chars().all(|c| c.is_ascii_alphabetic()) {
            return false;
        }
        if word.raw == word.composed {
            return false;
        }
        Self::in_word_list(word.raw)
            || !phonology::is_valid_word(word.letters, word.tone)
            || Self::sibilant_stop(word)
    }
}
