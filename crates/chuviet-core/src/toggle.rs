//! Enable/disable shortcut detection.

use crate::types::Modifiers;
use serde::{Deserialize, Serialize};

/// Shortcut that flips the engine on and off.
///
/// With `key = None` the shortcut is a modifier-only chord that fires on
/// release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleShortcut {
    pub key: Option<u16>,
    /// Bitmask of [`Modifiers::CTRL`], `ALT`, `SHIFT`, `META`.
    pub modifiers: u8,
}

impl Default for ToggleShortcut {
    fn default() -> Self {
        Self {
            key: None,
            modifiers: Modifiers::CTRL | Modifiers::SHIFT,
        }
    }
}

impl ToggleShortcut {
    pub fn is_chord_only(&self) -> bool {
        self.key.is_none()
    }

    /// Required modifiers must all be held. Meta must be absent unless the
    /// shortcut asks for it.
    pub fn modifiers_match(&self, live: u8) -> bool {
        let required = self.modifiers;
        if live & required != required {
            return false;
        }
        if required & Modifiers::META == 0 && live & Modifiers::META != 0 {
            return false;
        }
        true
    }

    /// Whether a key-down with the given live modifier bits is this shortcut.
    pub fn matches(&self, key: u16, live: u8) -> bool {
        self.key == Some(key) && self.modifiers_match(live)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ChordState {
    #[default]
    Idle,
    Armed,
    /// An ordinary key went down while armed. Stays here until every chord
    /// modifier is released.
    Cancelled,
}

/// Tracks a modifier-only chord such as Ctrl+Shift.
#[derive(Debug, Clone, Default)]
pub struct ChordTracker {
    state: ChordState,
}

impl ChordTracker {
    /// Feeds the current modifier state. Returns true when the toggle fires.
    pub fn on_modifiers(&mut self, shortcut: &ToggleShortcut, live: u8) -> bool {
        if !shortcut.is_chord_only() || shortcut.modifiers == 0 {
            self.state = ChordState::Idle;
            return false;
        }
        let held = shortcut.modifiers_match(live);
        let any_chord_key = live & shortcut.modifiers != 0;
        match self.state {
            ChordState::Idle if held => {
                self.state = ChordState::Armed;
                false
            }
            ChordState::Armed if !held => {
                self.state = if any_chord_key {
                    // Fired on the first release; wait for the rest.
                    ChordState::Cancelled
                } else {
                    ChordState::Idle
                };
                true
            }
            ChordState::Cancelled if !any_chord_key => {
                self.state = ChordState::Idle;
                false
            }
            _ => false,
        }
    }

    /// Any ordinary key press cancels a pending chord.
    pub fn on_key_down(&mut self) {
        if self.state == ChordState::Armed {
            self.state = ChordState::Cancelled;
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state == ChordState::Armed
    }
}
