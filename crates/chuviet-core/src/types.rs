use crate::keys;
use serde::{Deserialize, Serialize};

/// Capacity of [`TransformResult::chars`].
pub const MAX_RESULT_CHARS: usize = 64;

/// What the caller should do with the keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Action {
    /// Let the original keystroke through.
    None = 0,
    /// Delete `backspace` chars before the caret, then insert `chars`.
    Send = 1,
    /// Same as `Send`, restoring the ASCII keystrokes of the word.
    Restore = 2,
}

/// Engine output for one keystroke. The layout is the FFI contract and
/// must not change: 64 scalars, then action, backspace, count, padding.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct TransformResult {
    pub chars: [u32; MAX_RESULT_CHARS],
    pub action: u8,
    pub backspace: u8,
    pub count: u8,
    pub _pad: u8,
}

const _: () = assert!(std::mem::size_of::<TransformResult>() == 260);

impl TransformResult {
    pub const fn none() -> Self {
        Self {
            chars: [0; MAX_RESULT_CHARS],
            action: Action::None as u8,
            backspace: 0,
            count: 0,
            _pad: 0,
        }
    }

    /// Builds a result, clamping both lengths to the wire capacity.
    pub fn new(action: Action, backspace: usize, text: &[char]) -> Self {
        let mut r = Self::none();
        r.action = action as u8;
        r.backspace = backspace.min(MAX_RESULT_CHARS) as u8;
        for (slot, c) in r.chars.iter_mut().zip(text) {
            *slot = *c as u32;
        }
        r.count = text.len().min(MAX_RESULT_CHARS) as u8;
        r
    }

    pub fn action(&self) -> Action {
        match self.action {
            1 => Action::Send,
            2 => Action::Restore,
            _ => Action::None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.action() == Action::None
    }

    pub fn backspace(&self) -> usize {
        self.backspace as usize
    }

    /// Replacement text. Invalid scalars are skipped.
    pub fn text(&self) -> String {
        self.chars[..self.count as usize]
            .iter()
            .filter_map(|&u| char::from_u32(u))
            .collect()
    }
}

impl Default for TransformResult {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for TransformResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformResult")
            .field("action", &self.action())
            .field("backspace", &self.backspace)
            .field("text", &self.text())
            .finish()
    }
}

/// Modifier keys held during a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub win: bool,
}

impl Modifiers {
    pub const CTRL: u8 = 1;
    pub const ALT: u8 = 2;
    pub const SHIFT: u8 = 4;
    pub const META: u8 = 8;

    pub const fn none() -> Self {
        Self {
            ctrl: false,
            shift: false,
            alt: false,
            win: false,
        }
    }

    pub const fn is_empty(self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.win)
    }

    pub const fn bits(self) -> u8 {
        (self.ctrl as u8) * Self::CTRL
            | (self.alt as u8) * Self::ALT
            | (self.shift as u8) * Self::SHIFT
            | (self.win as u8) * Self::META
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self {
            ctrl: bits & Self::CTRL != 0,
            shift: bits & Self::SHIFT != 0,
            alt: bits & Self::ALT != 0,
            win: bits & Self::META != 0,
        }
    }

    /// Ctrl, Alt or Win: the keystroke is a command, not text.
    pub const fn is_chord(self) -> bool {
        self.ctrl || self.alt || self.win
    }

    pub const fn with_shift(shift: bool) -> Self {
        Self {
            shift,
            ..Self::none()
        }
    }

    /// Virtual keys to hold around a synthetic keystroke, in press order.
    pub fn held_keys(self) -> Vec<u16> {
        [
            (self.ctrl, keys::VK_CONTROL),
            (self.alt, keys::VK_MENU),
            (self.shift, keys::VK_SHIFT),
            (self.win, keys::VK_LWIN),
        ]
        .into_iter()
        .filter_map(|(held, vk)| held.then_some(vk))
        .collect()
    }
}

/// Synthetic input handed to a key sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Virtual-key press or release, wrapped in the given modifiers.
    Key {
        vk: u16,
        up: bool,
        modifiers: Modifiers,
    },
    /// One chunk of Unicode text, typed as press/release pairs.
    Text(String),
}

/// Decision returned to the OS hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookVerdict {
    Pass,
    Block,
}
