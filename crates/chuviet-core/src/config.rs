use crate::scheme::Method;
use crate::toggle::ToggleShortcut;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Engine flags set by the control surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(default)]
    pub method: Method,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Modern tone placement ("hoà", "uỷ") instead of classic ("hòa", "ủy").
    #[serde(default = "default_true")]
    pub modern_tone: bool,
    /// Keep a bare Telex `w` literal instead of turning it into `ư`.
    #[serde(default)]
    pub skip_w_shortcut: bool,
    /// Escape reverts the transformed word to its keystrokes.
    #[serde(default)]
    pub esc_restore: bool,
    #[serde(default)]
    pub english_auto_restore: bool,
    /// Uppercase the first letter after `.`, `!`, `?` and a space, or
    /// after Enter.
    #[serde(default)]
    pub auto_capitalize: bool,
    /// Telex `]` types `ư` and `[` types `ơ`.
    #[serde(default)]
    pub bracket_shortcut: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            method: Method::Telex,
            enabled: true,
            modern_tone: true,
            skip_w_shortcut: false,
            esc_restore: false,
            english_auto_restore: false,
            auto_capitalize: false,
            bracket_shortcut: false,
        }
    }
}

/// A user abbreviation as stored by the settings shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutEntry {
    pub trigger: String,
    pub replacement: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ShortcutEntry {
    pub fn new(trigger: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            replacement: replacement.into(),
            enabled: true,
        }
    }
}

/// Everything the shell persists and hands to the core on startup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub toggle: ToggleShortcut,
    #[serde(default)]
    pub shortcuts: Vec<ShortcutEntry>,
    #[serde(default)]
    pub excluded_apps: Vec<String>,
    #[serde(default)]
    pub smart_mode: bool,
    #[serde(default)]
    pub per_app_modes: HashMap<String, bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Modifiers;

    #[test]
    fn empty_document_gives_defaults() {
        let s: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, Settings::default());
        assert!(s.engine.enabled);
        assert!(s.engine.modern_tone);
        assert!(!s.engine.auto_capitalize);
        assert!(!s.engine.bracket_shortcut);
        assert_eq!(s.engine.method, Method::Telex);
        assert_eq!(s.toggle.key, None);
        assert_eq!(s.toggle.modifiers, Modifiers::CTRL | Modifiers::SHIFT);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let json = r#"{
            "method": "vni",
            "modern_tone": false,
            "bracket_shortcut": true,
            "shortcuts": [{ "trigger": "vn", "replacement": "Việt Nam" }],
            "excluded_apps": ["code.exe"]
        }"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.engine.method, Method::Vni);
        assert!(!s.engine.modern_tone);
        assert!(s.engine.enabled);
        assert!(s.engine.bracket_shortcut);
        assert!(!s.engine.auto_capitalize);
        assert!(s.shortcuts[0].enabled);
        assert_eq!(s.excluded_apps, vec!["code.exe".to_string()]);
    }
}
