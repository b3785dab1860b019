//! Per-application injection timing.

use std::time::Duration;

/// How the old text is removed before the replacement is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technique {
    /// One Backspace per character.
    Backspace,
    /// Shift+Left per character, then overtype the selection.
    Selection,
}

/// Role of the focused UI element, where the platform reports one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusRole {
    ComboBox,
    TextField,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    pub name: &'static str,
    pub technique: Technique,
    /// Delay after each delete key.
    pub key_delay: Duration,
    /// Delay between the last delete and the first inserted chunk.
    pub settle_delay: Duration,
    /// Delay after each inserted chunk.
    pub chunk_delay: Duration,
    /// Pause after the whole sequence before the next one may start.
    pub final_settle: Duration,
}

const fn profile(
    name: &'static str,
    technique: Technique,
    key_us: u64,
    settle_us: u64,
    chunk_us: u64,
    final_ms: u64,
) -> TimingProfile {
    TimingProfile {
        name,
        technique,
        key_delay: Duration::from_micros(key_us),
        settle_delay: Duration::from_micros(settle_us),
        chunk_delay: Duration::from_micros(chunk_us),
        final_settle: Duration::from_millis(final_ms),
    }
}

pub const FAST: TimingProfile = profile("fast", Technique::Backspace, 200, 800, 500, 5);
pub const TERMINAL: TimingProfile = profile("terminal", Technique::Backspace, 1500, 3000, 2000, 20);
pub const WARP: TimingProfile = profile("warp", Technique::Backspace, 3000, 8000, 3000, 20);
pub const ELECTRON: TimingProfile =
    profile("electron", Technique::Backspace, 8000, 15000, 8000, 20);
pub const SELECTION: TimingProfile = profile("selection", Technique::Selection, 1000, 3000, 2000, 5);

#[derive(Debug, Clone, Copy)]
enum Match {
    Exact(&'static str),
    Prefix(&'static str),
}

struct AppRule {
    app: Match,
    /// Rule applies only when the focused element has this role.
    role: Option<FocusRole>,
    profile: TimingProfile,
}

const fn rule(app: Match, role: Option<FocusRole>, profile: TimingProfile) -> AppRule {
    AppRule { app, role, profile }
}

use FocusRole::TextField;
use Match::{Exact, Prefix};

/// First match wins. Identifiers are Windows image names or macOS bundle ids.
static APP_RULES: &[AppRule] = &[
    // Browser address and search fields autocomplete under a backspace.
    rule(Exact("chrome.exe"), Some(TextField), SELECTION),
    rule(Exact("msedge.exe"), Some(TextField), SELECTION),
    rule(Exact("firefox.exe"), Some(TextField), SELECTION),
    rule(Exact("brave.exe"), Some(TextField), SELECTION),
    rule(Exact("com.google.chrome"), Some(TextField), SELECTION),
    rule(Exact("com.microsoft.edgemac"), Some(TextField), SELECTION),
    rule(Exact("org.mozilla.firefox"), Some(TextField), SELECTION),
    rule(Exact("com.brave.browser"), Some(TextField), SELECTION),
    rule(Exact("com.apple.safari"), Some(TextField), SELECTION),
    rule(Exact("company.thebrowser.browser"), Some(TextField), SELECTION),
    // IDE inline rename.
    rule(Prefix("com.jetbrains."), Some(TextField), SELECTION),
    rule(Prefix("idea"), Some(TextField), SELECTION),
    rule(Prefix("pycharm"), Some(TextField), SELECTION),
    rule(Prefix("rider"), Some(TextField), SELECTION),
    // Spreadsheet and word-processor cells.
    rule(Exact("excel.exe"), None, SELECTION),
    rule(Exact("winword.exe"), None, SELECTION),
    rule(Exact("com.microsoft.excel"), None, SELECTION),
    rule(Exact("com.microsoft.word"), None, SELECTION),
    // Terminals.
    rule(Exact("dev.warp.warp-stable"), None, WARP),
    rule(Exact("warp.exe"), None, WARP),
    rule(Exact("windowsterminal.exe"), None, TERMINAL),
    rule(Exact("conhost.exe"), None, TERMINAL),
    rule(Exact("cmd.exe"), None, TERMINAL),
    rule(Exact("powershell.exe"), None, TERMINAL),
    rule(Exact("wezterm-gui.exe"), None, TERMINAL),
    rule(Exact("alacritty.exe"), None, TERMINAL),
    rule(Exact("mintty.exe"), None, TERMINAL),
    rule(Exact("com.apple.terminal"), None, TERMINAL),
    rule(Exact("com.googlecode.iterm2"), None, TERMINAL),
    rule(Exact("net.kovidgoyal.kitty"), None, TERMINAL),
    rule(Exact("io.alacritty"), None, TERMINAL),
    rule(Exact("com.github.wez.wezterm"), None, TERMINAL),
    // Electron editors and chat clients.
    rule(Exact("code.exe"), None, ELECTRON),
    rule(Exact("cursor.exe"), None, ELECTRON),
    rule(Exact("claude.exe"), None, ELECTRON),
    rule(Exact("slack.exe"), None, ELECTRON),
    rule(Exact("discord.exe"), None, ELECTRON),
    rule(Exact("notion.exe"), None, ELECTRON),
    rule(Exact("com.microsoft.vscode"), None, ELECTRON),
    rule(Prefix("com.todesktop."), None, ELECTRON),
    rule(Exact("com.anthropic.claudefordesktop"), None, ELECTRON),
    rule(Exact("com.tinyspeck.slackmacgap"), None, ELECTRON),
    rule(Exact("com.hnc.discord"), None, ELECTRON),
    rule(Exact("notion.id"), None, ELECTRON),
];

impl AppRule {
    fn matches(&self, app: &str, role: FocusRole) -> bool {
        let name_ok = match self.app {
            Exact(name) => app == name,
            Prefix(prefix) => app.starts_with(prefix),
        };
        name_ok && self.role.map_or(true, |r| r == role)
    }
}

/// Profile for the focused application. A combo box anywhere gets the
/// selection technique.
pub fn profile_for(app: Option<&str>, role: FocusRole) -> TimingProfile {
    if role == FocusRole::ComboBox {
        return SELECTION;
    }
    let Some(app) = app else {
        return FAST;
    };
    let app = app.to_ascii_lowercase();
    APP_RULES
        .iter()
        .find(|r| r.matches(&app, role))
        .map_or(FAST, |r| r.profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_apps_get_fast() {
        assert_eq!(profile_for(Some("notepad.exe"), FocusRole::TextField), FAST);
        assert_eq!(profile_for(None, FocusRole::Unknown), FAST);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(profile_for(Some("WindowsTerminal.exe"), FocusRole::Unknown), TERMINAL);
        assert_eq!(profile_for(Some("com.apple.Terminal"), FocusRole::Unknown), TERMINAL);
        assert_eq!(profile_for(Some("dev.warp.Warp-Stable"), FocusRole::Unknown), WARP);
        assert_eq!(profile_for(Some("Code.exe"), FocusRole::Unknown), ELECTRON);
    }

    #[test]
    fn browser_fields_use_selection_only_with_text_focus() {
        assert_eq!(
            profile_for(Some("chrome.exe"), FocusRole::TextField).technique,
            Technique::Selection
        );
        assert_eq!(profile_for(Some("chrome.exe"), FocusRole::Unknown), FAST);
    }

    #[test]
    fn prefix_rules_and_combo_boxes() {
        assert_eq!(
            profile_for(Some("com.jetbrains.intellij"), FocusRole::TextField),
            SELECTION
        );
        assert_eq!(profile_for(Some("com.todesktop.230313mzl4w4u92"), FocusRole::Unknown), ELECTRON);
        assert_eq!(profile_for(Some("notepad.exe"), FocusRole::ComboBox), SELECTION);
        assert_eq!(profile_for(Some("EXCEL.EXE"), FocusRole::Unknown), SELECTION);
    }

    #[test]
    fn profile_delays() {
        assert_eq!(FAST.key_delay, Duration::from_micros(200));
        assert_eq!(ELECTRON.settle_delay, Duration::from_micros(15000));
        assert_eq!(SELECTION.key_delay, Duration::from_millis(1));
        assert_eq!(TERMINAL.final_settle, Duration::from_millis(20));
    }
}
