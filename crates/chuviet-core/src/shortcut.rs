use crate::config::ShortcutEntry;
use crate::types::MAX_RESULT_CHARS;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShortcutError {
    #[error("shortcut trigger is empty")]
    EmptyTrigger,
    #[error("shortcut trigger is longer than {MAX_RESULT_CHARS} characters")]
    TriggerTooLong,
    #[error("shortcut replacement is empty")]
    EmptyReplacement,
}

/// Abbreviations expanded at a word boundary. Triggers are stored
/// lowercase; the last registration of a trigger wins.
#[derive(Debug, Clone, Default)]
pub struct ShortcutTable {
    map: HashMap<String, String>,
}

impl ShortcutTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, trigger: &str, replacement: &str) -> Result<(), ShortcutError> {
        let trigger = trigger.trim();
        if trigger.is_empty() {
            return Err(ShortcutError::EmptyTrigger);
        }
        if trigger.chars().count() > MAX_RESULT_CHARS {
            return Err(ShortcutError::TriggerTooLong);
        }
        if replacement.is_empty() {
            return Err(ShortcutError::EmptyReplacement);
        }
        let replacement: String = if replacement.chars().count() > MAX_RESULT_CHARS {
            warn!(
                "Shortcut '{}' replacement truncated to {} characters",
                trigger, MAX_RESULT_CHARS
            );
            replacement.chars().take(MAX_RESULT_CHARS).collect()
        } else {
            replacement.to_string()
        };
        self.map.insert(trigger.to_lowercase(), replacement);
        Ok(())
    }

    pub fn remove(&mut self, trigger: &str) -> bool {
        self.map.remove(&trigger.trim().to_lowercase()).is_some()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Replaces the whole table with the enabled entries.
    pub fn sync(&mut self, entries: &[ShortcutEntry]) {
        self.clear();
        for e in entries.iter().filter(|e| e.enabled) {
            if let Err(err) = self.add(&e.trigger, &e.replacement) {
                warn!("Skipping shortcut '{}': {}", e.trigger, err);
            }
        }
        debug!("Shortcut table synced: {} entries", self.map.len());
    }

    /// Looks up `typed` and adapts the replacement to its case.
    pub fn expand(&self, typed: &str) -> Option<String> {
        if typed.is_empty() {
            return None;
        }
        let replacement = self.map.get(&typed.to_lowercase())?;
        Some(adapt_case(typed, replacement))
    }
}

/// "VN" → "VIỆT NAM", "Vn" → "Việt Nam" style, anything else verbatim.
fn adapt_case(typed: &str, replacement: &str) -> String {
    let letters: Vec<char> = typed.chars().filter(|c| c.is_alphabetic()).collect();
    let all_upper = letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase());
    if all_upper {
        return replacement.to_uppercase();
    }
    let first_upper = letters.first().is_some_and(|c| c.is_uppercase());
    if first_upper {
        let mut chars = replacement.chars();
        if let Some(first) = chars.next() {
            return first.to_uppercase().chain(chars).collect();
        }
    }
    replacement.to_string()
}

/// Parses a shortcut list exported by a settings shell or a legacy tool.
///
/// One entry per line, `trigger<TAB>replacement` or `trigger=replacement`.
/// Lines starting with `;` or `#` are comments and a leading `!` marks a
/// disabled entry.
pub fn parse_shortcut_list(raw: &[u8]) -> Result<Vec<ShortcutEntry>> {
    let text = decode_list_bytes(raw);
    let mut entries = Vec::new();
    for (no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        let (enabled, line) = match line.strip_prefix('!') {
            Some(rest) => (false, rest),
            None => (true, line),
        };
        let (trigger, replacement) = line
            .split_once('\t')
            .or_else(|| line.split_once('='))
            .with_context(|| format!("line {}: missing separator", no + 1))?;
        let trigger = trigger.trim();
        let replacement = replacement.trim();
        if trigger.is_empty() || replacement.is_empty() {
            warn!("line {}: empty trigger or replacement, skipped", no + 1);
            continue;
        }
        entries.push(ShortcutEntry {
            trigger: trigger.to_string(),
            replacement: replacement.to_string(),
            enabled,
        });
    }
    Ok(entries)
}

fn decode_list_bytes(raw: &[u8]) -> Cow<'_, str> {
    if let Some((enc, bom_len)) = encoding_rs::Encoding::for_bom(raw) {
        debug!("Shortcut list decoded using BOM: {}", enc.name());
        let (cow, _, had_errors) = enc.decode(&raw[bom_len..]);
        if had_errors {
            warn!("Shortcut list decode had errors (replacement characters used)");
        }
        return cow;
    }
    match std::str::from_utf8(raw) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            debug!("UTF-8 decode failed, falling back to Windows-1258");
            let (cow, _, had_errors) = encoding_rs::WINDOWS_1258.decode(raw);
            if had_errors {
                warn!("Windows-1258 decode had errors");
            }
            cow
        }
    }
}
