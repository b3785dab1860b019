use crate::buffer::{CompositionBuffer, Letter, Step};
use crate::capitalize::SentenceTracker;
use crate::chars::{self, Diacritic, Tone};
use crate::config::{EngineConfig, ShortcutEntry};
use crate::keys::{self, VK_BACK, VK_ESCAPE};
use crate::phonology;
use crate::restore::{EnglishHeuristic, RestorePolicy, WordSnapshot};
use crate::scheme::{self, Method, Modifier};
use crate::shortcut::{ShortcutError, ShortcutTable};
use crate::types::{Action, TransformResult};
use tracing::debug;

/// Keystroke-to-text state machine for one word at a time.
pub struct Engine {
    config: EngineConfig,
    buffer: CompositionBuffer,
    shortcuts: ShortcutTable,
    sentence: SentenceTracker,
    restore_policy: Box<dyn RestorePolicy>,
    on_enabled_change: Option<Box<dyn Fn(bool) + Send + Sync>>,
    on_method_change: Option<Box<dyn Fn(Method) + Send + Sync>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("buffer", &self.buffer)
            .field("shortcuts", &self.shortcuts.len())
            .finish()
    }
}

impl Engine {
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            buffer: CompositionBuffer::new(),
            shortcuts: ShortcutTable::new(),
            sentence: SentenceTracker::new(),
            restore_policy: Box::new(EnglishHeuristic),
            on_enabled_change: None,
            on_method_change: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replaces every flag at once, notifying on enabled/method changes.
    pub fn apply_config(&mut self, config: EngineConfig) {
        self.set_enabled(config.enabled);
        self.set_method(config.method);
        self.set_modern_tone(config.modern_tone);
        self.config.skip_w_shortcut = config.skip_w_shortcut;
        self.config.esc_restore = config.esc_restore;
        self.config.english_auto_restore = config.english_auto_restore;
        self.config.auto_capitalize = config.auto_capitalize;
        self.config.bracket_shortcut = config.bracket_shortcut;
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled != enabled {
            self.config.enabled = enabled;
            self.buffer.clear();
            self.sentence.reset();
            if let Some(ref cb) = self.on_enabled_change {
                cb(enabled);
            }
        }
    }

    pub fn set_on_enabled_change(&mut self, cb: impl Fn(bool) + Send + Sync + 'static) {
        self.on_enabled_change = Some(Box::new(cb));
    }

    pub fn set_on_method_change(&mut self, cb: impl Fn(Method) + Send + Sync + 'static) {
        self.on_method_change = Some(Box::new(cb));
    }

    pub fn method(&self) -> Method {
        self.config.method
    }

    pub fn set_method(&mut self, method: Method) {
        if self.config.method != method {
            self.config.method = method;
            self.buffer.clear();
            if let Some(ref cb) = self.on_method_change {
                cb(method);
            }
        }
    }

    pub fn set_modern_tone(&mut self, modern: bool) {
        if self.config.modern_tone != modern {
            self.config.modern_tone = modern;
            self.buffer.clear();
        }
    }

    pub fn set_skip_w_shortcut(&mut self, skip: bool) {
        self.config.skip_w_shortcut = skip;
    }

    pub fn set_esc_restore(&mut self, enabled: bool) {
        self.config.esc_restore = enabled;
    }

    pub fn set_english_auto_restore(&mut self, enabled: bool) {
        self.config.english_auto_restore = enabled;
    }

    pub fn set_auto_capitalize(&mut self, enabled: bool) {
        self.config.auto_capitalize = enabled;
        self.sentence.reset();
    }

    pub fn set_bracket_shortcut(&mut self, enabled: bool) {
        self.config.bracket_shortcut = enabled;
    }

    pub fn set_restore_policy(&mut self, policy: impl RestorePolicy + 'static) {
        self.restore_policy = Box::new(policy);
    }

    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
        self.sentence.reset();
    }

    pub fn buffer(&self) -> &CompositionBuffer {
        &self.buffer
    }

    pub fn add_shortcut(&mut self, trigger: &str, replacement: &str) -> Result<(), ShortcutError> {
        self.shortcuts.add(trigger, replacement)
    }

    pub fn remove_shortcut(&mut self, trigger: &str) -> bool {
        self.shortcuts.remove(trigger)
    }

    pub fn clear_shortcuts(&mut self) {
        self.shortcuts.clear();
    }

    pub fn sync_shortcuts(&mut self, entries: &[ShortcutEntry]) {
        self.shortcuts.sync(entries);
    }

    /// Processes one key-down. `caps` selects the uppercase letter; `shift`
    /// only matters for telling VNI digits from shifted symbols.
    pub fn process_key(&mut self, key: u16, caps: bool, ctrl: bool, shift: bool) -> TransformResult {
        if !self.config.enabled || ctrl {
            self.buffer.clear();
            self.sentence.reset();
            return TransformResult::none();
        }
        if key == VK_BACK {
            return self.on_backspace();
        }
        let word_key = scheme::is_word_key(self.config.method, key, shift)
            || self.bracket_vowel(key, shift).is_some();
        if !word_key {
            self.sentence.on_separator(key, shift);
        }
        if keys::is_boundary(key) {
            return self.on_boundary(key);
        }
        if !word_key {
            self.buffer.clear();
            return TransformResult::none();
        }
        self.on_word_key(key, caps, shift)
    }

    fn bracket_vowel(&self, key: u16, shift: bool) -> Option<char> {
        if !self.config.bracket_shortcut {
            return None;
        }
        scheme::bracket_vowel(self.config.method, key, shift)
    }

    fn render(&self) -> Vec<char> {
        self.buffer.render(self.config.modern_tone)
    }

    fn on_word_key(&mut self, key: u16, caps: bool, shift: bool) -> TransformResult {
        if self.buffer.is_full() {
            debug!("Word reached capacity, starting a new composition");
            self.buffer.clear();
        }
        let Some(c) = keys::to_char(key) else {
            return TransformResult::none();
        };
        let bracket = self.bracket_vowel(key, shift);
        // `typed` is what the key puts on screen by itself; `upper` is the
        // case the word gets.
        let typed = caps;
        let mut upper = caps;
        if self.buffer.is_empty() {
            let starts = self
                .sentence
                .on_word_start(keys::is_letter(key) || bracket.is_some());
            upper |= starts && self.config.auto_capitalize;
        }
        let before = self.render();
        self.buffer
            .push_raw(if upper { c.to_ascii_uppercase() } else { c });

        let modifier = match bracket {
            Some(vowel) => Some(Modifier::Bracket(vowel)),
            None => scheme::modifier(self.config.method, key, shift),
        };
        let consumed = match modifier {
            Some(m) => self.apply_modifier(m, key, upper),
            None => false,
        };

        let mut expected = before.clone();
        if !consumed {
            if !keys::is_letter(key) {
                // A VNI digit or bracket with nothing to modify is plain text.
                self.buffer.clear();
                return TransformResult::none();
            }
            self.buffer.push(Letter::new(key, upper));
            self.buffer.record(Step::Literal { key });
            expected.push(chars::with_case(c, typed));
        }

        let after = self.render();
        if after == expected {
            return TransformResult::none();
        }
        delta(&before, &after)
    }

    fn on_backspace(&mut self) -> TransformResult {
        if self.buffer.is_empty() {
            self.sentence.on_separator(VK_BACK, false);
            return TransformResult::none();
        }
        let before = self.render();
        self.buffer.pop();
        if self.buffer.is_empty() {
            self.sentence.on_word_erased();
        }
        let after = self.render();
        if after[..] == before[..before.len() - 1] {
            return TransformResult::none();
        }
        delta(&before, &after)
    }

    fn on_boundary(&mut self, key: u16) -> TransformResult {
        if self.buffer.is_empty() {
            return TransformResult::none();
        }
        let composed = self.render();
        let composed_str: String = composed.iter().collect();
        let raw = self.buffer.raw();
        let transformed = raw.as_deref().is_some_and(|r| r != composed_str);

        let result = if key == VK_ESCAPE {
            match raw {
                Some(ref raw) if self.config.esc_restore && transformed => {
                    restore(composed.len(), raw)
                }
                _ => TransformResult::none(),
            }
        } else if let Some(text) = self.expand_shortcut(&composed_str, raw.as_deref()) {
            debug!("Shortcut '{}' expanded", composed_str);
            let text: Vec<char> = text.chars().collect();
            TransformResult::new(Action::Send, composed.len(), &text)
        } else if self.config.english_auto_restore && transformed {
            let raw = raw.unwrap_or_default();
            let snapshot = WordSnapshot {
                raw: &raw,
                composed: &composed_str,
                letters: self.buffer.letters(),
                tone: self.buffer.tone(),
            };
            if self.restore_policy.should_restore(&snapshot) {
                debug!("Restoring '{}' to '{}'", composed_str, raw);
                restore(composed.len(), &raw)
            } else {
                TransformResult::none()
            }
        } else {
            TransformResult::none()
        };

        self.buffer.clear();
        result
    }

    fn expand_shortcut(&self, composed: &str, raw: Option<&str>) -> Option<String> {
        if self.shortcuts.is_empty() {
            return None;
        }
        self.shortcuts.expand(composed).or_else(|| {
            raw.filter(|r| *r != composed)
                .and_then(|r| self.shortcuts.expand(r))
        })
    }

    /// Applies a modifier key. Returns false when the key should be typed
    /// as a plain letter instead.
    fn apply_modifier(&mut self, modifier: Modifier, key: u16, caps: bool) -> bool {
        if let Some(step) = self.buffer.last_step().cloned() {
            if step.key() == key {
                match step {
                    Step::Reverted { .. } => return false,
                    Step::Literal { .. } => {}
                    _ => {
                        self.buffer.undo_last();
                        if modifier == Modifier::HornOrBreve {
                            self.buffer.suppress_horn();
                        }
                        self.revert_to_literal(key, caps);
                        return true;
                    }
                }
            }
        }

        let telex = self.config.method == Method::Telex;
        if telex && !phonology::is_plausible(self.buffer.letters()) {
            return false;
        }

        match modifier {
            Modifier::Tone(tone) => self.apply_tone(tone, key, caps),
            Modifier::Clear => self.clear_marks(key),
            Modifier::Double(base) => {
                let pos = self.buffer.letters().iter().rposition(|l| {
                    l.is_vowel() && l.base() == base && l.diacritic == Diacritic::None
                });
                match pos {
                    Some(pos) => self.set_diacritics(key, &[(pos, Diacritic::Circumflex)], telex),
                    None => false,
                }
            }
            Modifier::Circumflex => match self.rightmost_vowel(&['a', 'e', 'o'], Diacritic::Circumflex)
            {
                Some(pos) => self.set_diacritics(key, &[(pos, Diacritic::Circumflex)], telex),
                None => false,
            },
            Modifier::Breve => match self.rightmost_vowel(&['a'], Diacritic::Breve) {
                Some(pos) => self.set_diacritics(key, &[(pos, Diacritic::Breve)], telex),
                None => false,
            },
            Modifier::Horn => {
                let targets = self.horn_targets(false);
                !targets.is_empty() && self.set_diacritics(key, &targets, telex)
            }
            Modifier::HornOrBreve => {
                if self.buffer.horn_suppressed() {
                    return false;
                }
                let targets = self.horn_targets(true);
                if !targets.is_empty() && self.set_diacritics(key, &targets, telex) {
                    return true;
                }
                if self.config.skip_w_shortcut {
                    return false;
                }
                self.bare_horn('u', key, caps)
            }
            Modifier::Bracket(vowel) => self.bare_horn(vowel, key, caps),
            Modifier::Stroke => {
                let pos = self
                    .buffer
                    .letters()
                    .iter()
                    .position(|l| l.base() == 'd' && !l.stroke);
                match pos {
                    Some(pos) => self.stroke(key, pos),
                    None => false,
                }
            }
        }
    }

    /// Undo already happened; type the key itself and remember it.
    fn revert_to_literal(&mut self, key: u16, caps: bool) {
        self.buffer.push(Letter::new(key, caps));
        self.buffer.record(Step::Reverted { key });
    }

    fn apply_tone(&mut self, tone: Tone, key: u16, caps: bool) -> bool {
        let modern = self.config.modern_tone;
        if phonology::tone_position(self.buffer.letters(), modern).is_none() {
            return false;
        }
        let previous = self.buffer.tone();
        if previous == tone {
            // Same tone typed again later in the word: drop it.
            self.buffer.set_tone(Tone::Level);
            self.revert_to_literal(key, caps);
            return true;
        }
        let implied = self.imply_circumflex();
        self.buffer.set_tone(tone);
        self.buffer.record(Step::Tone {
            key,
            previous,
            implied,
        });
        true
    }

    /// `ie`/`ye` before a final consonant only exist as `iê`/`yê`.
    fn imply_circumflex(&mut self) -> Vec<(usize, Diacritic)> {
        let letters = self.buffer.letters();
        let Some(syl) = phonology::parse(letters) else {
            return Vec::new();
        };
        if syl.coda.is_empty() {
            return Vec::new();
        }
        let run = syl.vowels.clone();
        let found = run.clone().zip(run.clone().skip(1)).find(|&(a, b)| {
            matches!(letters[a].base(), 'i' | 'y')
                && letters[b].base() == 'e'
                && letters[b].diacritic == Diacritic::None
        });
        match found {
            Some((_, pos)) => {
                self.buffer.letters_mut()[pos].diacritic = Diacritic::Circumflex;
                vec![(pos, Diacritic::None)]
            }
            None => Vec::new(),
        }
    }

    fn clear_marks(&mut self, key: u16) -> bool {
        let previous = self.buffer.tone();
        if previous != Tone::Level {
            self.buffer.set_tone(Tone::Level);
            self.buffer.record(Step::Clear {
                key,
                previous,
                changes: Vec::new(),
            });
            return true;
        }
        let pos = self
            .buffer
            .letters()
            .iter()
            .rposition(|l| l.diacritic != Diacritic::None);
        match pos {
            Some(pos) => {
                let old = self.buffer.letters()[pos].diacritic;
                self.buffer.letters_mut()[pos].diacritic = Diacritic::None;
                self.buffer.record(Step::Clear {
                    key,
                    previous,
                    changes: vec![(pos, old)],
                });
                true
            }
            None => false,
        }
    }

    fn rightmost_vowel(&self, bases: &[char], mark: Diacritic) -> Option<usize> {
        self.buffer
            .letters()
            .iter()
            .rposition(|l| l.is_vowel() && bases.contains(&l.base()) && l.diacritic != mark)
    }

    /// Horn (and for Telex `w`, breve) positions: both vowels of `uo`, the
    /// `a` of `oa`, else the rightmost `u`/`o`, else the rightmost `a`.
    fn horn_targets(&self, allow_breve: bool) -> Vec<(usize, Diacritic)> {
        let letters = self.buffer.letters();
        let Some(syl) = phonology::parse(letters) else {
            return Vec::new();
        };
        let run = syl.vowels.clone();
        let horned = |i: usize| letters[i].diacritic == Diacritic::Horn;

        for i in run.start..run.end.saturating_sub(1) {
            if letters[i].base() == 'u' && letters[i + 1].base() == 'o' && !(horned(i) && horned(i + 1))
            {
                return [i, i + 1]
                    .into_iter()
                    .filter(|&p| !horned(p))
                    .map(|p| (p, Diacritic::Horn))
                    .collect();
            }
            if allow_breve
                && letters[i].base() == 'o'
                && letters[i + 1].base() == 'a'
                && letters[i + 1].diacritic == Diacritic::None
            {
                return vec![(i + 1, Diacritic::Breve)];
            }
        }
        if let Some(i) = run
            .clone()
            .rev()
            .find(|&i| matches!(letters[i].base(), 'u' | 'o') && !horned(i))
        {
            return vec![(i, Diacritic::Horn)];
        }
        if allow_breve {
            if let Some(i) = run
                .rev()
                .find(|&i| letters[i].base() == 'a' && letters[i].diacritic != Diacritic::Breve)
            {
                return vec![(i, Diacritic::Breve)];
            }
        }
        Vec::new()
    }

    /// Sets diacritics and records the step. Telex keeps the word plausible.
    fn set_diacritics(&mut self, key: u16, targets: &[(usize, Diacritic)], gated: bool) -> bool {
        let mut trial = self.buffer.letters().to_vec();
        for &(pos, mark) in targets {
            match trial.get_mut(pos) {
                Some(l) if mark.fits(l.base()) => l.diacritic = mark,
                _ => return false,
            }
        }
        if gated && !phonology::is_plausible(&trial) {
            return false;
        }
        let changes: Vec<(usize, Diacritic)> = targets
            .iter()
            .map(|&(pos, _)| (pos, self.buffer.letters()[pos].diacritic))
            .collect();
        for &(pos, mark) in targets {
            self.buffer.letters_mut()[pos].diacritic = mark;
        }
        self.buffer.record(Step::Diacritic { key, changes });
        true
    }

    /// Types a horned `vowel` in place of the key: Telex `w` after an
    /// onset, or a bracket shortcut.
    fn bare_horn(&mut self, vowel: char, key: u16, caps: bool) -> bool {
        if !phonology::accepts_bare_horn(self.buffer.letters(), vowel) {
            return false;
        }
        let pos = self.buffer.len();
        let mut letter = Letter::new(keys::vk(vowel), caps);
        letter.diacritic = Diacritic::Horn;
        if !self.buffer.push(letter) {
            return false;
        }
        self.buffer.record(Step::BareHorn { key, pos });
        true
    }

    fn stroke(&mut self, key: u16, pos: usize) -> bool {
        match self.buffer.letters_mut().get_mut(pos) {
            Some(l) => l.stroke = true,
            None => return false,
        }
        self.buffer.record(Step::Stroke { key, pos });
        true
    }
}

/// Minimal rewrite from `before` to `after`: keep the common prefix,
/// delete the rest, insert the new tail.
fn delta(before: &[char], after: &[char]) -> TransformResult {
    let prefix = before
        .iter()
        .zip(after)
        .take_while(|(a, b)| a == b)
        .count();
    TransformResult::new(Action::Send, before.len() - prefix, &after[prefix..])
}

fn restore(on_screen: usize, raw: &str) -> TransformResult {
    let raw: Vec<char> = raw.chars().collect();
    TransformResult::new(Action::Restore, on_screen, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{vk, VK_SPACE};

    /// Types `input` and returns what would be on screen, applying every
    /// result the way the injection pipeline would.
    fn type_keys(engine: &mut Engine, input: &str) -> String {
        let mut screen: Vec<char> = Vec::new();
        for c in input.chars() {
            let key = vk(c);
            let caps = c.is_ascii_uppercase();
            let r = engine.process_key(key, caps, false, false);
            if r.is_none() {
                screen.push(c);
            } else {
                assert!(r.backspace() <= screen.len(), "backspace past screen for {input}");
                screen.truncate(screen.len() - r.backspace());
                screen.extend(r.text().chars());
                if keys::is_boundary(key) {
                    screen.push(c);
                }
            }
        }
        screen.into_iter().collect()
    }

    fn telex(input: &str) -> String {
        type_keys(&mut Engine::default(), input)
    }

    fn vni(input: &str) -> String {
        let mut e = Engine::default();
        e.set_method(Method::Vni);
        type_keys(&mut e, input)
    }

    #[test]
    fn telex_basic_words() {
        assert_eq!(telex("vieetj"), "việt");
        assert_eq!(telex("tieengs"), "tiếng");
        assert_eq!(telex("dduowcj"), "được");
        assert_eq!(telex("nguoiwf"), "người");
        assert_eq!(telex("hoaf"), "hoà");
        assert_eq!(telex("Chaof"), "Chào");
        assert_eq!(telex("muaw"), "mưa");
        assert_eq!(telex("hoawcj"), "hoặc");
        assert_eq!(telex("quaan"), "quân");
        assert_eq!(telex("gif"), "gì");
    }

    #[test]
    fn vni_basic_words() {
        assert_eq!(vni("vie6t5"), "việt");
        assert_eq!(vni("d9u7o7c5"), "được");
        assert_eq!(vni("to6i1"), "tối");
        assert_eq!(vni("a8n"), "ăn");
    }

    #[test]
    fn tone_on_ie_before_coda_implies_circumflex() {
        assert_eq!(vni("viet5"), "việt");
        assert_eq!(telex("vietj"), "việt");
    }

    #[test]
    fn classic_tone_style() {
        let mut e = Engine::default();
        e.set_modern_tone(false);
        assert_eq!(type_keys(&mut e, "hoaf"), "hòa");
        e.clear_buffer();
        assert_eq!(type_keys(&mut e, " uyr"), " ủy");
        let mut e = Engine::default();
        assert_eq!(type_keys(&mut e, "uyr"), "uỷ");
    }

    #[test]
    fn tone_moves_when_coda_arrives() {
        let mut e = Engine::default();
        e.set_modern_tone(false);
        assert_eq!(type_keys(&mut e, "hoafn"), "hoàn");
    }

    #[test]
    fn repeated_modifier_reverts() {
        assert_eq!(telex("ass"), "as");
        assert_eq!(telex("aaa"), "aa");
        assert_eq!(telex("ddd"), "dd");
        assert_eq!(telex("ww"), "w");
        assert_eq!(telex("asss"), "ass");
        assert_eq!(vni("a11"), "a1");
        assert_eq!(vni("a66"), "a6");
        assert_eq!(vni("a166"), "á6");
    }

    #[test]
    fn tone_toggle_returns_untoned_vowel() {
        let mut e = Engine::default();
        type_keys(&mut e, "ass");
        assert_eq!(e.buffer().tone(), Tone::Level);
        assert_eq!(e.buffer().render_string(true), "as");

        let mut e = Engine::default();
        e.set_method(Method::Vni);
        type_keys(&mut e, "a11");
        assert_eq!(e.buffer().tone(), Tone::Level);
    }

    #[test]
    fn clear_key_removes_marks() {
        assert_eq!(telex("asz"), "a");
        assert_eq!(telex("aaz"), "a");
        assert_eq!(vni("a10"), "a");
        assert_eq!(telex("z"), "z");
    }

    #[test]
    fn modifiers_outside_vietnamese_stay_literal() {
        assert_eq!(telex("class"), "class");
        assert_eq!(telex("str"), "str");
        assert_eq!(telex("fix"), "fix");
    }

    #[test]
    fn bare_w_becomes_u_horn() {
        assert_eq!(telex("w"), "ư");
        assert_eq!(telex("W"), "Ư");
        assert_eq!(telex("nhw"), "như");
        assert_eq!(telex("wng"), "ưng");
        assert_eq!(telex("www"), "ww");
    }

    #[test]
    fn skip_w_shortcut_keeps_literal_w() {
        let mut e = Engine::default();
        e.set_skip_w_shortcut(true);
        assert_eq!(type_keys(&mut e, "w"), "w");
        e.clear_buffer();
        assert_eq!(type_keys(&mut e, "uw"), "ư");
    }

    #[test]
    fn unknown_key_with_empty_buffer_is_noop() {
        let mut e = Engine::default();
        for key in [0xBA, 0x25, 0x70, vk('5')] {
            assert!(e.process_key(key, false, false, false).is_none());
            assert!(e.buffer().is_empty());
        }
        let mut e = Engine::default();
        e.set_method(Method::Vni);
        assert!(e.process_key(0xBC, false, false, false).is_none());
    }

    #[test]
    fn boundary_clears_state() {
        let mut e = Engine::default();
        type_keys(&mut e, "as ");
        assert!(e.buffer().is_empty());
        // 's' right after the boundary is a fresh letter, not a tone revert.
        let r = e.process_key(vk('s'), false, false, false);
        assert!(r.is_none());
        assert_eq!(e.buffer().render_string(true), "s");
    }

    #[test]
    fn ctrl_and_disabled_clear_buffer() {
        let mut e = Engine::default();
        type_keys(&mut e, "vie");
        assert!(e.process_key(vk('c'), false, true, false).is_none());
        assert!(e.buffer().is_empty());

        type_keys(&mut e, "as");
        e.set_enabled(false);
        assert!(e.buffer().is_empty());
        assert!(e.process_key(vk('a'), false, false, false).is_none());
        assert!(e.buffer().is_empty());
    }

    #[test]
    fn backspace_pops_and_keeps_tone_in_place() {
        let mut e = Engine::default();
        type_keys(&mut e, "toans");
        assert!(e.process_key(VK_BACK, false, false, false).is_none());
        assert_eq!(e.buffer().render_string(true), "toá");
    }

    #[test]
    fn backspace_moving_tone_rewrites_word() {
        let mut e = Engine::default();
        e.set_modern_tone(false);
        type_keys(&mut e, "hoafn");
        let r = e.process_key(VK_BACK, false, false, false);
        assert_eq!(r.action(), Action::Send);
        assert_eq!(r.backspace(), 3);
        assert_eq!(r.text(), "òa");
    }

    #[test]
    fn shortcut_expands_only_at_boundary() {
        let mut e = Engine::default();
        e.add_shortcut("vn", "Việt Nam").unwrap();
        assert!(e.process_key(vk('v'), false, false, false).is_none());
        assert!(e.process_key(vk('n'), false, false, false).is_none());
        let r = e.process_key(VK_SPACE, false, false, false);
        assert_eq!(r.action(), Action::Send);
        assert_eq!(r.backspace(), 2);
        assert_eq!(r.text(), "Việt Nam");

        assert_eq!(type_keys(&mut e, "vnx "), "vnx ");
        assert_eq!(type_keys(&mut e, "vn "), "Việt Nam ");
    }

    #[test]
    fn escape_restores_when_enabled() {
        let mut e = Engine::default();
        type_keys(&mut e, "tesst");
        assert!(e.process_key(VK_ESCAPE, false, false, false).is_none());

        e.set_esc_restore(true);
        type_keys(&mut e, "vieetj");
        let r = e.process_key(VK_ESCAPE, false, false, false);
        assert_eq!(r.action(), Action::Restore);
        assert_eq!(r.backspace(), 4);
        assert_eq!(r.text(), "vieetj");
    }

    #[test]
    fn english_auto_restore() {
        let mut e = Engine::default();
        e.set_english_auto_restore(true);
        assert_eq!(type_keys(&mut e, "text "), "text ");
        assert_eq!(type_keys(&mut e, "test "), "test ");
        assert_eq!(type_keys(&mut e, "wow "), "wow ");
        assert_eq!(type_keys(&mut e, "less "), "less ");
        assert_eq!(type_keys(&mut e, "vieetj "), "việt ");
        assert_eq!(type_keys(&mut e, "hoaf "), "hoà ");

        e.set_english_auto_restore(false);
        assert_eq!(type_keys(&mut e, "text "), "tẽt ");
    }

    #[test]
    fn results_stay_within_capacity() {
        let mut e = Engine::default();
        let long = "a".repeat(100);
        for c in long.chars() {
            let before = e.buffer().len();
            let r = e.process_key(vk(c), false, false, false);
            assert!(r.backspace() <= before.max(1));
            assert!((r.count as usize) <= crate::types::MAX_RESULT_CHARS);
        }
        assert!(e.buffer().len() <= crate::buffer::MAX_LEN);
    }

    #[test]
    fn callbacks_fire_on_change_only() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let mut e = Engine::default();
        e.set_on_enabled_change(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        e.set_enabled(true);
        e.set_enabled(false);
        e.set_enabled(false);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
