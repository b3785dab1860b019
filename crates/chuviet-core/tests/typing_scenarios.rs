use chuviet_core::engine::Engine;
use chuviet_core::keys::{
    self, vk, VK_BACK, VK_ESCAPE, VK_OEM_2, VK_OEM_4, VK_OEM_6, VK_OEM_7, VK_OEM_PERIOD, VK_RETURN,
    VK_SPACE, VK_TAB,
};
use chuviet_core::scheme::Method;
use chuviet_core::types::{Action, TransformResult, MAX_RESULT_CHARS};

/// Text field that applies results the way the injection pipeline would.
#[derive(Default)]
struct Screen {
    text: Vec<char>,
}

impl Screen {
    fn apply(&mut self, key: u16, typed: Option<char>, r: &TransformResult) {
        if r.is_none() {
            match typed {
                Some(c) => self.text.push(c),
                None if key == VK_BACK => {
                    self.text.pop();
                }
                None => {}
            }
            return;
        }
        assert!(r.backspace() <= self.text.len(), "deleting past the start");
        self.text.truncate(self.text.len() - r.backspace());
        self.text.extend(r.text().chars());
        if keys::is_boundary(key) && key != VK_ESCAPE {
            if let Some(c) = typed {
                self.text.push(c);
            }
        }
    }

    fn as_string(&self) -> String {
        self.text.iter().collect()
    }
}

const VK_OEM_COMMA: u16 = 0xBC;

/// US-layout key and Shift state for a typed character.
fn key_for(c: char) -> (u16, bool) {
    match c {
        '.' => (VK_OEM_PERIOD, false),
        ',' => (VK_OEM_COMMA, false),
        '!' => (vk('1'), true),
        '?' => (VK_OEM_2, true),
        '"' => (VK_OEM_7, true),
        '(' => (vk('9'), true),
        ')' => (vk('0'), true),
        '[' => (VK_OEM_4, false),
        ']' => (VK_OEM_6, false),
        c => (vk(c), c.is_ascii_uppercase()),
    }
}

/// Types `input`; `<` stands for Backspace.
fn type_on(engine: &mut Engine, input: &str) -> String {
    let mut screen = Screen::default();
    for c in input.chars() {
        let (key, typed, shift) = match c {
            '<' => (VK_BACK, None, false),
            c => {
                let (key, shift) = key_for(c);
                (key, Some(c), shift)
            }
        };
        let before = engine.buffer().len();
        let r = engine.process_key(key, c.is_ascii_uppercase(), false, shift);
        assert!(r.backspace() <= before, "{input}: backspace {} > {before}", r.backspace());
        assert!(r.count as usize <= MAX_RESULT_CHARS);
        screen.apply(key, typed, &r);
    }
    screen.as_string()
}

fn telex(input: &str) -> String {
    type_on(&mut Engine::default(), input)
}

fn vni(input: &str) -> String {
    let mut engine = Engine::default();
    engine.set_method(Method::Vni);
    type_on(&mut engine, input)
}

#[test]
fn telex_basic_scenario() {
    assert_eq!(telex("vieetj"), "việt");
}

#[test]
fn vni_numeric_tone_scenario() {
    assert_eq!(vni("viet5"), "việt");
    assert_eq!(vni("vie6t5"), "việt");
}

#[test]
fn auto_w_scenario() {
    let mut engine = Engine::default();
    engine.process_key(vk('w'), false, false, false);
    assert_eq!(engine.buffer().render_string(true), "ư");
}

#[test]
fn telex_sentence() {
    assert_eq!(
        telex("tieengs vieetj laf ngoon nguwx cuar nguwowif vieetj "),
        "tiếng việt là ngôn ngữ của người việt "
    );
}

#[test]
fn vni_sentence() {
    assert_eq!(
        vni("tie6ng1 vie6t5 la2 ngo6n ngu74 cua3 ngu7o7i2 "),
        "tiếng việt là ngôn ngữ của người "
    );
}

#[test]
fn capitals_follow_each_key() {
    assert_eq!(telex("Vieetj"), "Việt");
    assert_eq!(telex("VIEETJ"), "VIỆT");
    assert_eq!(telex("DDaf"), "Đà");
}

#[test]
fn backspace_inside_a_word() {
    assert_eq!(telex("vieet<"), "viê");
    assert_eq!(telex("toans<"), "toá");
    assert_eq!(telex("ab<<<c"), "c");
}

#[test]
fn tone_toggle_round_trip() {
    for (input, expected) in [("ass", "as"), ("aff", "af"), ("ajj", "aj")] {
        assert_eq!(telex(input), expected);
    }
    for (input, expected) in [("a11", "a1"), ("a22", "a2"), ("a55", "a5")] {
        assert_eq!(vni(input), expected);
    }
}

#[test]
fn no_op_keys_with_empty_buffer() {
    for method in [Method::Telex, Method::Vni] {
        let mut engine = Engine::default();
        engine.set_method(method);
        for key in [0x25u16, 0x26, 0x27, 0x28, 0x70, 0xBA, 0xBC, 0xBE, 0xDE, VK_BACK] {
            assert!(engine.process_key(key, false, false, false).is_none());
        }
    }
}

#[test]
fn boundaries_reset_modifier_context() {
    for boundary in [VK_SPACE, VK_RETURN, VK_TAB, VK_ESCAPE] {
        let mut engine = Engine::default();
        for c in "as".chars() {
            engine.process_key(vk(c), false, false, false);
        }
        engine.process_key(boundary, false, false, false);

        let mut fresh = Engine::default();
        for c in "as".chars() {
            let a = engine.process_key(vk(c), false, false, false);
            let b = fresh.process_key(vk(c), false, false, false);
            assert_eq!(a.action(), b.action());
            assert_eq!(a.backspace(), b.backspace());
            assert_eq!(a.text(), b.text());
        }
    }
}

#[test]
fn shortcut_exactness() {
    let mut engine = Engine::default();
    engine.add_shortcut("vn", "Việt Nam").unwrap();

    engine.process_key(vk('v'), false, false, false);
    engine.process_key(vk('n'), false, false, false);
    let r = engine.process_key(VK_SPACE, false, false, false);
    assert_eq!(r.action(), Action::Send);
    assert_eq!(r.backspace(), 2);
    assert_eq!(r.text(), "Việt Nam");

    assert_eq!(type_on(&mut engine, "vnx "), "vnx ");
    assert_eq!(type_on(&mut engine, "Vn\t"), "Việt Nam\t");
}

#[test]
fn english_words_survive_with_auto_restore() {
    let mut engine = Engine::default();
    engine.set_english_auto_restore(true);
    assert_eq!(
        type_on(&mut engine, "this text is the best "),
        "this text is the best "
    );
    assert_eq!(type_on(&mut engine, "tieengs vieetj "), "tiếng việt ");
}

#[test]
fn escape_restore() {
    let mut engine = Engine::default();
    engine.set_esc_restore(true);
    let r = {
        for c in "dduwowngf".chars() {
            engine.process_key(vk(c), false, false, false);
        }
        engine.process_key(VK_ESCAPE, false, false, false)
    };
    assert_eq!(r.action(), Action::Restore);
    assert_eq!(r.backspace(), "đường".chars().count());
    assert_eq!(r.text(), "dduwowngf");
}

#[test]
fn backspace_bound_holds_for_long_input() {
    let mut engine = Engine::default();
    let input: String = "nghieengs".repeat(12);
    type_on(&mut engine, &input);
    assert!(engine.buffer().len() <= chuviet_core::buffer::MAX_LEN);
}

#[test]
fn stroke_reaches_back_to_the_first_d() {
    for (input, expected) in [
        ("did", "đi"),
        ("dend", "đen"),
        ("duongdwf", "đường"),
        ("doidwf", "đời"),
        ("Dangd", "Đang"),
    ] {
        assert_eq!(telex(input), expected, "{input}");
    }
    assert_eq!(telex("didd"), "did");
}

#[test]
fn circumflex_in_free_order() {
    for (input, expected) in [
        ("tana", "tân"),
        ("hono", "hôn"),
        ("quene", "quên"),
        ("nhaanj", "nhận"),
    ] {
        assert_eq!(telex(input), expected, "{input}");
    }
}

fn capitalizing() -> Engine {
    let mut engine = Engine::default();
    engine.set_auto_capitalize(true);
    engine
}

#[test]
fn auto_capitalize_after_sentence_end() {
    for (input, expected) in [
        ("chaof. ban", "chào. Ban"),
        ("ok. ddi", "ok. Đi"),
        ("ok.  ban", "ok.  Ban"),
        ("hay!! di", "hay!! Di"),
        ("sao? taij", "sao? Tại"),
        ("a. b. c", "a. B. C"),
        ("ok. \"ban\"", "ok. \"Ban\""),
        ("ok. (di)", "ok. (Di)"),
        ("v.v. tieeps", "v.v. Tiếp"),
        ("ok. nguwowif", "ok. Người"),
        ("ok. Ban", "ok. Ban"),
        ("xin\nchaof", "xin\nChào"),
        ("\n\tdi", "\n\tDi"),
    ] {
        assert_eq!(type_on(&mut capitalizing(), input), expected, "{input:?}");
    }
}

#[test]
fn auto_capitalize_needs_a_space() {
    for input in ["x.y", "a.b.c", "1.5k", "ok. 5k ban", "xin, chaof", "ok.", "ban: di"] {
        let expected = telex(input);
        assert_eq!(type_on(&mut capitalizing(), input), expected, "{input:?}");
    }
}

#[test]
fn auto_capitalize_survives_retyping() {
    assert_eq!(type_on(&mut capitalizing(), "ok. b<c"), "ok. C");
    assert_eq!(type_on(&mut capitalizing(), "ok. ban<<<di"), "ok. Di");
    assert_eq!(type_on(&mut capitalizing(), "ok. ban<n"), "ok. Ban");
}

#[test]
fn auto_capitalize_off_by_default() {
    assert_eq!(telex("ok. ban"), "ok. ban");
    let mut engine = capitalizing();
    engine.set_auto_capitalize(false);
    assert_eq!(type_on(&mut engine, "ok. ban"), "ok. ban");
}

#[test]
fn auto_capitalize_sends_the_capital_for_the_first_letter() {
    let mut engine = capitalizing();
    for c in "xin".chars() {
        engine.process_key(vk(c), false, false, false);
    }
    engine.process_key(VK_RETURN, false, false, false);
    let r = engine.process_key(vk('d'), false, false, false);
    assert_eq!(r.action(), Action::Send);
    assert_eq!(r.backspace(), 0);
    assert_eq!(r.text(), "D");

    engine.process_key(VK_BACK, false, false, false);
    let r = engine.process_key(vk('b'), false, false, false);
    assert_eq!(r.text(), "B");
}

fn bracketing() -> Engine {
    let mut engine = Engine::default();
    engine.set_bracket_shortcut(true);
    engine
}

#[test]
fn bracket_keys_type_horned_vowels() {
    for (input, expected) in [
        ("]", "ư"),
        ("[", "ơ"),
        ("t]", "tư"),
        ("t[", "tơ"),
        ("t]s", "tứ"),
        ("t[f", "tờ"),
        ("nh]ng", "nhưng"),
        ("]]", "]"),
        ("[[", "["),
        ("t]]", "t]"),
        ("]]]", "]]"),
    ] {
        assert_eq!(type_on(&mut bracketing(), input), expected, "{input}");
    }
}

#[test]
fn bracket_keys_stay_literal_when_off_or_in_vni() {
    assert_eq!(telex("t]"), "t]");
    assert!(Engine::default()
        .process_key(VK_OEM_6, false, false, false)
        .is_none());

    let mut engine = bracketing();
    engine.set_method(Method::Vni);
    assert_eq!(type_on(&mut engine, "t]"), "t]");

    let mut engine = bracketing();
    engine.set_bracket_shortcut(false);
    assert!(engine.process_key(VK_OEM_4, false, false, false).is_none());
}

#[test]
fn bracket_after_a_vowel_is_literal() {
    assert_eq!(type_on(&mut bracketing(), "a]"), "a]");
}

#[test]
fn bracket_at_sentence_start_is_capitalized() {
    let mut engine = bracketing();
    engine.set_auto_capitalize(true);
    assert_eq!(type_on(&mut engine, "ok. ]"), "ok. Ư");
}
