//! C ABI for native shells. Every function ignores a null engine pointer.

use crate::engine::Engine;
use crate::scheme::Method;
use crate::types::TransformResult;
use std::ffi::{c_char, CStr};
use tracing::warn;

/// # Safety
/// `ptr` must be null or a pointer returned by `chuviet_engine_new` that
/// has not been freed, used from one thread at a time.
unsafe fn engine<'a>(ptr: *mut Engine) -> Option<&'a mut Engine> {
    ptr.as_mut()
}

unsafe fn utf8<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

#[no_mangle]
pub extern "C" fn chuviet_engine_new() -> *mut Engine {
    Box::into_raw(Box::new(Engine::default()))
}

/// # Safety
/// `ptr` must be null or come from `chuviet_engine_new`, and is invalid
/// afterwards.
#[no_mangle]
pub unsafe extern "C" fn chuviet_engine_free(ptr: *mut Engine) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

/// # Safety
/// See `chuviet_engine_free`.
#[no_mangle]
pub unsafe extern "C" fn chuviet_process_key(
    ptr: *mut Engine,
    key: u16,
    caps: bool,
    ctrl: bool,
    shift: bool,
) -> TransformResult {
    match engine(ptr) {
        Some(e) => e.process_key(key, caps, ctrl, shift),
        None => TransformResult::none(),
    }
}

/// # Safety
/// See `chuviet_engine_free`.
#[no_mangle]
pub unsafe extern "C" fn chuviet_clear_buffer(ptr: *mut Engine) {
    if let Some(e) = engine(ptr) {
        e.clear_buffer();
    }
}

/// 0 = Telex, 1 = VNI. Unknown ids are ignored.
///
/// # Safety
/// See `chuviet_engine_free`.
#[no_mangle]
pub unsafe extern "C" fn chuviet_set_method(ptr: *mut Engine, method: u8) {
    let Some(e) = engine(ptr) else { return };
    match Method::from_id(method) {
        Some(m) => e.set_method(m),
        None => warn!("Unknown input method id {}", method),
    }
}

macro_rules! flag_setter {
    ($name:ident, $method:ident) => {
        /// # Safety
        /// See `chuviet_engine_free`.
        #[no_mangle]
        pub unsafe extern "C" fn $name(ptr: *mut Engine, value: bool) {
            if let Some(e) = engine(ptr) {
                e.$method(value);
            }
        }
    };
}

flag_setter!(chuviet_set_enabled, set_enabled);
flag_setter!(chuviet_set_modern_tone, set_modern_tone);
flag_setter!(chuviet_set_skip_w_shortcut, set_skip_w_shortcut);
flag_setter!(chuviet_set_esc_restore, set_esc_restore);
flag_setter!(chuviet_set_english_auto_restore, set_english_auto_restore);
flag_setter!(chuviet_set_auto_capitalize, set_auto_capitalize);
flag_setter!(chuviet_set_bracket_shortcut, set_bracket_shortcut);

/// Both strings are NUL-terminated UTF-8. Returns false when the entry was
/// rejected.
///
/// # Safety
/// See `chuviet_engine_free`; the strings must be null or valid C strings.
#[no_mangle]
pub unsafe extern "C" fn chuviet_add_shortcut(
    ptr: *mut Engine,
    trigger: *const c_char,
    replacement: *const c_char,
) -> bool {
    let (Some(e), Some(trigger), Some(replacement)) =
        (engine(ptr), utf8(trigger), utf8(replacement))
    else {
        return false;
    };
    match e.add_shortcut(trigger, replacement) {
        Ok(()) => true,
        Err(err) => {
            warn!("Shortcut '{}' rejected: {}", trigger, err);
            false
        }
    }
}

/// # Safety
/// See `chuviet_add_shortcut`.
#[no_mangle]
pub unsafe extern "C" fn chuviet_remove_shortcut(ptr: *mut Engine, trigger: *const c_char) {
    if let (Some(e), Some(trigger)) = (engine(ptr), utf8(trigger)) {
        e.remove_shortcut(trigger);
    }
}

/// # Safety
/// See `chuviet_engine_free`.
#[no_mangle]
pub unsafe extern "C" fn chuviet_clear_shortcuts(ptr: *mut Engine) {
    if let Some(e) = engine(ptr) {
        e.clear_shortcuts();
    }
}
