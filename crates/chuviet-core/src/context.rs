//! The engine context: one object owning the engine, the per-app policy and
//! the toggle shortcut, shared by the hook callback and the control surface.

use crate::config::{EngineConfig, Settings, ShortcutEntry};
use crate::engine::Engine;
use crate::injection::Injector;
use crate::interceptor::{HookWatchdog, KeyboardHook};
use crate::policy::AppPolicy;
use crate::scheme::Method;
use crate::shortcut::{self, ShortcutError};
use crate::toggle::ToggleShortcut;
use crate::types::TransformResult;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// State changes the surrounding shell may want to reflect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    EnabledChanged(bool),
    MethodChanged(Method),
}

type Subscribers = Arc<Mutex<Vec<Sender<ControlEvent>>>>;

fn broadcast(subscribers: &Subscribers, event: ControlEvent) {
    subscribers.lock().retain(|tx| tx.send(event).is_ok());
}

struct Runtime {
    hook: KeyboardHook,
    injector: Arc<Injector>,
}

/// Lock order: `policy` before `engine`.
pub struct EngineContext {
    engine: Mutex<Engine>,
    policy: Mutex<AppPolicy>,
    toggle: Mutex<ToggleShortcut>,
    subscribers: Subscribers,
    runtime: Mutex<Option<Runtime>>,
    initialized: AtomicBool,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineContext {
    pub fn new() -> Self {
        Self {
            engine: Mutex::new(Engine::default()),
            policy: Mutex::new(AppPolicy::new()),
            toggle: Mutex::new(ToggleShortcut::default()),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            runtime: Mutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    /// Wires change notifications. Safe to call more than once.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut engine = self.engine.lock();
        let subs = self.subscribers.clone();
        engine.set_on_enabled_change(move |enabled| {
            broadcast(&subs, ControlEvent::EnabledChanged(enabled));
        });
        let subs = self.subscribers.clone();
        engine.set_on_method_change(move |method| {
            broadcast(&subs, ControlEvent::MethodChanged(method));
        });
        info!("Engine context initialized");
    }

    pub fn subscribe(&self) -> Receiver<ControlEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn process_key(&self, key: u16, caps: bool, ctrl: bool, shift: bool) -> TransformResult {
        self.engine.lock().process_key(key, caps, ctrl, shift)
    }

    pub fn clear_buffer(&self) {
        self.engine.lock().clear_buffer();
    }

    pub fn is_enabled(&self) -> bool {
        self.engine.lock().is_enabled()
    }

    /// User-initiated enable/disable. Remembered per app in smart mode.
    pub fn set_enabled(&self, enabled: bool) {
        let mut policy = self.policy.lock();
        self.engine.lock().set_enabled(enabled);
        policy.on_manual_toggle(enabled);
    }

    /// Flips the enabled state. Returns the new state.
    pub fn toggle_enabled(&self) -> bool {
        let mut policy = self.policy.lock();
        let mut engine = self.engine.lock();
        let enabled = !engine.is_enabled();
        engine.set_enabled(enabled);
        policy.on_manual_toggle(enabled);
        debug!("Toggled, enabled = {}", enabled);
        enabled
    }

    pub fn method(&self) -> Method {
        self.engine.lock().method()
    }

    pub fn set_method(&self, method: Method) {
        self.engine.lock().set_method(method);
    }

    pub fn set_modern_tone(&self, modern: bool) {
        self.engine.lock().set_modern_tone(modern);
    }

    pub fn set_skip_w_shortcut(&self, skip: bool) {
        self.engine.lock().set_skip_w_shortcut(skip);
    }

    pub fn set_esc_restore(&self, enabled: bool) {
        self.engine.lock().set_esc_restore(enabled);
    }

    pub fn set_english_auto_restore(&self, enabled: bool) {
        self.engine.lock().set_english_auto_restore(enabled);
    }

    pub fn set_auto_capitalize(&self, enabled: bool) {
        self.engine.lock().set_auto_capitalize(enabled);
    }

    pub fn set_bracket_shortcut(&self, enabled: bool) {
        self.engine.lock().set_bracket_shortcut(enabled);
    }

    pub fn config(&self) -> EngineConfig {
        self.engine.lock().config().clone()
    }

    pub fn add_shortcut(&self, trigger: &str, replacement: &str) -> Result<(), ShortcutError> {
        self.engine.lock().add_shortcut(trigger, replacement)
    }

    pub fn remove_shortcut(&self, trigger: &str) -> bool {
        self.engine.lock().remove_shortcut(trigger)
    }

    pub fn clear_shortcuts(&self) {
        self.engine.lock().clear_shortcuts();
    }

    pub fn sync_shortcuts(&self, entries: &[ShortcutEntry]) {
        self.engine.lock().sync_shortcuts(entries);
    }

    /// Replaces the shortcut table with an exported list. Returns the
    /// number of entries read.
    pub fn import_shortcuts(&self, raw: &[u8]) -> anyhow::Result<usize> {
        let entries = shortcut::parse_shortcut_list(raw)?;
        self.sync_shortcuts(&entries);
        Ok(entries.len())
    }

    pub fn toggle_shortcut(&self) -> ToggleShortcut {
        *self.toggle.lock()
    }

    pub fn set_toggle_shortcut(&self, shortcut: ToggleShortcut) {
        *self.toggle.lock() = shortcut;
    }

    /// Loads persisted settings into every component. The focused app is
    /// checked against the new exclusion list at once.
    pub fn apply_settings(&self, settings: &Settings) {
        {
            let mut policy = self.policy.lock();
            policy.set_excluded(&settings.excluded_apps);
            policy.set_smart_mode(settings.smart_mode);
            policy.set_per_app_modes(&settings.per_app_modes);
            let mut engine = self.engine.lock();
            engine.apply_config(settings.engine.clone());
            engine.sync_shortcuts(&settings.shortcuts);
            if let Some(enabled) = policy.reevaluate_current(engine.is_enabled()) {
                engine.set_enabled(enabled);
            }
        }
        self.set_toggle_shortcut(settings.toggle);
        debug!(
            "Settings applied: {} shortcuts, {} excluded apps",
            settings.shortcuts.len(),
            settings.excluded_apps.len()
        );
    }

    /// Replaces the exclusion list without touching other settings.
    pub fn set_excluded_apps(&self, apps: &[String]) {
        let mut policy = self.policy.lock();
        policy.set_excluded(apps);
        let mut engine = self.engine.lock();
        if let Some(enabled) = policy.reevaluate_current(engine.is_enabled()) {
            engine.clear_buffer();
            engine.set_enabled(enabled);
        }
    }

    /// Health check from the hook thread's timer. Re-enables the hook if the
    /// last heartbeat never reached it; returns false in that case.
    pub fn check_hook(&self, watchdog: &HookWatchdog) -> bool {
        match self.runtime.lock().as_mut() {
            Some(runtime) => runtime.hook.check(watchdog),
            None => true,
        }
    }

    /// Foreground application changed (or was re-reported). Clears the
    /// word and applies the exclusion policy on an actual change.
    pub fn on_app_activated(&self, app: &str) {
        let mut policy = self.policy.lock();
        if policy.is_current(app) {
            return;
        }
        let mut engine = self.engine.lock();
        engine.clear_buffer();
        if let Some(enabled) = policy.on_app_activated(app, engine.is_enabled()) {
            engine.set_enabled(enabled);
        }
    }

    /// Per-app preferences learned in smart mode, for persisting.
    pub fn per_app_modes(&self) -> std::collections::HashMap<String, bool> {
        self.policy.lock().per_app_modes().clone()
    }

    /// Hands over the running hook and injector so `shutdown` can stop them.
    pub fn attach(&self, hook: KeyboardHook, injector: Arc<Injector>) {
        *self.runtime.lock() = Some(Runtime { hook, injector });
    }

    /// Stops the hook first so nothing new is queued, then drains and joins
    /// the injection worker.
    pub fn shutdown(&self) {
        let Some(mut runtime) = self.runtime.lock().take() else {
            return;
        };
        runtime.hook.stop();
        runtime.injector.shutdown();
        info!("Engine context shut down");
    }
}
