//! Platform-neutral half of the keyboard hook: what to do with each raw
//! key event. The OS callback in `keyboard_hook` only translates events and
//! returns the verdict.

use crate::context::EngineContext;
use crate::injection::{InjectionRequest, Injector, ReplayKey};
use crate::keys;
use crate::policy::AppProbe;
use crate::toggle::ChordTracker;
use crate::types::{HookVerdict, Modifiers};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Tag carried in the extra-info field of every event we inject.
pub const INJECTED_EXTRA_INFO: usize = 0x4356_4E49;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("permission to monitor keyboard input was denied")]
    PermissionDenied,
    #[error("keyboard hook is already running")]
    AlreadyRunning,
    #[error("failed to install keyboard hook: {0}")]
    Install(String),
}

/// OS-specific hook installation.
pub trait HookBackend: Send {
    fn install(&mut self) -> Result<(), HookError>;
    fn uninstall(&mut self);

    fn reenable(&mut self) -> Result<(), HookError> {
        self.uninstall();
        self.install()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Stopped,
    Running,
}

pub struct KeyboardHook {
    backend: Box<dyn HookBackend>,
    state: HookState,
}

impl KeyboardHook {
    pub fn new(backend: Box<dyn HookBackend>) -> Self {
        Self {
            backend,
            state: HookState::Stopped,
        }
    }

    pub fn state(&self) -> HookState {
        self.state
    }

    pub fn start(&mut self) -> Result<(), HookError> {
        if self.state == HookState::Running {
            return Err(HookError::AlreadyRunning);
        }
        info!("Installing keyboard hook...");
        if let Err(e) = self.backend.install() {
            error!("Keyboard hook installation failed: {}", e);
            return Err(e);
        }
        self.state = HookState::Running;
        info!("Keyboard hook installed");
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.state == HookState::Running {
            self.backend.uninstall();
            self.state = HookState::Stopped;
            info!("Keyboard hook uninstalled");
        }
    }

    /// The OS disabled the hook (timeout or user input). Re-enable at once.
    pub fn on_disabled(&mut self) {
        if self.state != HookState::Running {
            return;
        }
        warn!("Keyboard hook was disabled by the system, re-enabling");
        if let Err(e) = self.backend.reenable() {
            error!("Keyboard hook re-enable failed: {}", e);
            self.state = HookState::Stopped;
        }
    }

    /// Periodic health check. Re-enables the hook when the last heartbeat
    /// never reached it. Returns false in that case.
    pub fn check(&mut self, watchdog: &HookWatchdog) -> bool {
        if self.state != HookState::Running || watchdog.heartbeat_seen() {
            return true;
        }
        self.on_disabled();
        false
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Detects a hook the OS removed without notice (Windows drops low-level
/// hooks that miss its timeout). The hook thread posts a tagged heartbeat
/// on every tick; the callback records every event it sees.
#[derive(Debug, Default)]
pub struct HookWatchdog {
    last_seen: AtomicU64,
    heartbeat_sent: AtomicU64,
}

impl HookWatchdog {
    pub const fn new() -> Self {
        Self {
            last_seen: AtomicU64::new(0),
            heartbeat_sent: AtomicU64::new(0),
        }
    }

    /// Called from the hook callback for every event, ours included.
    pub fn on_callback(&self, now_ms: u64) {
        self.last_seen.store(now_ms, Ordering::Release);
    }

    /// Must be called before the heartbeat is posted.
    pub fn on_heartbeat_sent(&self, now_ms: u64) {
        self.heartbeat_sent.store(now_ms.max(1), Ordering::Release);
    }

    /// The heartbeat could not be posted; nothing to wait for.
    pub fn cancel_heartbeat(&self) {
        self.heartbeat_sent.store(0, Ordering::Release);
    }

    /// Whether the pending heartbeat, if any, reached the hook. Consumes it.
    pub fn heartbeat_seen(&self) -> bool {
        let sent = self.heartbeat_sent.swap(0, Ordering::AcqRel);
        sent == 0 || self.last_seen.load(Ordering::Acquire) >= sent
    }
}

/// One key-down as the OS reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawKeyEvent {
    pub vk: u16,
    pub modifiers: Modifiers,
    pub caps_lock: bool,
    pub extra_info: usize,
}

impl RawKeyEvent {
    pub fn new(vk: u16, modifiers: Modifiers) -> Self {
        Self {
            vk,
            modifiers,
            ..Self::default()
        }
    }

    fn replay_key(&self) -> ReplayKey {
        ReplayKey::new(self.vk, self.modifiers, self.caps_lock)
    }
}

pub struct Interceptor {
    context: Arc<EngineContext>,
    injector: Arc<Injector>,
    probe: Arc<dyn AppProbe>,
    chord: Mutex<ChordTracker>,
}

impl Interceptor {
    pub fn new(
        context: Arc<EngineContext>,
        injector: Arc<Injector>,
        probe: Arc<dyn AppProbe>,
    ) -> Self {
        Self {
            context,
            injector,
            probe,
            chord: Mutex::new(ChordTracker::default()),
        }
    }

    pub fn on_key_down(&self, ev: &RawKeyEvent) -> HookVerdict {
        if ev.extra_info == INJECTED_EXTRA_INFO || keys::is_modifier(ev.vk) {
            return HookVerdict::Pass;
        }
        self.chord.lock().on_key_down();

        if let Some(app) = self.probe.foreground_app() {
            self.context.on_app_activated(&app);
        }

        let toggle = self.context.toggle_shortcut();
        if toggle.matches(ev.vk, ev.modifiers.bits()) {
            self.context.toggle_enabled();
            return HookVerdict::Block;
        }

        if !self.context.is_enabled() {
            return self.pass_through(ev);
        }
        if ev.modifiers.is_chord() {
            self.context.clear_buffer();
            return HookVerdict::Pass;
        }

        let shift = ev.modifiers.shift;
        let result = self
            .context
            .process_key(ev.vk, shift ^ ev.caps_lock, false, shift);
        if result.is_none() {
            return self.pass_through(ev);
        }

        let mut req = InjectionRequest::from_result(&result);
        if keys::is_boundary(ev.vk) {
            req = req.with_replay(ev.replay_key());
        }
        match self.injector.submit(req) {
            Ok(()) => HookVerdict::Block,
            Err(e) => {
                warn!("Dropping correction: {}", e);
                HookVerdict::Pass
            }
        }
    }

    /// Lets a key through, unless a correction is still being typed: then
    /// the key is queued behind it so the screen keeps typing order.
    fn pass_through(&self, ev: &RawKeyEvent) -> HookVerdict {
        if !self.injector.is_busy() {
            return HookVerdict::Pass;
        }
        match self.injector.submit(InjectionRequest::replay(ev.replay_key())) {
            Ok(()) => HookVerdict::Block,
            Err(_) => HookVerdict::Pass,
        }
    }

    /// Modifier press or release, for modifier-only toggle chords.
    pub fn on_modifiers_changed(&self, live: Modifiers) {
        let toggle = self.context.toggle_shortcut();
        let fired = self.chord.lock().on_modifiers(&toggle, live.bits());
        if fired {
            self.context.toggle_enabled();
        }
    }
}
