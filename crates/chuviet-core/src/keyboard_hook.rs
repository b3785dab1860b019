//! Windows low-level keyboard hook, the SendInput sink and the foreground
//! application probe.

use crate::context::EngineContext;
use crate::injection::{InjectError, Injector, KeySink};
use crate::interceptor::{
    HookBackend, HookError, HookWatchdog, Interceptor, KeyboardHook, RawKeyEvent,
    INJECTED_EXTRA_INFO,
};
use crate::keys;
use crate::policy::AppProbe;
use crate::profiles::FocusRole;
use crate::types::{HookVerdict, InputEvent, Modifiers};
use anyhow::Context;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::SystemInformation::GetTickCount64;
use windows::Win32::System::Threading::{
    GetCurrentThreadId, OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
    PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, GetKeyState, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT,
    KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, VIRTUAL_KEY, VK_CAPITAL, VK_CONTROL,
    VK_LWIN, VK_MENU, VK_RWIN, VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetClassNameW, GetForegroundWindow, GetGUIThreadInfo,
    GetMessageW, GetWindowThreadProcessId, KillTimer, PeekMessageW, PostThreadMessageW, SetTimer,
    SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, GUITHREADINFO, HHOOK,
    KBDLLHOOKSTRUCT, MSG, PEEK_MESSAGE_REMOVE_TYPE, WH_KEYBOARD_LL, WM_KEYUP, WM_QUIT,
    WM_SYSKEYUP, WM_TIMER,
};

static HOOK_HANDLE: Mutex<Option<HHOOK>> = Mutex::new(None);
static INTERCEPTOR: Mutex<Option<Arc<Interceptor>>> = Mutex::new(None);
static WATCHDOG: HookWatchdog = HookWatchdog::new();

const WATCHDOG_INTERVAL_MS: u32 = 5_000;
/// Unassigned virtual key, posted as a tagged key-up heartbeat.
const HEARTBEAT_VK: u16 = 0x9F;

/// Installs the hook on the calling thread and pumps messages until the
/// context is shut down.
pub fn run(context: Arc<EngineContext>) -> anyhow::Result<()> {
    context.initialize();
    let probe: Arc<dyn AppProbe> = Arc::new(WinAppProbe::default());
    let injector = Arc::new(
        Injector::spawn(Box::new(SendInputSink), probe.clone())
            .context("spawning injection worker")?,
    );
    *INTERCEPTOR.lock() = Some(Arc::new(Interceptor::new(
        context.clone(),
        injector.clone(),
        probe,
    )));

    let mut hook = KeyboardHook::new(Box::new(WinHookBackend::default()));
    if let Err(e) = hook.start() {
        *INTERCEPTOR.lock() = None;
        injector.shutdown();
        return Err(e.into());
    }
    context.attach(hook, injector);

    let timer = unsafe { SetTimer(None, 0, WATCHDOG_INTERVAL_MS, None) };
    if timer == 0 {
        warn!("Hook watchdog timer could not be created");
    }
    run_event_loop(timer, || watchdog_tick(&context));
    if timer != 0 {
        unsafe {
            let _ = KillTimer(None, timer);
        }
    }

    context.shutdown();
    *INTERCEPTOR.lock() = None;
    Ok(())
}

#[derive(Debug, Default)]
pub struct WinHookBackend {
    loop_thread: u32,
}

impl HookBackend for WinHookBackend {
    fn install(&mut self) -> Result<(), HookError> {
        // Low-level hooks run on the installing thread's message loop.
        let hook_id =
            unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(hook_proc), HINSTANCE::default(), 0) }
                .map_err(|e| HookError::Install(e.to_string()))?;
        if hook_id.is_invalid() {
            return Err(HookError::Install("invalid hook handle".into()));
        }
        self.loop_thread = unsafe { GetCurrentThreadId() };
        *HOOK_HANDLE.lock() = Some(hook_id);
        debug!("Hook handle: {:?}", hook_id);
        Ok(())
    }

    fn uninstall(&mut self) {
        if let Some(h) = HOOK_HANDLE.lock().take() {
            unsafe {
                let _ = UnhookWindowsHookEx(h);
            }
        }
        if self.loop_thread != 0 {
            unsafe {
                let _ = PostThreadMessageW(self.loop_thread, WM_QUIT, WPARAM(0), LPARAM(0));
            }
        }
    }

    fn reenable(&mut self) -> Result<(), HookError> {
        if let Some(h) = HOOK_HANDLE.lock().take() {
            unsafe {
                let _ = UnhookWindowsHookEx(h);
            }
        }
        self.install()
    }
}

/// Runs a blocking message loop until WM_QUIT. Thread timer `timer` ticks
/// call `on_timer`.
pub fn run_event_loop(timer: usize, mut on_timer: impl FnMut()) {
    info!("Starting message loop...");
    let mut msg = MSG::default();
    unsafe {
        // Force message queue creation
        let _ = PeekMessageW(&mut msg, None, 0, 0, PEEK_MESSAGE_REMOVE_TYPE(0));

        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            if msg.message == WM_TIMER && timer != 0 && msg.wParam.0 == timer {
                on_timer();
                continue;
            }
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    info!("Message loop exited.");
}

fn now_ms() -> u64 {
    unsafe { GetTickCount64() }
}

/// Checks that the previous heartbeat reached the hook, then posts the next.
fn watchdog_tick(context: &EngineContext) {
    if !context.check_hook(&WATCHDOG) {
        return;
    }
    WATCHDOG.on_heartbeat_sent(now_ms());
    let heartbeat = key_input(HEARTBEAT_VK, 0, KEYEVENTF_KEYUP);
    if let Err(e) = SendInputSink::send(&[heartbeat]) {
        debug!("Heartbeat not posted: {}", e);
        WATCHDOG.cancel_heartbeat();
    }
}

fn key_down(vk: VIRTUAL_KEY) -> bool {
    unsafe { GetAsyncKeyState(vk.0 as i32) as u16 & 0x8000 != 0 }
}

fn live_modifiers() -> Modifiers {
    Modifiers {
        ctrl: key_down(VK_CONTROL),
        shift: key_down(VK_SHIFT),
        alt: key_down(VK_MENU),
        win: key_down(VK_LWIN) || key_down(VK_RWIN),
    }
}

/// Modifier state including the event being delivered, which
/// `GetAsyncKeyState` does not reflect yet.
fn modifiers_after(vk: u16, up: bool) -> Modifiers {
    let mut m = live_modifiers();
    let slot = match vk {
        keys::VK_SHIFT | keys::VK_LSHIFT | keys::VK_RSHIFT => &mut m.shift,
        keys::VK_CONTROL | keys::VK_LCONTROL | keys::VK_RCONTROL => &mut m.ctrl,
        keys::VK_MENU | keys::VK_LMENU | keys::VK_RMENU => &mut m.alt,
        keys::VK_LWIN | keys::VK_RWIN => &mut m.win,
        _ => return m,
    };
    *slot = !up;
    m
}

unsafe extern "system" fn hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code < 0 {
        return CallNextHookEx(None, code, wparam, lparam);
    }
    WATCHDOG.on_callback(now_ms());

    let kbd = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
    if kbd.dwExtraInfo == INJECTED_EXTRA_INFO {
        return CallNextHookEx(None, code, wparam, lparam);
    }

    let Some(interceptor) = INTERCEPTOR.lock().clone() else {
        return CallNextHookEx(None, code, wparam, lparam);
    };

    let msg = wparam.0 as u32;
    let up = msg == WM_KEYUP || msg == WM_SYSKEYUP;
    let vk = kbd.vkCode as u16;

    // Modifier events always reach the OS so its key state stays right.
    if keys::is_modifier(vk) && vk != keys::VK_CAPITAL {
        interceptor.on_modifiers_changed(modifiers_after(vk, up));
        return CallNextHookEx(None, code, wparam, lparam);
    }
    if up {
        return CallNextHookEx(None, code, wparam, lparam);
    }

    let event = RawKeyEvent {
        vk,
        modifiers: live_modifiers(),
        caps_lock: GetKeyState(VK_CAPITAL.0 as i32) & 1 != 0,
        extra_info: kbd.dwExtraInfo,
    };
    match interceptor.on_key_down(&event) {
        HookVerdict::Pass => CallNextHookEx(None, code, wparam, lparam),
        HookVerdict::Block => LRESULT(1),
    }
}

fn key_input(vk: u16, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: INJECTED_EXTRA_INFO,
            },
        },
    }
}

/// Key-up and extended bits for an injected key.
fn key_flags(vk: u16, up: bool) -> KEYBD_EVENT_FLAGS {
    let mut flags = if up {
        KEYEVENTF_KEYUP
    } else {
        KEYBD_EVENT_FLAGS(0)
    };
    if keys::is_extended(vk) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    flags
}

/// Posts events with `SendInput`, tagged with the sentinel.
#[derive(Debug, Default)]
pub struct SendInputSink;

impl SendInputSink {
    fn send(inputs: &[INPUT]) -> Result<(), InjectError> {
        let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(InjectError::Rejected(format!(
                "SendInput inserted {} of {} events",
                sent,
                inputs.len()
            )));
        }
        Ok(())
    }
}

impl KeySink for SendInputSink {
    fn post(&mut self, event: &InputEvent) -> Result<(), InjectError> {
        match event {
            InputEvent::Key { vk, up, modifiers } => {
                let key = key_input(*vk, 0, key_flags(*vk, *up));
                let held = modifiers
                    .held_keys()
                    .into_iter()
                    .map(|m| key_input(m, 0, key_flags(m, *up)));
                let inputs: Vec<INPUT> = if *up {
                    std::iter::once(key).chain(held.rev()).collect()
                } else {
                    held.chain(std::iter::once(key)).collect()
                };
                Self::send(&inputs)
            }
            InputEvent::Text(text) => {
                let inputs: Vec<INPUT> = text
                    .encode_utf16()
                    .flat_map(|unit| {
                        [
                            key_input(0, unit, KEYEVENTF_UNICODE),
                            key_input(0, unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
                        ]
                    })
                    .collect();
                Self::send(&inputs)
            }
        }
    }
}

/// Foreground process image name and focused control class.
#[derive(Default)]
pub struct WinAppProbe {
    /// Last foreground window and its process name.
    cache: Mutex<Option<(isize, String)>>,
}

impl AppProbe for WinAppProbe {
    fn foreground_app(&self) -> Option<String> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0 == 0 {
            return None;
        }
        if let Some((cached, name)) = self.cache.lock().as_ref() {
            if *cached == hwnd.0 {
                return Some(name.clone());
            }
        }
        match process_image_name(hwnd) {
            Ok(name) => {
                *self.cache.lock() = Some((hwnd.0, name.clone()));
                Some(name)
            }
            Err(e) => {
                warn!("Foreground app lookup failed: {:#}", e);
                None
            }
        }
    }

    fn focused_role(&self) -> FocusRole {
        let mut info = GUITHREADINFO {
            cbSize: std::mem::size_of::<GUITHREADINFO>() as u32,
            ..Default::default()
        };
        if unsafe { GetGUIThreadInfo(0, &mut info) }.is_err() || info.hwndFocus.0 == 0 {
            return FocusRole::Unknown;
        }
        let mut buf = [0u16; 128];
        let len = unsafe { GetClassNameW(info.hwndFocus, &mut buf) };
        let class = String::from_utf16_lossy(&buf[..len.max(0) as usize]);
        role_for_class(&class)
    }
}

fn role_for_class(class: &str) -> FocusRole {
    let class = class.to_ascii_lowercase();
    if class.contains("combobox") {
        FocusRole::ComboBox
    } else if class.contains("edit")
        || class.starts_with("chrome_renderwidgethost")
        || class.starts_with("mozillawindowclass")
        || class.starts_with("sunawt")
    {
        FocusRole::TextField
    } else {
        FocusRole::Unknown
    }
}

fn process_image_name(hwnd: HWND) -> anyhow::Result<String> {
    let mut pid = 0u32;
    unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
    if pid == 0 {
        anyhow::bail!("window has no owning process");
    }
    let process = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }
        .with_context(|| format!("OpenProcess({pid})"))?;
    let mut buf = [0u16; 260];
    let mut len = buf.len() as u32;
    let queried = unsafe {
        QueryFullProcessImageNameW(process, PROCESS_NAME_WIN32, PWSTR(buf.as_mut_ptr()), &mut len)
    };
    unsafe {
        let _ = CloseHandle(process);
    }
    queried.context("QueryFullProcessImageNameW")?;
    let path = String::from_utf16_lossy(&buf[..len as usize]);
    Ok(path.rsplit('\\').next().unwrap_or(&path).to_string())
}
