pub mod buffer;
pub mod capitalize;
pub mod chars;
pub mod config;
pub mod context;
pub mod engine;
pub mod ffi;
pub mod injection;
pub mod interceptor;
#[cfg(windows)]
pub mod keyboard_hook;
pub mod keys;
pub mod phonology;
pub mod policy;
pub mod profiles;
pub mod restore;
pub mod scheme;
pub mod shortcut;
pub mod toggle;
pub mod types;

pub use config::{EngineConfig, Settings, ShortcutEntry};
pub use context::{ControlEvent, EngineContext};
pub use engine::Engine;
pub use injection::{InjectError, InjectionRequest, Injector, KeySink};
pub use interceptor::{HookError, Interceptor, KeyboardHook, RawKeyEvent};
pub use policy::{AppPolicy, AppProbe};
pub use scheme::Method;
pub use toggle::ToggleShortcut;
pub use types::{Action, TransformResult};
