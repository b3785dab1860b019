//! Runs the engine against the real keyboard. Pass a settings JSON file to
//! load shortcuts and exclusions; without one the defaults apply (Telex,
//! Ctrl+Shift toggles).

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use chuviet_core::{keyboard_hook, EngineContext, Settings};
    use std::sync::Arc;

    tracing_subscriber::fmt::init();

    let context = Arc::new(EngineContext::new());
    if let Some(path) = std::env::args().nth(1) {
        let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        let settings: Settings = serde_json::from_str(&raw).context("parsing settings")?;
        context.apply_settings(&settings);
        println!("Loaded settings from {path}");
    }

    println!("Starting hook, method = {:?}", context.method());
    keyboard_hook::run(context)
}

#[cfg(not(windows))]
fn main() {
    eprintln!("simple_hook needs the Windows keyboard hook");
}
