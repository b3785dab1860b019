//! Per-application enable/disable decisions.

use crate::profiles::FocusRole;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Identity of whatever currently has keyboard focus.
pub trait AppProbe: Send + Sync {
    /// Process image name or bundle identifier of the foreground app.
    fn foreground_app(&self) -> Option<String>;

    fn focused_role(&self) -> FocusRole {
        FocusRole::Unknown
    }
}

/// Probe for hosts that cannot tell which app is focused.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl AppProbe for NoProbe {
    fn foreground_app(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppPolicy {
    excluded: HashSet<String>,
    smart_mode: bool,
    per_app_modes: HashMap<String, bool>,
    current_app: Option<String>,
    /// Enabled state when the current run of excluded apps began.
    enabled_before_exclusion: Option<bool>,
}

fn normalize(app: &str) -> String {
    app.trim().to_lowercase()
}

impl AppPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_excluded<I, S>(&mut self, apps: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded = apps.into_iter().map(|a| normalize(a.as_ref())).collect();
    }

    pub fn set_smart_mode(&mut self, on: bool) {
        self.smart_mode = on;
    }

    pub fn set_per_app_modes(&mut self, modes: &HashMap<String, bool>) {
        self.per_app_modes = modes.iter().map(|(k, v)| (normalize(k), *v)).collect();
    }

    pub fn per_app_modes(&self) -> &HashMap<String, bool> {
        &self.per_app_modes
    }

    pub fn is_excluded(&self, app: &str) -> bool {
        self.excluded.contains(&normalize(app))
    }

    pub fn current_app(&self) -> Option<&str> {
        self.current_app.as_deref()
    }

    pub fn is_current(&self, app: &str) -> bool {
        self.current_app.as_deref() == Some(normalize(app).as_str())
    }

    pub fn in_excluded_app(&self) -> bool {
        self.enabled_before_exclusion.is_some()
    }

    /// Records a foreground change. Returns the enabled state the engine
    /// should switch to, if any.
    pub fn on_app_activated(&mut self, app: &str, currently_enabled: bool) -> Option<bool> {
        if self.is_current(app) {
            return None;
        }
        let app = normalize(app);
        self.current_app = Some(app.clone());

        if self.excluded.contains(&app) {
            if self.enabled_before_exclusion.is_none() {
                self.enabled_before_exclusion = Some(currently_enabled);
            }
            debug!("Excluded app '{}' focused, disabling", app);
            return Some(false);
        }

        let mut target = self.enabled_before_exclusion.take();
        if self.smart_mode {
            if let Some(&pref) = self.per_app_modes.get(&app) {
                target = Some(pref);
            }
        }
        if let Some(enabled) = target {
            debug!("App '{}' focused, enabled = {}", app, enabled);
        }
        target
    }

    /// Re-runs the exclusion decision for the focused app after the list
    /// changed. Returns the enabled state to switch to, if any.
    pub fn reevaluate_current(&mut self, currently_enabled: bool) -> Option<bool> {
        let app = self.current_app.as_deref()?;
        if self.excluded.contains(app) {
            if self.enabled_before_exclusion.is_none() {
                debug!("Focused app '{}' is now excluded, disabling", app);
                self.enabled_before_exclusion = Some(currently_enabled);
            }
            return Some(false);
        }
        let prior = self.enabled_before_exclusion.take()?;
        debug!("Focused app '{}' no longer excluded, enabled = {}", app, prior);
        Some(prior)
    }

    /// Remembers a manual toggle for the focused app in smart mode.
    pub fn on_manual_toggle(&mut self, enabled: bool) {
        if !self.smart_mode || self.in_excluded_app() {
            return;
        }
        if let Some(app) = &self.current_app {
            self.per_app_modes.insert(app.clone(), enabled);
        }
    }
}
