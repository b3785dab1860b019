//! Synthetic delete-and-insert sequences.
//!
//! The hook thread only enqueues. A worker thread plays each request to the
//! sink under a fair mutex, so a sequence and its settle delays finish
//! before the next one starts and text lands in the order it was typed.

use crate::keys::{self, VK_BACK, VK_LEFT};
use crate::policy::AppProbe;
use crate::profiles::{self, Technique, TimingProfile};
use crate::types::{InputEvent, Modifiers, TransformResult};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, FairMutex, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InjectError {
    #[error("synthetic input rejected: {0}")]
    Rejected(String),
    #[error("injection worker has stopped")]
    WorkerGone,
}

/// Destination of synthetic input.
pub trait KeySink: Send {
    fn post(&mut self, event: &InputEvent) -> Result<(), InjectError>;

    /// UTF-16 units accepted by one `Text` event.
    fn max_chunk_units(&self) -> usize {
        20
    }

    fn pause(&mut self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// A key to type after the correction, standing in for a key the hook
/// swallowed. Keeps the modifier and Caps Lock state it was pressed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayKey {
    pub vk: u16,
    pub modifiers: Modifiers,
    pub caps_lock: bool,
}

impl ReplayKey {
    pub fn new(vk: u16, modifiers: Modifiers, caps_lock: bool) -> Self {
        Self {
            vk,
            modifiers,
            caps_lock,
        }
    }

    /// A plain letter replays as the character it produced, so a change of
    /// Shift or Caps Lock before the replay cannot alter its case.
    pub fn as_text(&self) -> Option<char> {
        if !keys::is_letter(self.vk) || self.modifiers.is_chord() {
            return None;
        }
        let c = keys::to_char(self.vk)?;
        if self.modifiers.shift ^ self.caps_lock {
            Some(c.to_ascii_uppercase())
        } else {
            Some(c)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionRequest {
    pub backspace: usize,
    pub text: String,
    pub replay: Option<ReplayKey>,
}

impl InjectionRequest {
    pub fn from_result(result: &TransformResult) -> Self {
        Self {
            backspace: result.backspace(),
            text: result.text(),
            replay: None,
        }
    }

    pub fn replay(key: ReplayKey) -> Self {
        Self {
            replay: Some(key),
            ..Self::default()
        }
    }

    pub fn with_replay(mut self, key: ReplayKey) -> Self {
        self.replay = Some(key);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.backspace == 0 && self.text.is_empty() && self.replay.is_none()
    }
}

/// Splits `text` into pieces of at most `max_units` UTF-16 units without
/// breaking a surrogate pair.
pub fn chunk_utf16(text: &str, max_units: usize) -> Vec<String> {
    let max_units = max_units.max(2);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut units = 0;
    for c in text.chars() {
        let n = c.len_utf16();
        if units + n > max_units {
            chunks.push(std::mem::take(&mut current));
            units = 0;
        }
        current.push(c);
        units += n;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn tap(sink: &mut dyn KeySink, vk: u16, modifiers: Modifiers) -> Result<(), InjectError> {
    sink.post(&InputEvent::Key {
        vk,
        up: false,
        modifiers,
    })?;
    sink.post(&InputEvent::Key {
        vk,
        up: true,
        modifiers,
    })
}

/// Plays one request. Runs with the sink lock held.
fn play(
    sink: &mut dyn KeySink,
    profile: &TimingProfile,
    req: &InjectionRequest,
) -> Result<(), InjectError> {
    if req.backspace > 0 {
        let (vk, shift) = match profile.technique {
            Technique::Backspace => (VK_BACK, false),
            Technique::Selection => (VK_LEFT, true),
        };
        for _ in 0..req.backspace {
            tap(sink, vk, Modifiers::with_shift(shift))?;
            sink.pause(profile.key_delay);
        }
        if profile.technique == Technique::Selection && req.text.is_empty() {
            tap(sink, VK_BACK, Modifiers::none())?;
        }
        sink.pause(profile.settle_delay);
    }
    for chunk in chunk_utf16(&req.text, sink.max_chunk_units()) {
        sink.post(&InputEvent::Text(chunk))?;
        sink.pause(profile.chunk_delay);
    }
    if let Some(key) = req.replay {
        match key.as_text() {
            Some(c) => sink.post(&InputEvent::Text(c.to_string()))?,
            None => tap(sink, key.vk, key.modifiers)?,
        }
    }
    sink.pause(profile.final_settle);
    Ok(())
}

#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn add(&self) {
        *self.count.lock() += 1;
    }

    fn done(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

type SharedSink = Arc<FairMutex<Box<dyn KeySink>>>;

/// Serialized injection pipeline.
pub struct Injector {
    sink: SharedSink,
    probe: Arc<dyn AppProbe>,
    pending: Arc<Pending>,
    tx: Mutex<Option<Sender<InjectionRequest>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Injector {
    /// Starts the worker thread.
    pub fn spawn(sink: Box<dyn KeySink>, probe: Arc<dyn AppProbe>) -> std::io::Result<Self> {
        let sink: SharedSink = Arc::new(FairMutex::new(sink));
        let pending = Arc::new(Pending::default());
        let (tx, rx) = crossbeam_channel::unbounded();

        let worker = std::thread::Builder::new()
            .name("chuviet-inject".into())
            .spawn({
                let sink = sink.clone();
                let probe = probe.clone();
                let pending = pending.clone();
                move || worker_loop(rx, sink, probe, pending)
            })?;
        info!("Injection worker started");

        Ok(Self {
            sink,
            probe,
            pending,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queues a request behind everything already queued.
    pub fn submit(&self, req: InjectionRequest) -> Result<(), InjectError> {
        if req.is_empty() {
            return Ok(());
        }
        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else {
            return Err(InjectError::WorkerGone);
        };
        self.pending.add();
        if tx.send(req).is_err() {
            self.pending.done();
            return Err(InjectError::WorkerGone);
        }
        Ok(())
    }

    /// Plays a request on the calling thread. Waits for any sequence in
    /// progress, and holds off the worker until done.
    pub fn inject_blocking(&self, req: &InjectionRequest) -> Result<(), InjectError> {
        let profile = current_profile(self.probe.as_ref());
        let mut sink = self.sink.lock();
        play(&mut **sink, &profile, req)
    }

    /// Whether a queued request has not finished playing yet.
    pub fn is_busy(&self) -> bool {
        *self.pending.count.lock() > 0
    }

    /// Waits until the queue is drained. Returns false on timeout.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.pending.count.lock();
        while *count > 0 {
            if self.pending.idle.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }

    /// Stops accepting requests, lets the worker finish the queue and joins it.
    pub fn shutdown(&self) {
        let tx = self.tx.lock().take();
        if tx.is_none() {
            return;
        }
        drop(tx);
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!("Injection worker panicked");
            }
        }
        info!("Injection worker stopped");
    }
}

impl Drop for Injector {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn current_profile(probe: &dyn AppProbe) -> TimingProfile {
    let app = probe.foreground_app();
    let profile = profiles::profile_for(app.as_deref(), probe.focused_role());
    debug!("Injecting with '{}' profile for {:?}", profile.name, app);
    profile
}

fn worker_loop(
    rx: Receiver<InjectionRequest>,
    sink: SharedSink,
    probe: Arc<dyn AppProbe>,
    pending: Arc<Pending>,
) {
    for req in rx.iter() {
        let profile = current_profile(probe.as_ref());
        {
            let mut sink = sink.lock();
            if let Err(e) = play(&mut **sink, &profile, &req) {
                warn!("Injection failed: {}", e);
            }
        }
        pending.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NoProbe;
    use crate::profiles::FocusRole;

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<InputEvent>>>,
    }

    impl KeySink for Recorder {
        fn post(&mut self, event: &InputEvent) -> Result<(), InjectError> {
            self.events.lock().push(event.clone());
            Ok(())
        }

        fn pause(&mut self, _delay: Duration) {}
    }

    struct Combo;

    impl AppProbe for Combo {
        fn foreground_app(&self) -> Option<String> {
            Some("notepad.exe".into())
        }

        fn focused_role(&self) -> FocusRole {
            FocusRole::ComboBox
        }
    }

    fn key(vk: u16, up: bool, shift: bool) -> InputEvent {
        InputEvent::Key {
            vk,
            up,
            modifiers: Modifiers::with_shift(shift),
        }
    }

    fn plain(vk: u16) -> ReplayKey {
        ReplayKey::new(vk, Modifiers::none(), false)
    }

    #[test]
    fn chunks_respect_surrogates() {
        assert_eq!(chunk_utf16("abcde", 2), vec!["ab", "cd", "e"]);
        let emoji = "a😀b";
        let chunks = chunk_utf16(emoji, 2);
        assert_eq!(chunks, vec!["a", "😀", "b"]);
        assert!(chunk_utf16("", 20).is_empty());
    }

    #[test]
    fn backspace_sequence_order() {
        let rec = Recorder::default();
        let inj = Injector::spawn(Box::new(rec.clone()), Arc::new(NoProbe)).unwrap();
        let req = InjectionRequest {
            backspace: 2,
            text: "ệt".into(),
            replay: None,
        }
        .with_replay(plain(0x20));
        inj.inject_blocking(&req).unwrap();
        assert_eq!(
            *rec.events.lock(),
            vec![
                key(VK_BACK, false, false),
                key(VK_BACK, true, false),
                key(VK_BACK, false, false),
                key(VK_BACK, true, false),
                InputEvent::Text("ệt".into()),
                key(0x20, false, false),
                key(0x20, true, false),
            ]
        );
    }

    #[test]
    fn selection_technique_overtypes() {
        let rec = Recorder::default();
        let inj = Injector::spawn(Box::new(rec.clone()), Arc::new(Combo)).unwrap();
        inj.inject_blocking(&InjectionRequest {
            backspace: 1,
            text: "ư".into(),
            replay: None,
        })
        .unwrap();
        assert_eq!(
            *rec.events.lock(),
            vec![
                key(VK_LEFT, false, true),
                key(VK_LEFT, true, true),
                InputEvent::Text("ư".into()),
            ]
        );
    }

    #[test]
    fn replayed_letters_keep_their_case() {
        let shifted = ReplayKey::new(keys::vk('b'), Modifiers::with_shift(true), false);
        assert_eq!(shifted.as_text(), Some('B'));
        let caps = ReplayKey::new(keys::vk('b'), Modifiers::none(), true);
        assert_eq!(caps.as_text(), Some('B'));
        let both = ReplayKey::new(keys::vk('b'), Modifiers::with_shift(true), true);
        assert_eq!(both.as_text(), Some('b'));
        assert_eq!(plain(0x20).as_text(), None);

        let altgr = Modifiers::from_bits(Modifiers::CTRL | Modifiers::ALT);
        let chord = ReplayKey::new(keys::vk('e'), altgr, false);
        assert_eq!(chord.as_text(), None);

        let rec = Recorder::default();
        let inj = Injector::spawn(Box::new(rec.clone()), Arc::new(NoProbe)).unwrap();
        inj.inject_blocking(&InjectionRequest::replay(shifted)).unwrap();
        inj.inject_blocking(&InjectionRequest::replay(chord)).unwrap();
        assert_eq!(
            *rec.events.lock(),
            vec![
                InputEvent::Text("B".into()),
                InputEvent::Key {
                    vk: keys::vk('e'),
                    up: false,
                    modifiers: altgr
                },
                InputEvent::Key {
                    vk: keys::vk('e'),
                    up: true,
                    modifiers: altgr
                },
            ]
        );
    }

    #[test]
    fn worker_drains_in_order() {
        let rec = Recorder::default();
        let inj = Injector::spawn(Box::new(rec.clone()), Arc::new(NoProbe)).unwrap();
        for i in 0..50 {
            inj.submit(InjectionRequest {
                backspace: 0,
                text: format!("{i},"),
                replay: None,
            })
            .unwrap();
        }
        assert!(inj.flush(Duration::from_secs(5)));
        assert!(!inj.is_busy());
        let text: String = rec
            .events
            .lock()
            .iter()
            .map(|e| match e {
                InputEvent::Text(t) => t.as_str(),
                _ => "",
            })
            .collect();
        let expected: String = (0..50).map(|i| format!("{i},")).collect();
        assert_eq!(text, expected);
    }

    #[test]
    fn submit_after_shutdown_fails() {
        let inj = Injector::spawn(Box::new(Recorder::default()), Arc::new(NoProbe)).unwrap();
        inj.shutdown();
        assert_eq!(
            inj.submit(InjectionRequest::replay(plain(0x20))),
            Err(InjectError::WorkerGone)
        );
        assert!(inj.submit(InjectionRequest::default()).is_ok());
    }
}
