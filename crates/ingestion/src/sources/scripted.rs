//! Scripted source - a fixed list of codes with per-code delays

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{CodeCallback, CodeSource, RawCode};
use tracing::{debug, info, warn};

/// One scripted emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedStep {
    /// Wait before emitting, relative to the previous step
    pub delay: Duration,
    /// Raw code to emit
    pub code: u32,
}

impl ScriptedStep {
    pub fn new(delay: Duration, code: u32) -> Self {
        Self { delay, code }
    }
}

/// Scripted code source
///
/// Plays its steps once on a background thread and then finishes; the
/// callback is dropped with the thread.
pub struct ScriptedSource {
    name: String,
    steps: Vec<ScriptedStep>,
    speed: f64,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScriptedSource {
    /// Create a source from explicit steps
    pub fn new(name: impl Into<String>, steps: Vec<ScriptedStep>) -> Self {
        Self {
            name: name.into(),
            steps,
            speed: 1.0,
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    /// Create a source that emits every code back to back
    pub fn immediate(name: impl Into<String>, codes: impl IntoIterator<Item = u32>) -> Self {
        let steps = codes
            .into_iter()
            .map(|code| ScriptedStep::new(Duration::ZERO, code))
            .collect();
        Self::new(name, steps)
    }

    /// Scale every delay by `1 / speed`
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed.max(0.001);
        self
    }

    /// Scripted steps
    pub fn steps(&self) -> &[ScriptedStep] {
        &self.steps
    }

    /// Block until the playback thread finishes
    pub fn join(&self) {
        let handle = self.handle_slot().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.join() {
                warn!(source = %self.name, error = ?e, "Playback thread panicked");
            }
        }
    }

    fn handle_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.thread_handle.lock().unwrap_or_else(|poisoned| {
            warn!(source = %self.name, "playback handle lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl CodeSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn listen(&self, callback: CodeCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = Arc::clone(&self.listening);
        let name = self.name.clone();
        let steps = self.steps.clone();
        let speed = self.speed;

        let handle = thread::spawn(move || {
            debug!(source = %name, steps = steps.len(), "scripted playback started");

            for step in &steps {
                if !step.delay.is_zero() {
                    thread::sleep(step.delay.div_f64(speed));
                }
                if !listening.load(Ordering::Relaxed) {
                    debug!(source = %name, "scripted playback stopped");
                    return;
                }
                callback(RawCode::new(step.code));
            }

            info!(source = %name, "scripted playback completed");
            listening.store(false, Ordering::SeqCst);
        });

        *self.handle_slot() = Some(handle);
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
