//! Time-windowed deduplication gate
//!
//! Transmitters repeat every code several times per burst. A code equal to the
//! last accepted one is a retransmission until the window (measured from the
//! last *accepted* time) has elapsed; after that it is a new observation, which
//! happens whenever an environment reading is unchanged between aggregates.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use contracts::{DedupConfig, DedupScope, RawCode, StationCode};
use tracing::trace;

/// Last accepted code and when it was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupState {
    pub last_code: u32,
    pub last_accepted_at: Instant,
}

/// Deduplication gate
///
/// Owned by a single pipeline; `accept` takes `&mut self`, so no locking.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    window: Duration,
    scope: DedupScope,
    global: Option<DedupState>,
    per_station: HashMap<StationCode, Option<DedupState>>,
}

impl Deduplicator {
    /// Create a gate from configuration
    pub fn new(config: &DedupConfig) -> Self {
        Self::with_window(config.window(), config.scope)
    }

    /// Create a gate with an explicit window
    pub fn with_window(window: Duration, scope: DedupScope) -> Self {
        Self {
            window,
            scope,
            global: None,
            per_station: HashMap::new(),
        }
    }

    /// Window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether `code` is a new observation
    ///
    /// On `true` the state is replaced with `(code, now)` before returning, so
    /// the caller's downstream work always happens after the update. On `false`
    /// the state is untouched. A `now` earlier than the last acceptance counts
    /// as zero elapsed time.
    pub fn accept(&mut self, code: u32, now: Instant) -> bool {
        let window = self.window;
        let slot = match self.scope {
            DedupScope::Global => &mut self.global,
            DedupScope::PerStation => self
                .per_station
                .entry(StationCode::from_code(code))
                .or_insert(None),
        };

        let accepted = Self::is_new(*slot, code, now, window);
        if accepted {
            *slot = Some(DedupState {
                last_code: code,
                last_accepted_at: now,
            });
        }
        accepted
    }

    /// `accept` using the code's own receipt time
    pub fn accept_code(&mut self, raw: &RawCode) -> bool {
        self.accept(raw.value, raw.received_at)
    }

    /// Current global state (None before the first acceptance or in per-station scope)
    pub fn state(&self) -> Option<DedupState> {
        self.global
    }

    fn is_new(state: Option<DedupState>, code: u32, now: Instant, window: Duration) -> bool {
        let Some(state) = state else {
            return true;
        };
        if state.last_code != code {
            return true;
        }
        let elapsed = now.saturating_duration_since(state.last_accepted_at);
        trace!(code, elapsed_ms = elapsed.as_millis() as u64, "repeated code");
        elapsed >= window
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(&DedupConfig::default())
    }
}
