//! Stdin source - one decimal code per line from standard input
//!
//! Stands in for the radio driver when codes are piped from an external
//! receiver process (e.g. an RF sniffer printing one code per line).

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use contracts::{CodeCallback, CodeSource, RawCode};
use tracing::{debug, info, warn};

/// Stdin code source
pub struct StdinSource {
    listening: Arc<AtomicBool>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeSource for StdinSource {
    fn name(&self) -> &str {
        "stdin"
    }

    fn listen(&self, callback: CodeCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = Arc::clone(&self.listening);

        // Detached: a blocking read cannot be interrupted, so stop takes effect
        // on the next line or at end of input.
        thread::spawn(move || {
            debug!("stdin reader started");
            let stdin = io::stdin();

            for line in stdin.lock().lines() {
                if !listening.load(Ordering::Relaxed) {
                    break;
                }
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    }
                };
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                match trimmed.parse::<u32>() {
                    Ok(code) => callback(RawCode::new(code)),
                    Err(e) => warn!(line = %trimmed, error = %e, "ignoring malformed code"),
                }
            }

            info!("stdin closed");
            listening.store(false, Ordering::SeqCst);
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
