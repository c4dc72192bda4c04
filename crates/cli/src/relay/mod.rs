//! Relay assembly and orchestration.

mod orchestrator;

pub use orchestrator::{Relay, RelayConfig};
