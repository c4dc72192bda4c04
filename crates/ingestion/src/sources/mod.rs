//! Code sources
//!
//! Every source runs its own receive thread and hands codes to the callback as
//! they arrive, the same shape a radio driver interrupt would have.

mod replay;
mod scripted;
mod stdin;

pub use replay::{ReplayConfig, ReplaySource};
pub use scripted::{ScriptedSource, ScriptedStep};
pub use stdin::StdinSource;
