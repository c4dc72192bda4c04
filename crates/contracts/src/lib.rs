//! # Contracts
//!
//! Frozen interface contracts shared by every relay crate.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every `RawCode` is stamped with a monotonic `Instant` at receipt
//! - Deduplication windows are measured on that clock, never on wall time

mod blueprint;
mod error;
mod outcome;
mod persistence;
mod reading;
mod sink;
mod source;

pub use blueprint::*;
pub use error::*;
pub use outcome::*;
pub use persistence::*;
pub use reading::*;
pub use sink::*;
pub use source::{CodeCallback, CodeSource};
