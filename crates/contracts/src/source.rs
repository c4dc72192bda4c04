//! CodeSource trait - receiver abstraction
//!
//! The radio receiver driver is an external collaborator that delivers one raw
//! code per reception event. This trait is the seam it plugs into; recorded
//! replays and scripted test sources implement it the same way.

use std::sync::Arc;

use crate::RawCode;

/// Code callback type
///
/// Invoked once per reception event. Uses `Arc` so the callback can be shared
/// with a background receive thread.
pub type CodeCallback = Arc<dyn Fn(RawCode) + Send + Sync>;

/// Raw code source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn CodeSource> = open_source();
/// source.listen(Arc::new(|code| {
///     println!("received {}", code.value);
/// }));
/// // ...
/// source.stop();
/// ```
pub trait CodeSource: Send + Sync {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Register the reception callback
    ///
    /// Repeated calls while listening are idempotent.
    fn listen(&self, callback: CodeCallback);

    /// Stop receiving
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
