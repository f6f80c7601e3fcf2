use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared with the external render loop.
///
/// The server only ever sets it; the render loop polls it between frames and
/// stops on its own. Clones observe the same flag, so a token can be handed
/// to a signal handler or another thread.
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    flag: Arc<AtomicBool>,
}

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the render loop to stop producing frames.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag before the next render starts.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Underlying flag, for handlers that take a bare `Arc<AtomicBool>`.
    pub fn as_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}
