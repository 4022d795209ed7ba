use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A flag that can be used to cancel scheduling.
///
/// Clones share the flag: the proposer keeps one and cancels it once its time budget is spent,
/// the scheduler checks another between transaction trials.
#[derive(Default, Clone, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

// === impl CancelToken ===

impl CancelToken {
    /// Returns true if scheduling was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Sets the cancelled flag on all clones.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}
