//! Re-entrancy guard for cycles
//!
//! A cycle calls [`CycleGuard::try_enter`] on entry. Only one caller at a
//! time gets a [`CycleToken`]; the flag is released when the token drops, so
//! early returns, errors and panics all clear it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct CycleGuard {
    running: Arc<AtomicBool>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard; `None` if another run holds it
    pub fn try_enter(&self) -> Option<CycleToken> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleToken {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[must_use = "the guard is released as soon as the token is dropped"]
pub struct CycleToken {
    running: Arc<AtomicBool>,
}

impl Drop for CycleToken {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
