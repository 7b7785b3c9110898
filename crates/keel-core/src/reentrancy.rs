// crates/keel-core/src/reentrancy.rs
//
// Re-entrancy gate for policy entry points that perform external transfers
// before their internal accounting is final.
//
// The gate is a plain field on the policy struct; entry points acquire it
// with a scoped RAII guard. A nested acquisition while the guard is live
// fails immediately with KeelError::Reentrancy.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::KeelError;

/// A single-entry gate. One guard may be live at a time.
#[derive(Debug, Default)]
pub struct ReentrancyGate {
    entered: AtomicBool,
}

impl ReentrancyGate {
    /// Create a new, unlocked gate.
    pub fn new() -> Self {
        Self {
            entered: AtomicBool::new(false),
        }
    }

    /// Acquire the gate for the duration of the returned guard.
    ///
    /// # Errors
    /// Returns `KeelError::Reentrancy` if a guard from this gate is already
    /// live.
    pub fn enter(&self, entry_point: &str) -> Result<ReentrancyGuard<'_>, KeelError> {
        if self
            .entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(KeelError::Reentrancy(format!(
                "re-entrant call into {}",
                entry_point
            )));
        }
        Ok(ReentrancyGuard { gate: self })
    }
}

/// RAII guard returned by [`ReentrancyGate::enter`]; releases on drop.
#[derive(Debug)]
pub struct ReentrancyGuard<'a> {
    gate: &'a ReentrancyGate,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.gate.entered.store(false, Ordering::Release);
    }
}
