//! Single-flight session state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide upload session flag.
///
/// Shared by every gate that must not overlap; at most one [`InFlight`]
/// guard exists at any time.
#[derive(Debug, Default)]
pub struct SessionState {
    in_flight: AtomicBool,
}

impl SessionState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Begins a session. Returns `None` if one is already in flight.
    pub fn try_begin(self: &Arc<Self>) -> Option<InFlight> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight {
                state: Arc::clone(self),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Proof that a session is in flight. Ends the session when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard ends the session immediately"]
pub struct InFlight {
    state: Arc<SessionState>,
}

impl InFlight {
    /// Ends the session.
    pub fn end(self) {
        drop(self);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.state.in_flight.store(false, Ordering::Release);
    }
}
