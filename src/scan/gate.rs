//! Single-slot frame admission
//!
//! At most one frame is analyzed at a time. A frame that arrives while an
//! analysis is running, or sooner than the minimum interval after the last
//! admitted frame, is refused and should be dropped by the caller. Refused
//! frames are never queued.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct GateState {
    busy: bool,
    last_admitted: Option<Instant>,
}

/// Outcome of asking the gate for a slot
#[derive(Debug)]
pub enum Admission {
    /// The slot is yours until the permit is dropped
    Admitted(FramePermit),
    /// Another frame is being analyzed
    Busy,
    /// The previous frame was admitted too recently
    Throttled,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

/// Proof of admission; frees the slot when dropped
#[derive(Debug)]
pub struct FramePermit {
    state: Arc<Mutex<GateState>>,
    admitted_at: Instant,
}

impl FramePermit {
    /// When the frame was admitted
    pub fn admitted_at(&self) -> Instant {
        self.admitted_at
    }
}

impl Drop for FramePermit {
    fn drop(&mut self) {
        self.state.lock().busy = false;
    }
}

/// Admission gate shared by the frame source and the analysis worker
#[derive(Debug, Clone)]
pub struct FrameGate {
    state: Arc<Mutex<GateState>>,
    min_interval: Duration,
}

impl FrameGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::default())),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Try to take the slot now
    pub fn try_admit(&self) -> Admission {
        self.try_admit_at(Instant::now())
    }

    /// Try to take the slot at a given instant
    pub fn try_admit_at(&self, now: Instant) -> Admission {
        let mut state = self.state.lock();
        if state.busy {
            return Admission::Busy;
        }
        if let Some(last) = state.last_admitted {
            if now.saturating_duration_since(last) < self.min_interval {
                return Admission::Throttled;
            }
        }

        state.busy = true;
        state.last_admitted = Some(now);
        Admission::Admitted(FramePermit {
            state: Arc::clone(&self.state),
            admitted_at: now,
        })
    }

    /// Whether an analysis currently holds the slot
    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }
}
