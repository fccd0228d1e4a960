//! Cooperative cancellation and percentage progress reporting.
//!
//! Long operations (index building, searching, range export) poll an
//! [`AbortFlag`] at every chunk or batch boundary and report a 0-100
//! percentage through a [`Progress`] sink. Neither is preemptive: work
//! already started on a chunk always completes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared abort flag, cheap to clone and safe to set from another thread
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the owning operation stop at its next boundary
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Return `Err(Cancelled)` if an abort has been requested
    pub fn check(&self) -> crate::Result<()> {
        if self.is_aborted() {
            Err(crate::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Receiver for percentage updates
pub trait Progress {
    fn report(&mut self, percent: u8);
}

impl<F: FnMut(u8)> Progress for F {
    fn report(&mut self, percent: u8) {
        self(percent)
    }
}

/// Progress sink that discards every update
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Turns `done / total` counts into a non-decreasing percentage stream.
///
/// Only forwards a value when it rises above the last one sent, so sinks
/// never observe progress going backwards or repeated updates.
pub struct PercentTracker<'a> {
    sink: &'a mut dyn Progress,
    total: u64,
    last: Option<u8>,
    min_step: u8,
}

impl<'a> PercentTracker<'a> {
    pub fn new(sink: &'a mut dyn Progress, total: u64) -> Self {
        Self {
            sink,
            total,
            last: None,
            min_step: 1,
        }
    }

    /// Only forward updates that advance by at least `step` points (100 always passes)
    pub fn with_min_step(mut self, step: u8) -> Self {
        self.min_step = step.max(1);
        self
    }

    pub fn update(&mut self, done: u64) {
        let percent = if self.total == 0 {
            100
        } else {
            ((done.min(self.total) as u128 * 100) / self.total as u128) as u8
        };

        let advance = match self.last {
            None => true,
            Some(last) => percent > last && (percent - last >= self.min_step || percent == 100),
        };

        if advance {
            self.last = Some(percent);
            self.sink.report(percent);
        }
    }
}
