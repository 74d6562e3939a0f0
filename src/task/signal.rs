//! Wake-reason signals.
//!
//! A [`SignalSet`] carries up to 32 independently raisable wake reasons for
//! one worker. Raising is cheap and callable from any context, including
//! the interrupt top half; waiting is a blocking composite wait that takes
//! and clears every requested bit that is pending. A raise is sticky until
//! consumed, and raising an already-pending signal coalesces.

use crate::task::exec::{self, ResGuard, Resource};
use std::sync::{Arc, Condvar, Mutex};

struct SignalInner {
    pending: u32,
    allocated: u32,
}

pub struct SignalSet {
    inner: Mutex<SignalInner>,
    wakeup: Condvar,
}

impl SignalSet {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        SignalSet {
            inner: Mutex::new(SignalInner {
                pending: 0,
                allocated: 0,
            }),
            wakeup: Condvar::new(),
        }
    }

    /// Allocate a free signal bit. Returns `None` when all 32 bits are in
    /// use or the host is out of resources.
    pub fn alloc(self: &Arc<Self>) -> Option<SignalGuard> {
        let guard = exec::try_acquire(Resource::Signal)?;
        let mut inner = self.inner.lock().unwrap();
        let free = !inner.allocated;
        if free == 0 {
            return None;
        }
        let mask = free & free.wrapping_neg();
        inner.allocated |= mask;
        Some(SignalGuard {
            set: Arc::clone(self),
            mask,
            _guard: guard,
        })
    }

    /// Raise the given signals. Never blocks beyond the internal lock and
    /// never allocates.
    pub fn raise(&self, mask: u32) {
        if mask == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.pending |= mask;
        self.wakeup.notify_all();
    }

    /// Block until at least one signal in `mask` is pending, then take and
    /// clear every pending signal in `mask`.
    pub fn wait(&self, mask: u32) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        loop {
            let got = inner.pending & mask;
            if got != 0 {
                inner.pending &= !got;
                return got;
            }
            inner = self.wakeup.wait(inner).unwrap();
        }
    }

    /// Non-blocking variant of [`SignalSet::wait`].
    pub fn poll(&self, mask: u32) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        let got = inner.pending & mask;
        inner.pending &= !got;
        got
    }

    pub fn allocated_mask(&self) -> u32 {
        self.inner.lock().unwrap().allocated
    }

    fn free(&self, mask: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.allocated &= !mask;
        inner.pending &= !mask;
    }
}

/// An allocated signal bit; freed (and any pending raise discarded) on drop.
pub struct SignalGuard {
    set: Arc<SignalSet>,
    mask: u32,
    _guard: ResGuard,
}

impl SignalGuard {
    pub fn mask(&self) -> u32 {
        self.mask
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.set.free(self.mask);
    }
}
