//! Worker bookkeeping: ids, a registry of live workers, and acquire/release
//! accounting for every resource category a worker owns. The accounting is
//! what lets the lifecycle tests prove all-or-nothing startup and
//! exactly-once release on teardown.

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use spin::Mutex;
use std::collections::BTreeMap;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Registry of live workers, id to thread name. Mirrors what the host
/// scheduler tracks; kept here for diagnostics and teardown accounting.
static WORKERS: Mutex<BTreeMap<u64, String>> = Mutex::new(BTreeMap::new());

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        WorkerId(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Names of all live unit workers.
pub fn live_workers() -> Vec<(u64, String)> {
    WORKERS
        .lock()
        .iter()
        .map(|(id, name)| (*id, name.clone()))
        .collect()
}

// =============================================================================
// Resource accounting
// =============================================================================

/// Everything a unit worker owns, by category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    /// The worker's control block.
    ControlBlock,
    /// The worker's stack reservation.
    Stack,
    /// The registry record binding control block and stack for bulk release.
    Tracking,
    /// A message port binding (command or opener port).
    Port,
    /// An allocated wake-reason signal bit.
    Signal,
    /// A timer request and its service thread.
    Timer,
}

const RESOURCE_KINDS: usize = 6;

impl Resource {
    fn index(self) -> usize {
        match self {
            Resource::ControlBlock => 0,
            Resource::Stack => 1,
            Resource::Tracking => 2,
            Resource::Port => 3,
            Resource::Signal => 4,
            Resource::Timer => 5,
        }
    }
}

struct ExecStats {
    acquired: [AtomicUsize; RESOURCE_KINDS],
    released: [AtomicUsize; RESOURCE_KINDS],
}

static STATS: ExecStats = ExecStats {
    acquired: [const { AtomicUsize::new(0) }; RESOURCE_KINDS],
    released: [const { AtomicUsize::new(0) }; RESOURCE_KINDS],
};

/// Total acquisitions ever made for a category.
pub fn acquired(resource: Resource) -> usize {
    STATS.acquired[resource.index()].load(Ordering::SeqCst)
}

/// Acquisitions not yet released.
pub fn live(resource: Resource) -> usize {
    let idx = resource.index();
    STATS.acquired[idx].load(Ordering::SeqCst) - STATS.released[idx].load(Ordering::SeqCst)
}

/// Accounting token for one acquired resource; releases it on drop.
#[derive(Debug)]
pub(crate) struct ResGuard {
    resource: Resource,
}

impl Drop for ResGuard {
    fn drop(&mut self) {
        STATS.released[self.resource.index()].fetch_add(1, Ordering::SeqCst);
    }
}

/// Charge one acquisition against a category. Returns `None` when the host
/// has no resources left (forced by the test failpoint; the hosted stand-in
/// never runs out on its own).
pub(crate) fn try_acquire(resource: Resource) -> Option<ResGuard> {
    #[cfg(test)]
    {
        let mut fail = failpoint::FAIL_NEXT.lock();
        if *fail == Some(resource) {
            *fail = None;
            return None;
        }
    }

    STATS.acquired[resource.index()].fetch_add(1, Ordering::SeqCst);
    Some(ResGuard { resource })
}

/// Registry record for a live worker. Dropping it removes the worker from
/// the registry, releasing the binding that ties its control block and
/// stack together.
#[derive(Debug)]
pub(crate) struct TrackingRecord {
    id: WorkerId,
    _guard: ResGuard,
}

impl TrackingRecord {
    pub(crate) fn new(id: WorkerId, name: &str) -> Option<Self> {
        let guard = try_acquire(Resource::Tracking)?;
        WORKERS.lock().insert(id.as_u64(), name.to_owned());
        Some(TrackingRecord { id, _guard: guard })
    }
}

impl Drop for TrackingRecord {
    fn drop(&mut self) {
        WORKERS.lock().remove(&self.id.as_u64());
    }
}
