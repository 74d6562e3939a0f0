//! Unit worker lifecycle.
//!
//! `start` acquires the launch resources step by step and either hands a
//! fully-equipped worker thread back or undoes everything; a worker is
//! never left half-started. `stop` raises the abort wake and joins the
//! thread, so when it returns the worker is gone and every resource it
//! owned has been released.

use crate::devices::genet::unit::{format_mac, GenetUnit};
use crate::devices::genet::worker::{self, WorkerControl};
use crate::task::exec::{self, Resource, ResGuard, TrackingRecord, WorkerId};
use core::sync::atomic::Ordering;
use goolog::{error, info};
use std::sync::{mpsc, Arc};
use std::thread;
use thiserror::Error;

const GOOLOG_TARGET: &str = "GENET";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StartError {
    #[error("unit worker already running")]
    AlreadyRunning,
    #[error("out of host resources")]
    NoResources,
    #[error("unit worker failed to set up its wake bundle")]
    WorkerSetup,
}

/// Stack reservation for one worker thread.
pub(crate) struct StackLease {
    bytes: usize,
    _guard: ResGuard,
}

impl StackLease {
    fn new(bytes: usize) -> Option<Self> {
        let guard = exec::try_acquire(Resource::Stack)?;
        Some(StackLease {
            bytes,
            _guard: guard,
        })
    }
}

/// The three launch-time resources, bundled so one drop releases them all.
/// It travels into the worker thread and dies with it.
pub(crate) struct LaunchBundle {
    _control: ResGuard,
    stack: StackLease,
    _tracking: TrackingRecord,
}

/// Launch the unit worker. Returns once the worker reports that its wake
/// bundle is in place, so a successful start means the unit is servicing
/// interrupts, commands and the watchdog.
pub fn start(unit: &Arc<GenetUnit>) -> Result<(), StartError> {
    let mut join = unit.join.lock();
    if join.is_some() || unit.worker_task() != 0 {
        return Err(StartError::AlreadyRunning);
    }

    let id = WorkerId::new();
    let name = format!("genet.unit {}", format_mac(&unit.board().mac));

    // Step-wise acquisition: control block, stack, tracking record. A
    // failure at any step drops the guards taken so far.
    let control = exec::try_acquire(Resource::ControlBlock).ok_or(StartError::NoResources)?;
    let stack =
        StackLease::new(unit.config().unit_stack_bytes).ok_or(StartError::NoResources)?;
    let tracking = TrackingRecord::new(id, &name).ok_or(StartError::NoResources)?;

    let bundle = LaunchBundle {
        _control: control,
        stack,
        _tracking: tracking,
    };

    let (ready, up) = mpsc::channel();
    let stack_bytes = bundle.stack.bytes;
    let ctl = WorkerControl {
        unit: Arc::clone(unit),
        id,
        ready,
        bundle,
    };

    let handle = thread::Builder::new()
        .name(name.clone())
        .stack_size(stack_bytes)
        .spawn(move || worker::unit_task(ctl))
        .map_err(|_| StartError::NoResources)?;

    match up.recv() {
        Ok(true) => {
            info!("Started {}", name);
            *join = Some(handle);
            Ok(())
        }
        // false or a dropped channel both mean the worker never came up;
        // it has already released everything it touched.
        _ => {
            let _ = handle.join();
            Err(StartError::WorkerSetup)
        }
    }
}

/// Stop the unit worker and wait for it to finish its current wake cycle.
pub fn stop(unit: &GenetUnit) {
    let handle = unit.join.lock().take();
    let Some(handle) = handle else {
        error!("No unit worker to stop");
        return;
    };

    unit.signals.raise(unit.abort_wake.load(Ordering::Acquire));
    if handle.join().is_err() {
        error!("Unit worker panicked during shutdown");
        return;
    }
    info!("Stopped unit worker");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::genet::testutil::{self, TestCommand};
    use crate::task::exec::{acquired, failpoint, live};

    const CATEGORIES: [Resource; 6] = [
        Resource::ControlBlock,
        Resource::Stack,
        Resource::Tracking,
        Resource::Port,
        Resource::Signal,
        Resource::Timer,
    ];

    fn snapshot(stat: fn(Resource) -> usize) -> [usize; 6] {
        CATEGORIES.map(stat)
    }

    #[test]
    fn start_and_stop_release_every_category_exactly_once() {
        let _serial = failpoint::SERIAL.lock();
        let (unit, _hooks, _intr) = testutil::offline_unit();
        let live_before = snapshot(live);
        let acquired_before = snapshot(acquired);

        start(&unit).unwrap();
        assert_ne!(unit.worker_task(), 0);

        // control block, stack, tracking; two port bindings; five signal
        // bits; one timer request
        let expected = [1, 1, 1, 2, 5, 1];
        for (i, category) in CATEGORIES.iter().enumerate() {
            assert_eq!(
                live(*category),
                live_before[i] + expected[i],
                "live {:?}",
                category
            );
            assert_eq!(acquired(*category), acquired_before[i] + expected[i]);
        }

        stop(&unit);
        assert_eq!(unit.worker_task(), 0);
        assert_eq!(snapshot(live), live_before);
        // no hidden extra acquisitions during teardown
        for (i, category) in CATEGORIES.iter().enumerate() {
            assert_eq!(acquired(*category), acquired_before[i] + expected[i]);
        }
    }

    #[test]
    fn start_is_all_or_nothing_at_each_launch_step() {
        let _serial = failpoint::SERIAL.lock();
        let (unit, _hooks, _intr) = testutil::offline_unit();
        let live_before = snapshot(live);

        for step in [Resource::ControlBlock, Resource::Stack, Resource::Tracking] {
            failpoint::fail_next_acquire(step);
            assert_eq!(start(&unit), Err(StartError::NoResources), "step {:?}", step);
            assert_eq!(unit.worker_task(), 0);
            assert_eq!(snapshot(live), live_before, "leak after {:?}", step);
        }

        // the unit is still startable afterwards
        start(&unit).unwrap();
        stop(&unit);
        assert_eq!(snapshot(live), live_before);
    }

    #[test]
    fn worker_side_failure_reports_setup_error_without_leaking() {
        let _serial = failpoint::SERIAL.lock();
        let (unit, _hooks, _intr) = testutil::offline_unit();
        let live_before = snapshot(live);

        for step in [Resource::Signal, Resource::Port, Resource::Timer] {
            failpoint::fail_next_acquire(step);
            assert_eq!(start(&unit), Err(StartError::WorkerSetup), "step {:?}", step);
            assert_eq!(unit.worker_task(), 0);
            assert_eq!(snapshot(live), live_before, "leak after {:?}", step);
        }
    }

    #[test]
    fn second_start_is_rejected_while_running() {
        let _serial = failpoint::SERIAL.lock();
        let (unit, _hooks, _intr) = testutil::offline_unit();
        start(&unit).unwrap();
        assert_eq!(start(&unit), Err(StartError::AlreadyRunning));
        stop(&unit);
    }

    #[test]
    fn stop_mid_backlog_still_releases_everything() {
        let _serial = failpoint::SERIAL.lock();
        let (unit, _hooks, _intr) = testutil::offline_unit();
        let live_before = snapshot(live);

        start(&unit).unwrap();
        for id in 0..100 {
            unit.enqueue_command(Box::new(TestCommand(id)));
        }
        stop(&unit);

        assert_eq!(unit.worker_task(), 0);
        assert_eq!(snapshot(live), live_before);
        assert!(!unit.command_port.is_bound());
    }

    #[test]
    fn stop_without_a_worker_is_harmless() {
        let _serial = failpoint::SERIAL.lock();
        let (unit, _hooks, _intr) = testutil::offline_unit();
        stop(&unit);
        assert_eq!(unit.worker_task(), 0);
    }
}
