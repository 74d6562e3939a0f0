//! Timer requests.
//!
//! A [`TimerRequest`] is a re-armable one-shot: `send` schedules a timeout,
//! and on expiry the request raises a wake signal on its target
//! [`SignalSet`] and parks until reaped. `abort` cancels a pending timeout
//! synchronously. One service thread per request does the waiting, so the
//! consumer's worker loop never blocks on the timer itself.

use crate::task::exec::{self, ResGuard, Resource};
use crate::task::signal::SignalSet;
use core::time::Duration;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerState {
    Idle,
    Armed(Instant),
    Fired,
    Shutdown,
}

struct TimerShared {
    state: Mutex<TimerState>,
    cond: Condvar,
    signals: Arc<SignalSet>,
    mask: u32,
}

pub struct TimerRequest {
    shared: Arc<TimerShared>,
    thread: Option<JoinHandle<()>>,
    _guard: ResGuard,
}

impl TimerRequest {
    /// Open a timer request that raises `mask` on `signals` when it fires.
    /// Returns `None` when the host cannot provide the timer resources.
    pub fn new(signals: Arc<SignalSet>, mask: u32) -> Option<Self> {
        let guard = exec::try_acquire(Resource::Timer)?;
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState::Idle),
            cond: Condvar::new(),
            signals,
            mask,
        });
        let thread = thread::Builder::new()
            .name("genet.timer".into())
            .spawn({
                let shared = Arc::clone(&shared);
                move || timer_service(&shared)
            })
            .ok()?;
        Some(TimerRequest {
            shared,
            thread: Some(thread),
            _guard: guard,
        })
    }

    /// Arm the request. The caller must have reaped any previous expiry.
    pub fn send(&self, delay: Duration) {
        let mut state = self.shared.state.lock().unwrap();
        debug_assert!(
            matches!(*state, TimerState::Idle),
            "timer request re-armed while in flight"
        );
        *state = TimerState::Armed(Instant::now() + delay);
        self.shared.cond.notify_all();
    }

    /// Whether the request has expired and awaits a reap.
    pub fn check(&self) -> bool {
        matches!(*self.shared.state.lock().unwrap(), TimerState::Fired)
    }

    /// Consume an expiry (or a completed abort), returning the request to
    /// idle so it can be re-armed. A no-op on an idle request.
    pub fn reap(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if matches!(*state, TimerState::Fired) {
            *state = TimerState::Idle;
        }
    }

    /// Cancel a pending timeout. If the request already fired, the raise
    /// stands and `reap` picks it up; the cancel itself never blocks.
    pub fn abort(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if matches!(*state, TimerState::Armed(_)) {
            *state = TimerState::Idle;
            self.shared.cond.notify_all();
        }
    }
}

impl Drop for TimerRequest {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            *state = TimerState::Shutdown;
            self.shared.cond.notify_all();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn timer_service(shared: &TimerShared) {
    let mut state = shared.state.lock().unwrap();
    loop {
        match *state {
            TimerState::Shutdown => break,
            TimerState::Armed(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    *state = TimerState::Fired;
                    shared.signals.raise(shared.mask);
                } else {
                    let (next, _) = shared
                        .cond
                        .wait_timeout(state, deadline - now)
                        .unwrap();
                    state = next;
                }
            }
            _ => {
                state = shared.cond.wait(state).unwrap();
            }
        }
    }
}
