//! Message ports: an unbounded FIFO queue plus an optional signal binding.
//!
//! Producers `put` from any context; the sole consumer `get`s from its
//! worker loop. While a port is bound, every `put` raises the bound wake
//! signal so the consumer's composite wait sees the delivery.

use crate::task::exec::{self, ResGuard, Resource};
use crate::task::signal::SignalSet;
use crossbeam_queue::SegQueue;
use std::sync::Arc;

pub struct MsgPort<T> {
    queue: SegQueue<T>,
    wake: spin::Mutex<Option<(Arc<SignalSet>, u32)>>,
}

impl<T> MsgPort<T> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        MsgPort {
            queue: SegQueue::new(),
            wake: spin::Mutex::new(None),
        }
    }

    /// Enqueue a message and raise the bound wake signal, if any. Messages
    /// put while unbound sit in the queue until the consumer next drains.
    pub fn put(&self, msg: T) {
        self.queue.push(msg);
        if let Some((signals, mask)) = self.wake.lock().as_ref() {
            signals.raise(*mask);
        }
    }

    pub fn get(&self) -> Option<T> {
        self.queue.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Attach the consumer's wake signal. Only one binding may exist at a
    /// time; the returned guard detaches it on drop.
    pub fn bind(self: &Arc<Self>, signals: Arc<SignalSet>, mask: u32) -> Option<PortBinding<T>> {
        let guard = exec::try_acquire(Resource::Port)?;
        let mut wake = self.wake.lock();
        debug_assert!(wake.is_none(), "port already bound");
        *wake = Some((signals, mask));
        Some(PortBinding {
            port: Arc::clone(self),
            _guard: guard,
        })
    }

    pub fn is_bound(&self) -> bool {
        self.wake.lock().is_some()
    }
}

/// Consumer-side binding of a port to a wake signal.
pub struct PortBinding<T> {
    port: Arc<MsgPort<T>>,
    _guard: ResGuard,
}

impl<T> Drop for PortBinding<T> {
    fn drop(&mut self) {
        *self.port.wake.lock() = None;
    }
}
