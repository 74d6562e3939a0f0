//! The GENET device unit: shared state, external contracts and the
//! producer-side enqueue API.
//!
//! One [`GenetUnit`] exists per physical interface. The interrupt top half
//! and the unit worker are the only two execution contexts that touch it
//! concurrently; the comments on each field say which side writes.

use crate::config::RuntimeConfig;
use crate::devices::genet::regs::IntrCtrl;
use crate::task::port::MsgPort;
use crate::task::signal::SignalSet;
use core::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use smallvec::SmallVec;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use strum::Display;

/// Operational state, written only by the external link-management logic.
/// The worker reads it to gate receive processing and the watchdog enable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum OperState {
    Offline = 0,
    Online = 1,
}

/// Last link transition observed through the deferred interrupt path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum LinkState {
    Unknown = 0,
    Up = 1,
    Down = 2,
}

/// PHY wiring reported by device discovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum PhyInterface {
    Mii,
    Rgmii,
    RgmiiRxid,
}

/// Discovery data for one interface, obtained from the hardware
/// description source by the external probe path.
#[derive(Clone, Debug)]
pub struct BoardInfo {
    pub mac: [u8; 6],
    pub phy_addr: u8,
    pub phy_interface: PhyInterface,
    /// Whether the PHY runs auto-negotiation. Gates the PHY-detect branch
    /// of the deferred interrupt handler.
    pub phy_autoneg: bool,
}

/// An externally-defined device request. The worker never interprets it
/// beyond the command word used for logging; the protocol handler does.
pub trait DeviceCommand: Send {
    fn command(&self) -> u32;
}

/// Routines the core invokes but does not implement: packet reclaim and
/// drain, the per-command protocol handler and PHY renegotiation.
///
/// `tx_reclaim` runs in interrupt context and must be fast, bounded by its
/// budget, and non-blocking. `rx_drain` returns the number of items
/// consumed, at most `budget`. `process_command` must reply to the request.
pub trait DeviceHooks: Send + Sync {
    fn tx_reclaim(&self, unit: &GenetUnit, budget: u32);
    fn rx_drain(&self, unit: &GenetUnit, budget: u32) -> u32;
    fn process_command(&self, unit: &GenetUnit, request: Box<dyn DeviceCommand>);
    fn restart_autoneg(&self, unit: &GenetUnit);
}

/// A client that opened the device and wants device-wide state changes
/// communicated to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opener {
    pub id: u64,
}

pub enum OpenerOp {
    Add(Opener),
    Remove(u64),
}

pub(crate) struct OpenerMsg {
    pub(crate) op: OpenerOp,
    pub(crate) reply: mpsc::Sender<()>,
}

pub struct GenetUnit {
    board: BoardInfo,
    config: RuntimeConfig,
    intr: Box<dyn IntrCtrl>,
    hooks: Arc<dyn DeviceHooks>,

    /// Written by external link management, read by the worker.
    state: AtomicU8,
    /// Written by the worker from the deferred link bits.
    link: AtomicU8,
    /// OR-accumulated by the top half, swapped to zero by the worker.
    pending_irq: AtomicU32,
    /// Worker id while the worker is alive, 0 otherwise. Single writer:
    /// the worker itself.
    worker_task: AtomicU64,

    /// Wake signals owned by this unit for its lifetime; individual bits
    /// are allocated and freed by the worker.
    pub(crate) signals: Arc<SignalSet>,
    pub(crate) command_port: Arc<MsgPort<Box<dyn DeviceCommand>>>,
    pub(crate) opener_port: Arc<MsgPort<OpenerMsg>>,
    /// Signal masks published by the worker once its bits are allocated.
    pub(crate) irq_wake: AtomicU32,
    pub(crate) abort_wake: AtomicU32,

    /// Mutated only by the worker, read by external code between wake
    /// cycles.
    openers: spin::Mutex<SmallVec<[Opener; 4]>>,
    pub(crate) join: spin::Mutex<Option<JoinHandle<()>>>,
}

impl GenetUnit {
    pub fn new(
        board: BoardInfo,
        config: RuntimeConfig,
        intr: Box<dyn IntrCtrl>,
        hooks: Arc<dyn DeviceHooks>,
    ) -> Arc<Self> {
        Arc::new(GenetUnit {
            board,
            config,
            intr,
            hooks,
            state: AtomicU8::new(OperState::Offline as u8),
            link: AtomicU8::new(LinkState::Unknown as u8),
            pending_irq: AtomicU32::new(0),
            worker_task: AtomicU64::new(0),
            signals: Arc::new(SignalSet::new()),
            command_port: Arc::new(MsgPort::new()),
            opener_port: Arc::new(MsgPort::new()),
            irq_wake: AtomicU32::new(0),
            abort_wake: AtomicU32::new(0),
            openers: spin::Mutex::new(SmallVec::new()),
            join: spin::Mutex::new(None),
        })
    }

    pub fn board(&self) -> &BoardInfo {
        &self.board
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn intr(&self) -> &dyn IntrCtrl {
        self.intr.as_ref()
    }

    pub(crate) fn hooks(&self) -> &dyn DeviceHooks {
        self.hooks.as_ref()
    }

    pub fn state(&self) -> OperState {
        match self.state.load(Ordering::Acquire) {
            1 => OperState::Online,
            _ => OperState::Offline,
        }
    }

    /// Called by external link management when the interface goes on- or
    /// offline.
    pub fn set_state(&self, state: OperState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn link(&self) -> LinkState {
        match self.link.load(Ordering::Acquire) {
            1 => LinkState::Up,
            2 => LinkState::Down,
            _ => LinkState::Unknown,
        }
    }

    pub(crate) fn set_link(&self, link: LinkState) {
        self.link.store(link as u8, Ordering::Release);
    }

    /// OR status bits into the deferred accumulator and wake the worker.
    /// Used by the top half and by the worker's own receive re-arm.
    pub(crate) fn defer_irq_status(&self, bits: u32) {
        self.pending_irq.fetch_or(bits, Ordering::AcqRel);
        self.signals.raise(self.irq_wake.load(Ordering::Acquire));
    }

    /// Take and reset the deferred status in one indivisible step. A plain
    /// load-then-store would widen the window in which a concurrent top
    /// half OR is lost.
    pub(crate) fn take_irq_status(&self) -> u32 {
        self.pending_irq.swap(0, Ordering::AcqRel)
    }

    pub fn pending_irq_status(&self) -> u32 {
        self.pending_irq.load(Ordering::Acquire)
    }

    /// Id of the running worker, 0 when no worker is alive.
    pub fn worker_task(&self) -> u64 {
        self.worker_task.load(Ordering::Acquire)
    }

    pub(crate) fn set_worker_task(&self, id: u64) {
        self.worker_task.store(id, Ordering::Release);
    }

    /// Queue a device command for the worker's next wake cycle.
    pub fn enqueue_command(&self, request: Box<dyn DeviceCommand>) {
        self.command_port.put(request);
    }

    /// Queue an opener add/remove. The returned receiver completes once
    /// the worker has applied the operation.
    pub fn enqueue_opener_op(&self, op: OpenerOp) -> mpsc::Receiver<()> {
        let (reply, done) = mpsc::channel();
        self.opener_port.put(OpenerMsg { op, reply });
        done
    }

    pub fn openers(&self) -> Vec<Opener> {
        self.openers.lock().to_vec()
    }

    pub(crate) fn apply_opener_op(&self, op: OpenerOp) {
        let mut openers = self.openers.lock();
        match op {
            OpenerOp::Add(opener) => openers.push(opener),
            OpenerOp::Remove(id) => openers.retain(|opener| opener.id != id),
        }
    }
}

pub fn format_mac(mac: &[u8]) -> String {
    mac.iter()
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<String>>()
        .join(":")
}
