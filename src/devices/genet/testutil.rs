//! Shared fixtures: a fake interrupt controller that models the INTRL2
//! latch/mask behavior, and scripted device hooks.

use crate::config::RuntimeConfig;
use crate::devices::genet::regs::IntrCtrl;
use crate::devices::genet::unit::{
    BoardInfo, DeviceCommand, DeviceHooks, GenetUnit, PhyInterface,
};
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct FakeIntrCtrl {
    inner: Arc<FakeIntrInner>,
}

struct FakeIntrInner {
    /// 1-bits are masked (disabled) sources.
    mask: AtomicU32,
    /// Latched hardware status; survives masking like the real latch.
    status: AtomicU32,
    enables: Mutex<Vec<u32>>,
    disable_all_calls: AtomicUsize,
}

impl FakeIntrCtrl {
    pub(crate) fn new() -> Self {
        FakeIntrCtrl {
            inner: Arc::new(FakeIntrInner {
                mask: AtomicU32::new(0),
                status: AtomicU32::new(0),
                enables: Mutex::new(Vec::new()),
                disable_all_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Simulate the hardware asserting status bits.
    pub(crate) fn latch_status(&self, bits: u32) {
        self.inner.status.fetch_or(bits, Ordering::SeqCst);
    }

    pub(crate) fn is_disabled(&self, bits: u32) -> bool {
        self.inner.mask.load(Ordering::SeqCst) & bits == bits
    }

    /// Every mask handed to `enable`, in call order.
    pub(crate) fn enables(&self) -> Vec<u32> {
        self.inner.enables.lock().unwrap().clone()
    }

    pub(crate) fn disable_all_calls(&self) -> usize {
        self.inner.disable_all_calls.load(Ordering::SeqCst)
    }
}

impl IntrCtrl for FakeIntrCtrl {
    fn enable(&self, mask: u32) {
        self.inner.mask.fetch_and(!mask, Ordering::SeqCst);
        self.inner.enables.lock().unwrap().push(mask);
    }

    fn disable(&self, mask: u32) {
        self.inner.mask.fetch_or(mask, Ordering::SeqCst);
    }

    fn disable_all(&self) {
        self.inner.mask.store(0xFFFF_FFFF, Ordering::SeqCst);
        self.inner.status.store(0, Ordering::SeqCst);
        self.inner.disable_all_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn read_and_clear_status(&self) -> u32 {
        let masked = self.inner.mask.load(Ordering::SeqCst);
        let effective = self.inner.status.load(Ordering::SeqCst) & !masked;
        self.inner.status.fetch_and(!effective, Ordering::SeqCst);
        effective
    }
}

pub(crate) struct TestCommand(pub(crate) u32);

impl DeviceCommand for TestCommand {
    fn command(&self) -> u32 {
        self.0
    }
}

#[derive(Default)]
pub(crate) struct TestHooks {
    tx_reclaims: AtomicUsize,
    commands: Mutex<Vec<u32>>,
    /// Scripted return values for `rx_drain`; an empty script returns 0.
    rx_script: Mutex<VecDeque<u32>>,
    rx_budgets: Mutex<Vec<u32>>,
    autoneg_calls: AtomicUsize,
}

impl TestHooks {
    pub(crate) fn tx_reclaims(&self) -> usize {
        self.tx_reclaims.load(Ordering::SeqCst)
    }

    pub(crate) fn commands(&self) -> Vec<u32> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn script_rx(&self, consumed: u32) {
        self.rx_script.lock().unwrap().push_back(consumed);
    }

    pub(crate) fn rx_budgets(&self) -> Vec<u32> {
        self.rx_budgets.lock().unwrap().clone()
    }

    pub(crate) fn autoneg_calls(&self) -> usize {
        self.autoneg_calls.load(Ordering::SeqCst)
    }
}

impl DeviceHooks for TestHooks {
    fn tx_reclaim(&self, _unit: &GenetUnit, _budget: u32) {
        self.tx_reclaims.fetch_add(1, Ordering::SeqCst);
    }

    fn rx_drain(&self, _unit: &GenetUnit, budget: u32) -> u32 {
        self.rx_budgets.lock().unwrap().push(budget);
        self.rx_script.lock().unwrap().pop_front().unwrap_or(0)
    }

    fn process_command(&self, _unit: &GenetUnit, request: Box<dyn DeviceCommand>) {
        self.commands.lock().unwrap().push(request.command());
    }

    fn restart_autoneg(&self, _unit: &GenetUnit) {
        self.autoneg_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn default_board() -> BoardInfo {
    BoardInfo {
        mac: [0xB8, 0x27, 0xEB, 0x12, 0x34, 0x56],
        phy_addr: 1,
        phy_interface: PhyInterface::Rgmii,
        phy_autoneg: true,
    }
}

pub(crate) fn unit_with(
    board: BoardInfo,
    config: RuntimeConfig,
) -> (Arc<GenetUnit>, Arc<TestHooks>, FakeIntrCtrl) {
    let hooks = Arc::new(TestHooks::default());
    let intr = FakeIntrCtrl::new();
    let unit = GenetUnit::new(board, config, Box::new(intr.clone()), hooks.clone());
    (unit, hooks, intr)
}

/// A unit in the default `Offline` state with default tunables.
pub(crate) fn offline_unit() -> (Arc<GenetUnit>, Arc<TestHooks>, FakeIntrCtrl) {
    unit_with(default_board(), RuntimeConfig::default())
}
