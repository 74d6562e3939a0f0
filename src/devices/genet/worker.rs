//! The unit worker, the interrupt bottom half.
//!
//! One dedicated thread per unit sits in a composite wait on five wake
//! reasons and services them in a fixed order each cycle: device commands,
//! opener updates, deferred interrupt status, the periodic watchdog, and
//! finally the abort request. Every drain pass is bounded by the configured
//! budget; work left over re-raises the worker's own wake signal instead of
//! looping, so no single source can starve the others.

use crate::devices::genet::regs::{
    UMAC_IRQ_LINK_DOWN, UMAC_IRQ_LINK_UP, UMAC_IRQ_PHY_DET_R, UMAC_IRQ_RXDMA_DONE,
    UMAC_IRQ_TXDMA_DONE,
};
use crate::devices::genet::unit::{GenetUnit, LinkState, OperState};
use crate::task::exec::WorkerId;
use crate::task::port::PortBinding;
use crate::task::signal::SignalGuard;
use crate::task::timer::TimerRequest;
use core::sync::atomic::Ordering;
use goolog::{debug, info, trace, warn};
use std::sync::{mpsc, Arc};

const GOOLOG_TARGET: &str = "GENET";

/// Everything the launcher hands to the worker thread. The resource bundle
/// rides along so its pieces are released when the thread ends, whether the
/// worker came up or not.
pub(crate) struct WorkerControl {
    pub(crate) unit: Arc<GenetUnit>,
    pub(crate) id: WorkerId,
    pub(crate) ready: mpsc::Sender<bool>,
    pub(crate) bundle: crate::devices::genet::lifecycle::LaunchBundle,
}

/// Worker-owned wake machinery: one signal bit per wake reason, the port
/// bindings that feed two of them, and the watchdog timer.
struct WorkerState {
    unit: Arc<GenetUnit>,
    command_sig: SignalGuard,
    opener_sig: SignalGuard,
    irq_sig: SignalGuard,
    timer_sig: SignalGuard,
    abort_sig: SignalGuard,
    _command_bind: PortBinding<Box<dyn crate::devices::genet::unit::DeviceCommand>>,
    _opener_bind: PortBinding<crate::devices::genet::unit::OpenerMsg>,
    timer: TimerRequest,
}

impl WorkerState {
    /// Acquire the full wake bundle or nothing. Publishes the interrupt and
    /// abort wake masks on the unit only once everything else succeeded, so
    /// producers never raise a bit the worker does not own.
    fn acquire(unit: &Arc<GenetUnit>) -> Option<Self> {
        let command_sig = unit.signals.alloc()?;
        let opener_sig = unit.signals.alloc()?;
        let irq_sig = unit.signals.alloc()?;
        let timer_sig = unit.signals.alloc()?;
        let abort_sig = unit.signals.alloc()?;

        let command_bind = unit
            .command_port
            .bind(Arc::clone(&unit.signals), command_sig.mask())?;
        let opener_bind = unit
            .opener_port
            .bind(Arc::clone(&unit.signals), opener_sig.mask())?;
        let timer = TimerRequest::new(Arc::clone(&unit.signals), timer_sig.mask())?;

        unit.irq_wake.store(irq_sig.mask(), Ordering::Release);
        unit.abort_wake.store(abort_sig.mask(), Ordering::Release);

        Some(WorkerState {
            unit: Arc::clone(unit),
            command_sig,
            opener_sig,
            irq_sig,
            timer_sig,
            abort_sig,
            _command_bind: command_bind,
            _opener_bind: opener_bind,
            timer,
        })
    }

    fn wake_mask(&self) -> u32 {
        self.command_sig.mask()
            | self.opener_sig.mask()
            | self.irq_sig.mask()
            | self.timer_sig.mask()
            | self.abort_sig.mask()
    }

    fn run(&self) {
        self.timer.send(self.unit.config().period());

        loop {
            let woken = self.unit.signals.wait(self.wake_mask());

            if woken & self.command_sig.mask() != 0 {
                self.drain_commands();
            }
            if woken & self.opener_sig.mask() != 0 {
                self.drain_openers();
            }
            if woken & self.irq_sig.mask() != 0 {
                self.service_irq_status();
            }
            if woken & self.timer_sig.mask() != 0 {
                self.service_timer();
            }
            if woken & self.abort_sig.mask() != 0 {
                break;
            }
        }

        self.timer.abort();
        self.timer.reap();
    }

    /// Process up to one budget of queued device commands; anything left
    /// re-raises the command wake so the next cycle continues.
    fn drain_commands(&self) {
        let unit = &self.unit;
        for _ in 0..unit.config().budget {
            let Some(request) = unit.command_port.get() else {
                return;
            };
            trace!("Command 0x{:04X}", request.command());
            unit.hooks().process_command(unit, request);
        }
        if !unit.command_port.is_empty() {
            unit.signals.raise(self.command_sig.mask());
        }
    }

    fn drain_openers(&self) {
        let unit = &self.unit;
        for _ in 0..unit.config().budget {
            let Some(msg) = unit.opener_port.get() else {
                return;
            };
            unit.apply_opener_op(msg.op);
            // the enqueuer may have given up waiting; that is its business
            let _ = msg.reply.send(());
        }
        if !unit.opener_port.is_empty() {
            unit.signals.raise(self.opener_sig.mask());
        }
    }

    /// Service the status bits the top half deferred. Link transitions are
    /// folded into the unit's link state (a simultaneous up and down reads
    /// as down, the later observation); receive work runs only while the
    /// interface is online.
    fn service_irq_status(&self) {
        let unit = &self.unit;
        let status = unit.take_irq_status();
        if status == 0 {
            return;
        }
        debug!("Deferred IRQ status: 0x{:08X}", status);

        if status & UMAC_IRQ_PHY_DET_R != 0 && !unit.board().phy_autoneg {
            info!("PHY detected, renegotiating");
            unit.hooks().restart_autoneg(unit);
        }

        if status & UMAC_IRQ_LINK_DOWN != 0 {
            info!("Link down");
            unit.set_link(LinkState::Down);
        } else if status & UMAC_IRQ_LINK_UP != 0 {
            info!("Link up");
            unit.set_link(LinkState::Up);
        }

        if status & UMAC_IRQ_RXDMA_DONE != 0 && unit.state() == OperState::Online {
            let budget = unit.config().budget;
            let consumed = unit.hooks().rx_drain(unit, budget);
            if consumed >= budget {
                // more waiting in the ring; come back before touching the mask
                unit.defer_irq_status(UMAC_IRQ_RXDMA_DONE);
            } else {
                unit.intr().enable(UMAC_IRQ_RXDMA_DONE);
            }
        }
    }

    /// Watchdog tick: while online, make sure the DMA completion sources are
    /// unmasked (a lost enable would otherwise wedge the interface until the
    /// next command), then re-arm for the next period.
    fn service_timer(&self) {
        if !self.timer.check() {
            return;
        }
        self.timer.reap();

        let unit = &self.unit;
        if unit.state() == OperState::Online {
            unit.intr()
                .enable(UMAC_IRQ_TXDMA_DONE | UMAC_IRQ_RXDMA_DONE);
        }
        self.timer.send(unit.config().period());
    }
}

impl Drop for WorkerState {
    fn drop(&mut self) {
        // unpublish before the signal bits are freed so a late producer
        // raises nothing rather than a recycled bit
        self.unit.irq_wake.store(0, Ordering::Release);
        self.unit.abort_wake.store(0, Ordering::Release);
    }
}

/// Worker thread entry point.
pub(crate) fn unit_task(ctl: WorkerControl) {
    let WorkerControl {
        unit,
        id,
        ready,
        bundle,
    } = ctl;

    let Some(state) = WorkerState::acquire(&unit) else {
        warn!("Unit worker {} could not acquire its wake bundle", id.as_u64());
        let _ = ready.send(false);
        return;
    };

    unit.set_worker_task(id.as_u64());
    info!("Unit worker {} running", id.as_u64());
    let _ = ready.send(true);

    state.run();

    drop(state);
    unit.set_worker_task(0);
    info!("Unit worker {} stopped", id.as_u64());
    drop(bundle);
}
