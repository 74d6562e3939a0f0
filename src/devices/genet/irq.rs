//! Interrupt top half.
//!
//! Runs in interrupt context, so it does exactly three things: reclaims
//! completed transmits (cheap and bounded by the budget), throttles the
//! receive interrupt until the worker catches up, and defers every other
//! cause to the worker through the unit's status accumulator.

use crate::devices::genet::regs::{UMAC_IRQ_RXDMA_DONE, UMAC_IRQ_TXDMA_DONE};
use crate::devices::genet::unit::GenetUnit;
use goolog::trace;

const GOOLOG_TARGET: &str = "GENET";

/// Bank 0 interrupt service routine. Never blocks, never allocates.
pub fn isr0(unit: &GenetUnit) {
    let status = unit.intr().read_and_clear_status();

    if status & UMAC_IRQ_TXDMA_DONE != 0 {
        unit.hooks().tx_reclaim(unit, unit.config().budget);
    }

    // Keep the receive source quiet until the bottom half catches up; only
    // the worker re-enables it.
    if status & UMAC_IRQ_RXDMA_DONE != 0 {
        unit.intr().disable(UMAC_IRQ_RXDMA_DONE);
    }

    trace!("IRQ0 status: 0x{:08X}", status);

    let deferred = status & !UMAC_IRQ_TXDMA_DONE;
    if deferred != 0 {
        unit.defer_irq_status(deferred);
    }
}
