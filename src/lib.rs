//! Interrupt and scheduling core for a BCM GENET ethernet driver unit.
//!
//! The crate turns edge-triggered hardware interrupts into bounded, fair,
//! in-order work performed by a single long-lived worker per device unit:
//!
//! - [`devices::genet::irq`] — the interrupt top half, run from interrupt
//!   dispatch. It reclaims completed transmits synchronously, throttles the
//!   receive interrupt and defers everything else to the worker.
//! - the unit worker — the bottom half, a dedicated thread multiplexing
//!   five wake reasons under a budgeted drain discipline.
//! - [`devices::genet::lifecycle`] — rollback-safe worker start and a
//!   bounded, synchronous stop.
//!
//! Hardware register access, packet reclaim/drain routines, the PHY and the
//! per-command protocol handler stay behind the contracts in
//! [`devices::genet::regs`] and [`devices::genet::unit`].

pub mod clock;
pub mod config;
pub mod devices;
pub mod logger;
pub mod task;
