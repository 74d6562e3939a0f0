pub mod irq;
pub mod lifecycle;
pub mod regs;
pub mod unit;
pub(crate) mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use lifecycle::{start, stop, StartError};
pub use unit::GenetUnit;
