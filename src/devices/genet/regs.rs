//! GENET interrupt controller registers (INTRL2) and the mask/status
//! primitive.
//!
//! The hardware exposes one-way mask-set and mask-clear registers: writing
//! a 1-bit sets (or clears) exactly that mask bit and leaves the rest
//! alone. Because no access is ever read-modify-write, interrupt and task
//! context can drive the controller concurrently without a lock.

// INTRL2 bank offsets from the GENET register base
pub const GENET_INTRL2_0_OFF: usize = 0x0200; // Bank 0: all interrupts in use
pub const GENET_INTRL2_1_OFF: usize = 0x0240; // Bank 1: per-priority-queue RX/TX, unused

// Per-bank register offsets
pub const INTRL2_CPU_STAT: usize = 0x00;        // Raw pending status
pub const INTRL2_CPU_SET: usize = 0x04;         // Assert status bits (diagnostics)
pub const INTRL2_CPU_CLEAR: usize = 0x08;       // Write-to-clear status
pub const INTRL2_CPU_MASK_STATUS: usize = 0x0C; // Current mask
pub const INTRL2_CPU_MASK_SET: usize = 0x10;    // One-way mask set (disable)
pub const INTRL2_CPU_MASK_CLEAR: usize = 0x14;  // One-way mask clear (enable)

// Bank 0 interrupt bits
pub const UMAC_IRQ_SCB: u32 = 1 << 0;
pub const UMAC_IRQ_EPHY: u32 = 1 << 1;
pub const UMAC_IRQ_PHY_DET_R: u32 = 1 << 2;    // PHY detected (rising)
pub const UMAC_IRQ_PHY_DET_F: u32 = 1 << 3;    // PHY removed (falling)
pub const UMAC_IRQ_LINK_UP: u32 = 1 << 4;
pub const UMAC_IRQ_LINK_DOWN: u32 = 1 << 5;
pub const UMAC_IRQ_UMAC: u32 = 1 << 6;
pub const UMAC_IRQ_UMAC_TSV: u32 = 1 << 7;
pub const UMAC_IRQ_TBUF_UNDERRUN: u32 = 1 << 8;
pub const UMAC_IRQ_RBUF_OVERFLOW: u32 = 1 << 9;
pub const UMAC_IRQ_HFB_SM: u32 = 1 << 10;
pub const UMAC_IRQ_HFB_MM: u32 = 1 << 11;
pub const UMAC_IRQ_MPD_R: u32 = 1 << 12;
pub const UMAC_IRQ_RXDMA_MBDONE: u32 = 1 << 13;
pub const UMAC_IRQ_RXDMA_PDONE: u32 = 1 << 14;
pub const UMAC_IRQ_RXDMA_BDONE: u32 = 1 << 15;
pub const UMAC_IRQ_TXDMA_MBDONE: u32 = 1 << 16;
pub const UMAC_IRQ_TXDMA_PDONE: u32 = 1 << 17;
pub const UMAC_IRQ_TXDMA_BDONE: u32 = 1 << 18;

pub const UMAC_IRQ_RXDMA_DONE: u32 = UMAC_IRQ_RXDMA_MBDONE;
pub const UMAC_IRQ_TXDMA_DONE: u32 = UMAC_IRQ_TXDMA_MBDONE;

pub const UMAC_IRQ_LINK_EVENT: u32 = UMAC_IRQ_LINK_UP | UMAC_IRQ_LINK_DOWN;

/// Interrupt mask/status operations on bank 0 (plus bank 1 silencing).
///
/// Implementations must keep the hardware's one-way semantics: `enable`
/// and `disable` touch only the given bits, through write-only mask-clear
/// and mask-set operations, so concurrent calls from interrupt and task
/// context cannot produce an inconsistent mask. No method may block.
pub trait IntrCtrl: Send + Sync {
    /// Unmask the given interrupt sources (write to mask-clear).
    fn enable(&self, mask: u32);

    /// Mask the given interrupt sources (write to mask-set).
    fn disable(&self, mask: u32);

    /// Silence the device: mask everything and clear all pending status on
    /// both banks. Bank 1 carries nothing today but is silenced anyway for
    /// hardware-reset parity.
    fn disable_all(&self);

    /// Read the effective pending status (raw status with masked sources
    /// filtered out), acknowledge exactly those bits in hardware, and
    /// return them.
    fn read_and_clear_status(&self) -> u32;
}

/// Memory-mapped INTRL2 controller at the base address reported by device
/// discovery.
pub struct Intrl2Mmio {
    base: *mut u8,
}

// SAFETY: the INTRL2 registers are designed for concurrent access from
// interrupt and task context; every access below is a single volatile
// 32-bit read or write with one-way set/clear semantics.
unsafe impl Send for Intrl2Mmio {}
unsafe impl Sync for Intrl2Mmio {}

impl Intrl2Mmio {
    /// # Safety
    ///
    /// `base` must point at the GENET register block, mapped uncached and
    /// valid for the lifetime of the returned value.
    pub unsafe fn new(base: *mut u8) -> Self {
        Intrl2Mmio { base }
    }

    fn read(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile(self.base.add(offset) as *const u32) }
    }

    fn write(&self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile(self.base.add(offset) as *mut u32, value) }
    }
}

impl IntrCtrl for Intrl2Mmio {
    fn enable(&self, mask: u32) {
        self.write(GENET_INTRL2_0_OFF + INTRL2_CPU_MASK_CLEAR, mask);
    }

    fn disable(&self, mask: u32) {
        self.write(GENET_INTRL2_0_OFF + INTRL2_CPU_MASK_SET, mask);
    }

    fn disable_all(&self) {
        for bank in [GENET_INTRL2_0_OFF, GENET_INTRL2_1_OFF] {
            self.write(bank + INTRL2_CPU_MASK_SET, 0xFFFF_FFFF);
            self.write(bank + INTRL2_CPU_CLEAR, 0xFFFF_FFFF);
        }
    }

    fn read_and_clear_status(&self) -> u32 {
        let status = self.read(GENET_INTRL2_0_OFF + INTRL2_CPU_STAT)
            & !self.read(GENET_INTRL2_0_OFF + INTRL2_CPU_MASK_STATUS);
        self.write(GENET_INTRL2_0_OFF + INTRL2_CPU_CLEAR, status);
        status
    }
}
